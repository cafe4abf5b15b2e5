//! SAM input and output for the merge stage.
//!
//! Records are read as noodles [`RecordBuf`]s. Output mixes two kinds of lines: records passed
//! through untouched, written by noodles, and layouts rendered by
//! [`Layout::to_sam_line`](famcall_layout::Layout::to_sam_line).

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use noodles::sam::Header;
use noodles::sam::alignment::io::Write as AlignmentWrite;
use noodles::sam::alignment::record_buf::RecordBuf;

/// A SAM reader over any buffered source.
pub type SamReader = noodles::sam::io::Reader<Box<dyn BufRead>>;

/// Opens a SAM file and reads its header.
pub fn open_sam<P: AsRef<Path>>(path: P) -> Result<(SamReader, Header)> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open SAM file '{}'", path.display()))?;
    sam_from_reader(Box::new(BufReader::new(file)))
        .with_context(|| format!("Failed to read SAM header from '{}'", path.display()))
}

/// Wraps a buffered source and reads its header.
pub fn sam_from_reader(source: Box<dyn BufRead>) -> Result<(SamReader, Header)> {
    let mut reader = noodles::sam::io::Reader::new(source);
    let header = reader.read_header()?;
    Ok((reader, header))
}

/// Streams the records of `reader`, converting I/O errors.
pub fn records<'a>(
    reader: &'a mut SamReader,
    header: &'a Header,
) -> impl Iterator<Item = Result<RecordBuf>> + 'a {
    reader.record_bufs(header).map(|r| r.context("Failed to parse SAM record"))
}

/// Writes a SAM header followed by records and preformatted lines.
pub struct SamTextWriter {
    inner: noodles::sam::io::Writer<BufWriter<Box<dyn Write + Send>>>,
    header: Header,
    written: u64,
}

impl SamTextWriter {
    /// Wraps `out` and writes `header` to it.
    pub fn new(out: Box<dyn Write + Send>, header: Header) -> Result<Self> {
        let mut inner = noodles::sam::io::Writer::new(BufWriter::new(out));
        inner.write_header(&header).context("Failed to write SAM header")?;
        Ok(Self { inner, header, written: 0 })
    }

    /// Creates (or truncates) a SAM file and writes `header` to it.
    pub fn create<P: AsRef<Path>>(path: P, header: Header) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create SAM file '{}'", path.display()))?;
        Self::new(Box::new(file), header)
    }

    /// Writes a record unchanged.
    pub fn write_record(&mut self, record: &RecordBuf) -> Result<()> {
        self.inner
            .write_alignment_record(&self.header, record)
            .context("Failed to write SAM record")?;
        self.written += 1;
        Ok(())
    }

    /// Writes one tab-delimited alignment line; a newline is appended.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let out = self.inner.get_mut();
        out.write_all(line.as_bytes())
            .and_then(|()| out.write_all(b"\n"))
            .context("Failed to write SAM line")?;
        self.written += 1;
        Ok(())
    }

    /// Number of records and lines written.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes buffered output.
    pub fn finish(mut self) -> Result<u64> {
        self.inner.get_mut().flush().context("Failed to flush SAM output")?;
        Ok(self.written)
    }
}
