//! Reading and writing barcode-tagged FASTQ files.
//!
//! Reads carry their tags in the description line, after the original comment:
//!
//! ```text
//! @q1 1:N:0:1 |BS=ACGTAC|RC=1
//! ACGTTGCA
//! +
//! IIIIIIII
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use famcall_consensus::ReadRecord;
use seq_io::fastq::Reader as FastqReader;
use seq_io::fastq::Record;

/// Iterator over the reads of a FASTQ stream.
pub struct FastqReads {
    source: FastqReader<Box<dyn BufRead + Send>>,
    records_read: u64,
}

impl FastqReads {
    #[must_use]
    pub fn new(source: Box<dyn BufRead + Send>) -> Self {
        Self { source: FastqReader::new(source), records_read: 0 }
    }

    /// Opens a FASTQ file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open FASTQ file '{}'", path.display()))?;
        Ok(Self::new(Box::new(BufReader::new(file))))
    }
}

impl Iterator for FastqReads {
    type Item = Result<ReadRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.source.next()? {
            Ok(record) => record,
            Err(e) => {
                return Some(Err(anyhow::Error::new(e).context(format!(
                    "Error parsing FASTQ record {}",
                    self.records_read + 1
                ))));
            }
        };
        self.records_read += 1;
        Some(
            ReadRecord::from_fastq_parts(record.head(), record.seq(), record.qual())
                .map_err(Into::into),
        )
    }
}

/// Buffered writer of reads in FASTQ form.
pub struct FastqWriter {
    out: BufWriter<Box<dyn Write + Send>>,
    written: u64,
}

impl FastqWriter {
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out: BufWriter::new(out), written: 0 }
    }

    /// Creates (or truncates) a FASTQ file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create FASTQ file '{}'", path.display()))?;
        Ok(Self::new(Box::new(file)))
    }

    pub fn write(&mut self, read: &ReadRecord) -> Result<()> {
        read.write_fastq(&mut self.out)
            .with_context(|| format!("Failed to write read '{}'", read.name))?;
        self.written += 1;
        Ok(())
    }

    /// Number of reads written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes buffered output. Must be called before the writer is dropped.
    pub fn finish(mut self) -> Result<u64> {
        self.out.flush().context("Failed to flush FASTQ output")?;
        Ok(self.written)
    }
}
