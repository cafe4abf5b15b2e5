//! Barcode-tagged reads and their FASTQ-like text form.
//!
//! A read description carries the original free-text comment followed by pipe-delimited tags:
//!
//! ```text
//! @<name> <original-comment><tag-string>
//! <sequence>
//! +
//! <quality-string>
//! ```

use std::io::{self, Write};

use crate::errors::{ConsensusError, Result};
use crate::quality::{decode_qualities, encode_qualities};
use crate::tags::FamilyTags;

/// One observed read: bases, Phred qualities and its auxiliary tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadRecord {
    pub name: String,
    /// Free-text comment with any `|`-tag suffix removed
    pub comment: String,
    pub bases: Vec<u8>,
    pub qualities: Vec<u32>,
    pub tags: FamilyTags,
}

impl ReadRecord {
    /// Creates an untagged read.
    #[must_use]
    pub fn new(name: impl Into<String>, bases: &[u8], qualities: &[u32]) -> Self {
        Self {
            name: name.into(),
            bases: bases.to_vec(),
            qualities: qualities.to_vec(),
            ..Self::default()
        }
    }

    /// Builds a read from the raw header, sequence and quality lines of a FASTQ record.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::Codec`] for an undecodable quality string or tag suffix and
    /// [`ConsensusError::MalformedRead`] if the read fails [`ReadRecord::validate`].
    ///
    /// # Examples
    /// ```
    /// use famcall_consensus::read::ReadRecord;
    ///
    /// let read = ReadRecord::from_fastq_parts(b"q1 1:N:0 |BS=ACGT", b"AC", b"??").unwrap();
    /// assert_eq!(read.name, "q1");
    /// assert_eq!(read.comment, "1:N:0 ");
    /// assert_eq!(read.barcode(), Some("ACGT"));
    /// assert_eq!(read.qualities, vec![30, 30]);
    /// ```
    pub fn from_fastq_parts(head: &[u8], bases: &[u8], qualities: &[u8]) -> Result<Self> {
        let head = String::from_utf8_lossy(head);
        let (name, description) = match head.split_once(char::is_whitespace) {
            Some((name, rest)) => (name.to_string(), rest),
            None => (head.to_string(), ""),
        };
        let (comment, tag_text) = match description.find('|') {
            Some(idx) => description.split_at(idx),
            None => (description, ""),
        };
        let codec_error = |source| ConsensusError::Codec { read_name: name.clone(), source };
        let tags = FamilyTags::from_description(tag_text).map_err(codec_error)?;
        let qualities = decode_qualities(qualities).map_err(codec_error)?;

        let read = Self {
            name,
            comment: comment.to_string(),
            bases: bases.to_ascii_uppercase(),
            qualities,
            tags,
        };
        read.validate()?;
        Ok(read)
    }

    /// The barcode carried in the `BS` tag.
    #[must_use]
    pub fn barcode(&self) -> Option<&str> {
        self.tags.bs.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Checks that per-base arrays line up with the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::MalformedRead`] naming this read on any length mismatch.
    pub fn validate(&self) -> Result<()> {
        let len = self.bases.len();
        let mismatch = |what: &str, other: usize| ConsensusError::MalformedRead {
            read_name: self.name.clone(),
            reason: format!("sequence and {what} lengths differ ({len} vs {other})"),
        };
        if self.qualities.len() != len {
            return Err(mismatch("quality", self.qualities.len()));
        }
        if !self.tags.fa.is_empty() && self.tags.fa.len() != len {
            return Err(mismatch("FA", self.tags.fa.len()));
        }
        if !self.tags.pv.is_empty() && self.tags.pv.len() != len {
            return Err(mismatch("PV", self.tags.pv.len()));
        }
        Ok(())
    }

    /// Writes the read as a four-line FASTQ-like record.
    ///
    /// # Errors
    ///
    /// Propagates write failures from `out`.
    pub fn write_fastq<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let tags = self.tags.to_description();
        out.write_all(b"@")?;
        out.write_all(self.name.as_bytes())?;
        if !self.comment.is_empty() || !tags.is_empty() {
            out.write_all(b" ")?;
            out.write_all(self.comment.as_bytes())?;
            out.write_all(tags.as_bytes())?;
        }
        out.write_all(b"\n")?;
        out.write_all(&self.bases)?;
        out.write_all(b"\n+\n")?;
        out.write_all(&encode_qualities(&self.qualities))?;
        out.write_all(b"\n")
    }

    /// The read as a FASTQ-like string.
    #[must_use]
    pub fn to_fastq(&self) -> String {
        let mut buf = Vec::with_capacity(2 * self.len() + self.name.len() + 16);
        // Writing into a Vec cannot fail.
        let _ = self.write_fastq(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
