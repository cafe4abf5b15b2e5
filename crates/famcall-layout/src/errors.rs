//! Error types for layout construction.

use famcall_consensus::CodecError;
use thiserror::Error;

/// Errors raised while parsing CIGARs or building layouts from alignment records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The CIGAR string could not be parsed or is not well formed
    #[error("Invalid CIGAR '{cigar}': {reason}")]
    InvalidCigar {
        /// The CIGAR text
        cigar: String,
        /// Explanation of the problem
        reason: String,
    },

    /// The operation has no per-base representation (hard clip, skip or pad)
    #[error("CIGAR operation '{op}' is not supported in a layout")]
    UnsupportedCigarOp {
        /// The SAM character of the operation
        op: char,
    },

    /// The alignment record is internally inconsistent
    #[error("Malformed record '{read_name}': {reason}")]
    MalformedRecord {
        /// Name of the offending read
        read_name: String,
        /// Explanation of the problem
        reason: String,
    },

    /// An auxiliary tag failed to parse
    #[error("Record '{read_name}': {source}")]
    Tag {
        /// Name of the offending read
        read_name: String,
        /// Underlying codec failure
        #[source]
        source: CodecError,
    },
}

impl LayoutError {
    pub(crate) fn malformed(read_name: &str, reason: impl Into<String>) -> Self {
        Self::MalformedRecord { read_name: read_name.to_string(), reason: reason.into() }
    }
}

/// Result type alias for layout operations
pub type Result<T> = std::result::Result<T, LayoutError>;
