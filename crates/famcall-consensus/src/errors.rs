//! Error types for codec and consensus operations.

use thiserror::Error;

/// Errors raised while encoding or decoding qualities and tag strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A quality character fell outside the printable range
    #[error("Quality character {value:#04x} is outside the printable range [33, 126]")]
    InvalidQualityChar {
        /// The offending byte
        value: u8,
    },

    /// A tag string could not be parsed
    #[error("Malformed tag '{text}': {reason}")]
    MalformedTag {
        /// The text that failed to parse
        text: String,
        /// Explanation of the problem
        reason: String,
    },
}

impl CodecError {
    pub(crate) fn malformed(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTag { text: text.into(), reason: reason.into() }
    }
}

/// Errors raised while calling a consensus over a barcode family.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// The family contained no reads
    #[error("Cannot call a consensus for an empty family")]
    EmptyFamily,

    /// A read in the family was malformed
    #[error("Malformed read '{read_name}': {reason}")]
    MalformedRead {
        /// Name of the offending read
        read_name: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A tag or quality string failed to decode
    #[error("Read '{read_name}': {source}")]
    Codec {
        /// Name of the offending read
        read_name: String,
        /// Underlying codec failure
        #[source]
        source: CodecError,
    },
}

/// Result type alias for consensus operations
pub type Result<T> = std::result::Result<T, ConsensusError>;
