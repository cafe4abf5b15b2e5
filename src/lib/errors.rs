//! Custom error types for famcall operations.

use famcall_consensus::ConsensusError;
use famcall_layout::LayoutError;
use famcall_umi::RescueError;
use thiserror::Error;

/// Result type alias for famcall operations
pub type Result<T> = std::result::Result<T, FamcallError>;

/// Error type for famcall operations
#[derive(Error, Debug)]
pub enum FamcallError {
    /// A required parameter was not supplied
    #[error("Missing required parameter '{parameter}'")]
    MissingParameter {
        /// The parameter name
        parameter: String,
    },

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File does not exist or cannot be used
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFile {
        /// Type of file (e.g., "FASTQ", "SAM")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A record was missing data needed to process it
    #[error("Malformed record '{read_name}': {reason}")]
    MalformedRecord {
        /// Name of the offending read
        read_name: String,
        /// Explanation of the problem
        reason: String,
    },

    /// An external tool exited unsuccessfully
    #[error("Command '{command}' failed with {status}")]
    ExternalToolFailed {
        /// The full command line
        command: String,
        /// Exit status description
        status: String,
    },

    /// An external tool did not finish in time and was killed
    #[error("Command '{command}' timed out after {seconds}s")]
    ExternalToolTimeout {
        /// The full command line
        command: String,
        /// The timeout that elapsed
        seconds: u64,
    },

    /// An external tool could not be started or waited on
    #[error("Command '{command}' could not be run: {source}")]
    ExternalToolIo {
        /// The full command line
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Rescue(#[from] RescueError),
}
