//! Parameter and input checks run before any record is read.
//!
//! Every check returns a [`FamcallError`] naming the offending parameter so configuration
//! problems fail fast with a message the user can act on.

use std::fmt::Display;
use std::path::Path;

use crate::errors::{FamcallError, Result};

/// Validates that a required parameter was supplied.
///
/// # Example
/// ```
/// use famcall_lib::validation::require;
///
/// assert_eq!(require(Some(3), "threads").unwrap(), 3);
/// assert!(require::<u32>(None, "index").is_err());
/// ```
pub fn require<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| FamcallError::MissingParameter { parameter: name.to_string() })
}

/// Validates that a file exists and is not a directory.
///
/// # Example
/// ```
/// use famcall_lib::validation::validate_file_exists;
///
/// assert!(validate_file_exists("/nonexistent/reads.fq", "FASTQ").is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, file_type: &str) -> Result<()> {
    let path = path.as_ref();
    let reason = if !path.exists() {
        "File does not exist"
    } else if path.is_dir() {
        "Path is a directory"
    } else {
        return Ok(());
    };
    Err(FamcallError::InvalidFile {
        file_type: file_type.to_string(),
        path: path.display().to_string(),
        reason: reason.to_string(),
    })
}

/// Validates that the directory an output file will be written into exists.
pub fn validate_output_parent<P: AsRef<Path>>(path: P, name: &str) -> Result<()> {
    let path = path.as_ref();
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(FamcallError::InvalidParameter {
                parameter: name.to_string(),
                reason: format!("Output directory '{}' does not exist", parent.display()),
            })
        }
        _ => Ok(()),
    }
}

/// Validates that a fraction lies in `[0, 1]`.
///
/// # Example
/// ```
/// use famcall_lib::validation::validate_fraction;
///
/// validate_fraction(0.2, "min-agreement-fraction").unwrap();
/// assert!(validate_fraction(1.5, "max-agreement-fraction").is_err());
/// ```
pub fn validate_fraction(value: f64, name: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(FamcallError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be between 0 and 1, got: {value}"),
        });
    }
    Ok(())
}

/// Validates that `low <= high`.
pub fn validate_ordered<T: PartialOrd + Display>(
    low: T,
    high: T,
    low_name: &str,
    high_name: &str,
) -> Result<()> {
    if high < low {
        return Err(FamcallError::InvalidParameter {
            parameter: high_name.to_string(),
            reason: format!("{high_name} ({high}) must be >= {low_name} ({low})"),
        });
    }
    Ok(())
}

/// Validates that a value is positive (> 0).
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(FamcallError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be positive (> 0), got: {value}"),
        });
    }
    Ok(())
}

/// Validates that a value does not exceed `max`.
pub fn validate_at_most<T: Ord + Display>(value: T, max: T, name: &str) -> Result<()> {
    if value > max {
        return Err(FamcallError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be at most {max}, got: {value}"),
        });
    }
    Ok(())
}
