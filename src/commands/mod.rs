//! CLI command implementations for famcall.
//!
//! - [`consensus`] - call one consensus read per barcode family of a FASTQ
//! - [`merge`] - merge overlapping mates of a name-grouped SAM into single records
//! - [`rescue`] - move reads with near-miss barcodes onto well-supported families

#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod consensus;
pub mod merge;
pub mod rescue;
