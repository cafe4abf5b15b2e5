#![deny(unsafe_code)]

//! Barcode counting and Hamming-neighborhood barcode rescue.
//!
//! - [`distance`] - mismatch counting between barcodes
//! - [`histogram`] - barcode occurrence counts from an index-read stream
//! - [`rescue`] - the [`RescueIndex`] mapping near-miss barcodes onto true families

pub mod distance;
pub mod histogram;
pub mod rescue;

pub use distance::{count_mismatches, matches_within};
pub use histogram::BarcodeHistogram;
pub use rescue::{BarcodeAssignment, RescueError, RescueIndex, RescueOptions};
