#![deny(unsafe_code)]

//! Per-position alignment layouts and mate-pair merging.
//!
//! - [`cigar`] - supported CIGAR operations and run-length encoding
//! - [`layout`] - the [`Layout`] model and its SAM serialization
//! - [`merge`] - merging overlapping mates into one layout
//! - [`sam`] - building layouts from noodles records

pub mod cigar;
pub mod errors;
pub mod layout;
pub mod merge;
pub mod sam;

pub use cigar::{CigarOp, Operation, format_cigar, parse_cigar};
pub use errors::LayoutError;
pub use layout::{Layout, LayoutPosition, MergeState, RecordInfo};
pub use merge::{
    AgreementStrategy, DisagreementStrategy, MergeFailure, MergeOptions, MergeOutcome, MergeStats,
    mark_merge_not_attempted, merge_layouts,
};
pub use sam::layout_from_record;
