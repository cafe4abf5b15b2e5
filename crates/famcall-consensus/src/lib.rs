#![deny(unsafe_code)]

//! Quality codec, family tag schema and statistical base callers.
//!
//! - [`quality`] - Phred/ASCII conversions and `|KEY=v0,v1` integer array tags
//! - [`tags`] - typed auxiliary tags with description and SAM serializations
//! - [`read`] - barcode-tagged reads in FASTQ-like form
//! - [`phred`] - chi-square transforms and Fisher p-values
//! - [`base_builder`] - per-position Fisher evidence accumulation
//! - [`caller`] - the [`FamilyConsensusCaller`] trait and shared helpers
//! - [`fisher`] / [`fast`] - the two consensus algorithms

pub mod base_builder;
pub mod caller;
pub mod errors;
pub mod fast;
pub mod fisher;
pub mod phred;
pub mod quality;
pub mod read;
pub mod sequence;
pub mod tags;

pub use caller::{
    ConsensusAlgorithm, ConsensusOptions, FamilyConsensus, FamilyConsensusCaller,
    validate_family,
};
pub use errors::{CodecError, ConsensusError};
pub use fast::FastCompareCaller;
pub use fisher::FisherConsensusCaller;
pub use read::ReadRecord;
pub use tags::{ExtraTag, FamilyTags};
