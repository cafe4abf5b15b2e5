//! # Family Consensus Calling
//!
//! A barcode family is every read sharing one barcode. A [`FamilyConsensusCaller`] folds the
//! family into a single [`ReadRecord`] carrying:
//!
//! - the consensus bases and recalibrated qualities (also in `PV`, uncapped);
//! - `FA`, the number of reads agreeing with the call at each position;
//! - `FM`, the family size;
//! - `ND = FM * L - sum(FA)`, the number of disagreeing observations.
//!
//! A family of one read is returned verbatim with `FM=1`, `ND=0` and `FA` all ones. The name,
//! comment and non-consensus tags of the output come from the first read of the family.
//!
//! Two callers are provided: [`FisherConsensusCaller`](crate::fisher::FisherConsensusCaller),
//! and the cheaper [`FastCompareCaller`](crate::fast::FastCompareCaller) which sums raw
//! qualities and masks families that disagree too much.

use std::fmt;
use std::str::FromStr;

use crate::errors::{ConsensusError, Result};
use crate::fast::FastCompareCaller;
use crate::fisher::FisherConsensusCaller;
use crate::phred::DEFAULT_UNDERFLOW_QUALITY;
use crate::read::ReadRecord;
use crate::sequence::ConsensusSequence;

/// Default lowest per-position agreement fraction a fast-compare family may show
pub const DEFAULT_MIN_AGREEMENT_FRACTION: f64 = 0.2;

/// Default agreement fraction at least one position of a fast-compare family must reach
pub const DEFAULT_MAX_AGREEMENT_FRACTION: f64 = 0.9;

/// Tunables shared by the consensus callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsensusOptions {
    /// Quality reported when the Fisher p-value underflows
    pub underflow_quality: u32,
    /// Fast compare masks a family whose lowest agreement fraction falls below this
    pub min_agreement_fraction: f64,
    /// Fast compare masks a family whose highest agreement fraction stays below this
    pub max_agreement_fraction: f64,
}

impl Default for ConsensusOptions {
    fn default() -> Self {
        Self {
            underflow_quality: DEFAULT_UNDERFLOW_QUALITY,
            min_agreement_fraction: DEFAULT_MIN_AGREEMENT_FRACTION,
            max_agreement_fraction: DEFAULT_MAX_AGREEMENT_FRACTION,
        }
    }
}

/// Which base-calling model to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsensusAlgorithm {
    /// Chi-square / Fisher-combination model
    #[default]
    Fisher,
    /// Quality-sum voting with family-level masking
    Fast,
}

impl ConsensusAlgorithm {
    /// Builds the caller for this algorithm.
    #[must_use]
    pub fn build(self, options: ConsensusOptions) -> Box<dyn FamilyConsensusCaller> {
        match self {
            Self::Fisher => Box::new(FisherConsensusCaller::new(options)),
            Self::Fast => Box::new(FastCompareCaller::new(options)),
        }
    }
}

impl FromStr for ConsensusAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fisher" => Ok(Self::Fisher),
            "fast" | "fast-compare" => Ok(Self::Fast),
            other => Err(format!("unknown consensus algorithm '{other}' (expected fisher or fast)")),
        }
    }
}

impl fmt::Display for ConsensusAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fisher => write!(f, "fisher"),
            Self::Fast => write!(f, "fast"),
        }
    }
}

/// The consensus of one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyConsensus {
    pub read: ReadRecord,
    /// True when the family was too discordant and every quality was set to 0
    pub masked: bool,
}

/// Calls one consensus read per barcode family.
///
/// Implementations are stateless so a single caller can be shared across worker threads.
pub trait FamilyConsensusCaller: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Calls the consensus for `family`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::EmptyFamily`] for an empty family and
    /// [`ConsensusError::MalformedRead`] naming the first read whose arrays are inconsistent or
    /// whose length differs from the rest of the family.
    fn call(&self, family: &[ReadRecord]) -> Result<FamilyConsensus>;
}

/// Checks that the family is non-empty and every read is well formed and of equal length.
/// Returns the common read length.
///
/// # Errors
///
/// See [`FamilyConsensusCaller::call`].
pub fn validate_family(family: &[ReadRecord]) -> Result<usize> {
    let first = family.first().ok_or(ConsensusError::EmptyFamily)?;
    let len = first.len();
    for read in family {
        read.validate()?;
        if read.len() != len {
            return Err(ConsensusError::MalformedRead {
                read_name: read.name.clone(),
                reason: format!(
                    "length {} differs from family length {len} of read '{}'",
                    read.len(),
                    first.name
                ),
            });
        }
    }
    Ok(len)
}

/// The consensus of a single-read family: the read itself with `FM=1`, `ND=0`, `FA` all ones.
#[must_use]
pub fn single_read_consensus(read: &ReadRecord) -> ReadRecord {
    let mut seq = ConsensusSequence::with_capacity(read.len());
    for (&base, &qual) in read.bases.iter().zip(&read.qualities) {
        seq.push(base, qual, 1);
    }
    assemble_consensus(read, 1, seq)
}

/// Builds the output record from the first read of the family and the called sequence.
#[must_use]
pub fn assemble_consensus(
    first: &ReadRecord,
    family_size: usize,
    seq: ConsensusSequence,
) -> ReadRecord {
    let disagreements = seq.disagreements(family_size);
    let (bases, qualities, agreements) = seq.into_parts();

    let mut tags = first.tags.clone();
    tags.pv.clone_from(&qualities);
    tags.fa = agreements;
    tags.fm = Some(u32::try_from(family_size).unwrap_or(u32::MAX));
    tags.nd = Some(u32::try_from(disagreements).unwrap_or(u32::MAX));

    ReadRecord { name: first.name.clone(), comment: first.comment.clone(), bases, qualities, tags }
}
