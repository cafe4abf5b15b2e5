//! Fast-compare consensus caller.
//!
//! Each position is called by summing raw qualities per base and taking the largest sum (ties
//! go to `A < C < G < T`). The quality is the winning sum minus the sums of the other bases,
//! floored at zero. After calling, the family is judged as a whole: if the lowest per-position
//! agreement fraction is below `min_agreement_fraction`, or the highest never reaches
//! `max_agreement_fraction`, every quality is set to 0.

use log::debug;

use crate::base_builder::{BASE_TO_INDEX, DNA_BASES};
use crate::caller::{
    ConsensusOptions, FamilyConsensus, FamilyConsensusCaller, assemble_consensus,
    single_read_consensus, validate_family,
};
use crate::errors::Result;
use crate::read::ReadRecord;
use crate::sequence::ConsensusSequence;

#[derive(Debug, Clone, Default)]
pub struct FastCompareCaller {
    options: ConsensusOptions,
}

impl FastCompareCaller {
    #[must_use]
    pub fn new(options: ConsensusOptions) -> Self {
        Self { options }
    }

    /// True when the agreement fractions of `seq` fall outside the configured bounds.
    #[allow(clippy::cast_precision_loss)]
    fn is_discordant(&self, seq: &ConsensusSequence, family_size: usize) -> bool {
        let size = family_size as f64;
        let min_fraction = f64::from(seq.min_agreement()) / size;
        let max_fraction = f64::from(seq.max_agreement()) / size;
        min_fraction < self.options.min_agreement_fraction
            || max_fraction < self.options.max_agreement_fraction
    }
}

impl FamilyConsensusCaller for FastCompareCaller {
    fn name(&self) -> &'static str {
        "fast"
    }

    #[allow(clippy::cast_possible_truncation)]
    fn call(&self, family: &[ReadRecord]) -> Result<FamilyConsensus> {
        let len = validate_family(family)?;
        let first = &family[0];
        if family.len() == 1 {
            return Ok(FamilyConsensus { read: single_read_consensus(first), masked: false });
        }

        let mut seq = ConsensusSequence::with_capacity(len);
        for pos in 0..len {
            let mut sums = [0u64; 4];
            let mut counts = [0u32; 4];
            for read in family {
                let idx = BASE_TO_INDEX[read.bases[pos] as usize];
                if idx != 255 {
                    sums[idx as usize] += u64::from(read.qualities[pos]);
                    counts[idx as usize] += 1;
                }
            }

            let mut best = 0;
            for idx in 1..4 {
                if sums[idx] > sums[best] {
                    best = idx;
                }
            }
            let others: u64 = sums.iter().sum::<u64>() - sums[best];
            let quality = sums[best].saturating_sub(others).min(u64::from(u32::MAX)) as u32;
            seq.push(DNA_BASES[best], quality, counts[best]);
        }

        let masked = self.is_discordant(&seq, family.len());
        if masked {
            debug!("Masking discordant family of {} reads led by {}", family.len(), first.name);
            seq.mask_qualities();
        }
        Ok(FamilyConsensus { read: assemble_consensus(first, family.len(), seq), masked })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn family(reads: &[(&[u8], &[u32])]) -> Vec<ReadRecord> {
        reads
            .iter()
            .enumerate()
            .map(|(i, (bases, quals))| ReadRecord::new(format!("r{i}"), bases, quals))
            .collect()
    }

    #[test]
    fn test_quality_sum_vote() {
        let reads = family(&[
            (b"AC", &[30, 30]),
            (b"AC", &[30, 30]),
            (b"AC", &[30, 30]),
            (b"AG", &[30, 20]),
        ]);
        let out = FastCompareCaller::default_options().call(&reads).unwrap();
        assert!(!out.masked);
        assert_eq!(out.read.bases, b"AC");
        assert_eq!(out.read.qualities, vec![120, 70]);
        assert_eq!(out.read.tags.fa, vec![4, 3]);
        assert_eq!(out.read.tags.nd, Some(1));
    }

    #[test]
    fn test_low_quality_majority_can_lose() {
        let options = ConsensusOptions {
            min_agreement_fraction: 0.0,
            max_agreement_fraction: 0.0,
            ..ConsensusOptions::default()
        };
        let reads = family(&[(b"A", &[5]), (b"A", &[5]), (b"T", &[40])]);
        let out = FastCompareCaller::new(options).call(&reads).unwrap();
        assert_eq!(out.read.bases, b"T");
        assert_eq!(out.read.qualities, vec![30]);
        assert_eq!(out.read.tags.fa, vec![1]);
    }

    #[rstest]
    // Every position split 50/50: max fraction 0.5 never reaches 0.9
    #[case(&[(b"AC" as &[u8], &[30u32, 30] as &[u32]), (b"TG", &[30, 30])], true)]
    // Unanimous family
    #[case(&[(b"AC" as &[u8], &[30u32, 30] as &[u32]), (b"AC", &[30, 30])], false)]
    fn test_family_masking(#[case] reads: &[(&[u8], &[u32])], #[case] masked: bool) {
        let out = FastCompareCaller::default_options().call(&family(reads)).unwrap();
        assert_eq!(out.masked, masked);
        assert_eq!(out.read.qualities.iter().all(|&q| q == 0), masked);
    }

    #[test]
    fn test_min_fraction_masks() {
        // Position 1 is all N, so its agreement fraction is 0.
        let reads = family(&[(b"AN", &[30, 30]), (b"AN", &[30, 30])]);
        let out = FastCompareCaller::default_options().call(&reads).unwrap();
        assert!(out.masked);
        assert_eq!(out.read.bases, b"AA");
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let options = ConsensusOptions {
            min_agreement_fraction: 0.0,
            max_agreement_fraction: 0.5,
            ..ConsensusOptions::default()
        };
        let reads = family(&[(b"AC", &[30, 30]), (b"TG", &[30, 30])]);
        let out = FastCompareCaller::new(options).call(&reads).unwrap();
        assert!(!out.masked);
    }

    impl FastCompareCaller {
        fn default_options() -> Self {
            Self::new(ConsensusOptions::default())
        }
    }
}
