//! Consensus calling over batches of barcode families.

use anyhow::{Context, Result};
use famcall_consensus::{FamilyConsensusCaller, ReadRecord};
use famcall_metrics::{FamilyMetrics, FamilySizeCounter};

/// A barcode and the reads of its family.
pub type Family = (String, Vec<ReadRecord>);

/// Consensus reads and per-batch metrics for one batch of families.
#[derive(Debug, Default)]
pub struct FamilyBatch {
    /// One consensus read per family, in input order
    pub reads: Vec<ReadRecord>,
    pub metrics: FamilyMetrics,
    pub sizes: FamilySizeCounter,
}

impl FamilyBatch {
    /// Folds this batch's metrics into running totals.
    pub fn merge_metrics_into(&self, metrics: &mut FamilyMetrics, sizes: &mut FamilySizeCounter) {
        metrics.merge(&self.metrics);
        sizes.merge(&self.sizes);
    }
}

/// Calls the consensus of every family in `families`.
///
/// # Errors
///
/// Fails on the first family the caller rejects, naming its barcode.
pub fn call_families(
    caller: &dyn FamilyConsensusCaller,
    families: Vec<Family>,
) -> Result<FamilyBatch> {
    let mut batch =
        FamilyBatch { reads: Vec::with_capacity(families.len()), ..FamilyBatch::default() };
    for (barcode, reads) in families {
        let consensus = caller
            .call(&reads)
            .with_context(|| format!("Failed to call consensus for family {barcode}"))?;
        let size = reads.len() as u64;
        batch.metrics.record_family(
            size,
            consensus.read.len() as u64,
            u64::from(consensus.read.tags.nd.unwrap_or(0)),
            consensus.masked,
        );
        batch.sizes.record(size);
        batch.reads.push(consensus.read);
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use famcall_consensus::{ConsensusAlgorithm, ConsensusOptions, FamilyTags};

    fn read(name: &str, bases: &[u8], quals: &[u32]) -> ReadRecord {
        let mut read = ReadRecord::new(name, bases, quals);
        read.tags = FamilyTags { bs: Some("ACGT".to_string()), ..FamilyTags::default() };
        read
    }

    #[test]
    fn test_call_families_records_metrics() {
        let caller = ConsensusAlgorithm::Fisher.build(ConsensusOptions::default());
        let families = vec![
            (
                "ACGT".to_string(),
                vec![
                    read("a1", b"AAAA", &[30; 4]),
                    read("a2", b"AAAA", &[30; 4]),
                    read("a3", b"AAAA", &[30; 4]),
                    read("a4", b"AAAT", &[30, 30, 30, 10]),
                ],
            ),
            ("TTTT".to_string(), vec![read("t1", b"GGGG", &[20; 4])]),
        ];
        let batch = call_families(caller.as_ref(), families).unwrap();

        assert_eq!(batch.reads.len(), 2);
        assert_eq!(batch.reads[0].bases, b"AAAA");
        assert_eq!(batch.reads[0].tags.nd, Some(1));
        assert_eq!(batch.reads[1].name, "t1");
        assert_eq!(batch.reads[1].tags.fm, Some(1));

        assert_eq!(batch.metrics.total_input_reads, 5);
        assert_eq!(batch.metrics.families, 2);
        assert_eq!(batch.metrics.single_read_families, 1);
        assert_eq!(batch.metrics.disagreeing_observations, 1);
        assert_eq!(batch.sizes.to_metrics().len(), 2);
    }

    #[test]
    fn test_call_families_names_the_failing_family() {
        let caller = ConsensusAlgorithm::Fast.build(ConsensusOptions::default());
        let families = vec![(
            "GGGG".to_string(),
            vec![read("g1", b"AAAA", &[30; 4]), read("g2", b"AAA", &[30; 3])],
        )];
        let err = call_families(caller.as_ref(), families).unwrap_err();
        assert!(err.to_string().contains("GGGG"));
        assert!(format!("{err:#}").contains("g2"));
    }
}
