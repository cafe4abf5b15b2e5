//! Metrics for mate-pair merging.

use serde::{Deserialize, Serialize};

use crate::{Metric, ProcessingMetrics, ratio};

/// Outcome counts of merging read pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeMetrics {
    /// Read pairs examined
    pub total_pairs: u64,
    /// Pairs merged into a single record
    pub merged_pairs: u64,
    /// Pairs with an unmapped mate
    pub failed_unmapped: u64,
    /// Pairs whose mates are on different contigs
    pub failed_different_contigs: u64,
    /// Pairs whose mates share no reference position
    pub failed_no_overlap: u64,
    /// Pairs whose merged alignment would hold a soft clip between aligned bases
    pub failed_interior_clip: u64,
    /// Records without a mate in the input, written unchanged
    pub unpaired_records: u64,
    /// Positions covered by both mates of merged pairs
    pub overlapping_bases: u64,
    pub agreeing_bases: u64,
    pub disagreeing_bases: u64,
    /// Fraction of pairs merged
    pub merge_rate: f64,
    /// Fraction of overlapping positions where the mates disagreed
    pub disagreement_rate: f64,
}

impl MergeMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a merged pair and its overlap counts.
    pub fn record_merged(&mut self, overlapping: u64, agreeing: u64, disagreeing: u64) {
        self.total_pairs += 1;
        self.merged_pairs += 1;
        self.overlapping_bases += overlapping;
        self.agreeing_bases += agreeing;
        self.disagreeing_bases += disagreeing;
    }

    pub fn merge(&mut self, other: &Self) {
        self.total_pairs += other.total_pairs;
        self.merged_pairs += other.merged_pairs;
        self.failed_unmapped += other.failed_unmapped;
        self.failed_different_contigs += other.failed_different_contigs;
        self.failed_no_overlap += other.failed_no_overlap;
        self.failed_interior_clip += other.failed_interior_clip;
        self.unpaired_records += other.unpaired_records;
        self.overlapping_bases += other.overlapping_bases;
        self.agreeing_bases += other.agreeing_bases;
        self.disagreeing_bases += other.disagreeing_bases;
    }

    /// Pairs that could not be merged.
    #[must_use]
    pub fn failed_pairs(&self) -> u64 {
        self.failed_unmapped
            + self.failed_different_contigs
            + self.failed_no_overlap
            + self.failed_interior_clip
    }

    pub fn finalize(&mut self) {
        self.merge_rate = ratio(self.merged_pairs, self.total_pairs);
        self.disagreement_rate = ratio(self.disagreeing_bases, self.overlapping_bases);
    }
}

impl ProcessingMetrics for MergeMetrics {
    fn total_input(&self) -> u64 {
        self.total_pairs
    }

    fn total_output(&self) -> u64 {
        self.merged_pairs
    }

    fn total_filtered(&self) -> u64 {
        self.failed_pairs()
    }
}

impl Metric for MergeMetrics {
    fn metric_name() -> &'static str {
        "merge"
    }
}
