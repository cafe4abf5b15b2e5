//! Metrics for consensus calling over barcode families.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Metric, ProcessingMetrics, ratio};

/// Totals over every family passed through a consensus caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyMetrics {
    /// Reads read from the input
    pub total_input_reads: u64,
    /// Families called, one consensus read each
    pub families: u64,
    /// Families made of a single read, passed through verbatim
    pub single_read_families: u64,
    /// Families whose qualities were masked as too discordant
    pub masked_families: u64,
    /// Largest family seen
    pub max_family_size: u64,
    /// Consensus bases emitted
    pub consensus_bases: u64,
    /// Raw base observations folded into the consensus bases
    pub raw_observations: u64,
    /// Sum of `ND` over all consensus reads
    pub disagreeing_observations: u64,
    /// Mean reads per family
    pub mean_family_size: f64,
    /// Disagreeing observations per raw base observation
    pub disagreement_rate: f64,
}

impl FamilyMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one called family.
    pub fn record_family(
        &mut self,
        family_size: u64,
        read_length: u64,
        disagreements: u64,
        masked: bool,
    ) {
        self.total_input_reads += family_size;
        self.families += 1;
        if family_size == 1 {
            self.single_read_families += 1;
        }
        if masked {
            self.masked_families += 1;
        }
        self.max_family_size = self.max_family_size.max(family_size);
        self.consensus_bases += read_length;
        self.raw_observations += family_size * read_length;
        self.disagreeing_observations += disagreements;
    }

    /// Adds the counts of `other`. Derived fields are refreshed by [`Self::finalize`].
    pub fn merge(&mut self, other: &Self) {
        self.total_input_reads += other.total_input_reads;
        self.families += other.families;
        self.single_read_families += other.single_read_families;
        self.masked_families += other.masked_families;
        self.max_family_size = self.max_family_size.max(other.max_family_size);
        self.consensus_bases += other.consensus_bases;
        self.raw_observations += other.raw_observations;
        self.disagreeing_observations += other.disagreeing_observations;
    }

    /// Computes the mean family size and disagreement rate.
    pub fn finalize(&mut self) {
        self.mean_family_size = ratio(self.total_input_reads, self.families);
        self.disagreement_rate = ratio(self.disagreeing_observations, self.raw_observations);
    }
}

impl ProcessingMetrics for FamilyMetrics {
    fn total_input(&self) -> u64 {
        self.total_input_reads
    }

    fn total_output(&self) -> u64 {
        self.families
    }

    fn total_filtered(&self) -> u64 {
        self.masked_families
    }
}

impl Metric for FamilyMetrics {
    fn metric_name() -> &'static str {
        "family"
    }
}

/// One row of the family size histogram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilySizeMetric {
    /// Number of reads in the family
    pub family_size: u64,
    /// Number of families of this size
    pub count: u64,
    /// Fraction of all families with this size
    pub fraction: f64,
    /// Fraction of families with size >= `family_size`
    pub fraction_gt_or_eq_size: f64,
}

impl Metric for FamilySizeMetric {
    fn metric_name() -> &'static str {
        "family size"
    }
}

/// Counts families by size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilySizeCounter {
    counts: BTreeMap<u64, u64>,
}

impl FamilySizeCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, family_size: u64) {
        *self.counts.entry(family_size).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &Self) {
        for (&size, &count) in &other.counts {
            *self.counts.entry(size).or_insert(0) += count;
        }
    }

    /// Histogram rows in increasing family size.
    #[must_use]
    pub fn to_metrics(&self) -> Vec<FamilySizeMetric> {
        let total: u64 = self.counts.values().sum();
        let mut remaining = total;
        self.counts
            .iter()
            .map(|(&family_size, &count)| {
                let metric = FamilySizeMetric {
                    family_size,
                    count,
                    fraction: ratio(count, total),
                    fraction_gt_or_eq_size: ratio(remaining, total),
                };
                remaining -= count;
                metric
            })
            .collect()
    }
}
