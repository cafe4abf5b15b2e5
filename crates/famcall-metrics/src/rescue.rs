//! Metrics for barcode rescue.

use serde::{Deserialize, Serialize};

use crate::{Metric, ProcessingMetrics, ratio};

/// Counts describing the rescue index and how reads were assigned to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RescueMetrics {
    /// Index reads used to build the histogram
    pub index_reads: u64,
    /// Distinct barcodes among the index reads
    pub distinct_barcodes: u64,
    /// Barcodes at or above the family size threshold
    pub true_barcodes: u64,
    /// Barcodes resolving to a true family, true barcodes included
    pub registered_variants: u64,
    /// Variants equally close to two true barcodes and left unassigned
    pub ambiguous_variants: u64,
    /// Reads processed
    pub total_reads: u64,
    /// Reads whose barcode is a true family
    pub true_reads: u64,
    /// Reads moved onto a true family
    pub rescued_reads: u64,
    /// Reads left as observed, low confidence
    pub unassigned_reads: u64,
    /// Reads carrying no barcode
    pub reads_without_barcode: u64,
    /// Fraction of reads rescued
    pub rescue_rate: f64,
}

impl RescueMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the read counts of `other`; index fields are left as they are.
    pub fn merge(&mut self, other: &Self) {
        self.total_reads += other.total_reads;
        self.true_reads += other.true_reads;
        self.rescued_reads += other.rescued_reads;
        self.unassigned_reads += other.unassigned_reads;
        self.reads_without_barcode += other.reads_without_barcode;
    }

    pub fn finalize(&mut self) {
        self.rescue_rate = ratio(self.rescued_reads, self.total_reads);
    }
}

impl ProcessingMetrics for RescueMetrics {
    fn total_input(&self) -> u64 {
        self.total_reads
    }

    fn total_output(&self) -> u64 {
        self.true_reads + self.rescued_reads
    }

    fn total_filtered(&self) -> u64 {
        self.unassigned_reads + self.reads_without_barcode
    }
}

impl Metric for RescueMetrics {
    fn metric_name() -> &'static str {
        "rescue"
    }
}
