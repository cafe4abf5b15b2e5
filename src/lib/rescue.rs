//! Building the rescue index from index reads and rewriting read barcodes against it.

use anyhow::Result;
use famcall_consensus::ReadRecord;
use famcall_metrics::RescueMetrics;
use famcall_umi::{BarcodeAssignment, BarcodeHistogram, RescueIndex, RescueOptions};
use log::info;

use crate::progress::ProgressTracker;

/// Counts the sequences of the index reads.
pub fn histogram_from_index_reads<I>(reads: I) -> Result<BarcodeHistogram>
where
    I: Iterator<Item = Result<ReadRecord>>,
{
    let progress = ProgressTracker::new("index reads");
    let mut histogram = BarcodeHistogram::new();
    for read in reads {
        let read = read?;
        histogram.add(&String::from_utf8_lossy(&read.bases));
        progress.record(1);
    }
    progress.finish();
    Ok(histogram)
}

/// Builds the rescue index and starts the metrics with its description.
pub fn build_index(
    histogram: &BarcodeHistogram,
    options: RescueOptions,
) -> Result<(RescueIndex, RescueMetrics)> {
    let index = RescueIndex::build(histogram, options)?;
    info!(
        "Found {} true barcodes with at least {} reads",
        index.true_barcodes().len(),
        options.min_family_size
    );
    let metrics = RescueMetrics {
        index_reads: histogram.total(),
        distinct_barcodes: histogram.len() as u64,
        true_barcodes: index.true_barcodes().len() as u64,
        registered_variants: index.registered_variants() as u64,
        ambiguous_variants: index.ambiguous_variants() as u64,
        ..RescueMetrics::default()
    };
    Ok((index, metrics))
}

/// Moves a read onto its true family when its barcode is a near miss.
///
/// A rescued read gets the canonical barcode in `BS` and its `RC` incremented. A read whose
/// barcode matches no true family keeps its barcode and is marked as a low-confidence singleton
/// with `RC=0` unless it already carries a rescue count. True reads are left untouched.
pub fn rescue_read(index: &RescueIndex, read: &mut ReadRecord, metrics: &mut RescueMetrics) {
    metrics.total_reads += 1;
    let Some(barcode) = read.barcode() else {
        metrics.reads_without_barcode += 1;
        return;
    };
    match index.assign(barcode) {
        BarcodeAssignment::True => metrics.true_reads += 1,
        BarcodeAssignment::Unassigned => {
            read.tags.rc.get_or_insert(0);
            metrics.unassigned_reads += 1;
        }
        BarcodeAssignment::Rescued { canonical } => {
            let canonical = canonical.to_string();
            read.tags.bs = Some(canonical);
            read.tags.rc = Some(read.tags.rc.unwrap_or(0) + 1);
            metrics.rescued_reads += 1;
        }
    }
}
