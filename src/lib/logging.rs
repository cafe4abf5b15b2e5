//! Formatting helpers and per-command summaries for log output.

use std::time::{Duration, Instant};

use famcall_metrics::{FamilyMetrics, MergeMetrics, ProcessingMetrics, RescueMetrics, format_count};

/// Formats a fraction as a percentage.
///
/// # Examples
///
/// ```
/// use famcall_lib::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(1.0, 0), "100%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

/// Formats a duration as `45s`, `2m 15s` or `1h 30m`.
///
/// # Examples
///
/// ```
/// use famcall_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, mins, secs) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (hours, mins, secs) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

/// Formats a throughput, falling back to items per minute below one per second.
///
/// # Examples
///
/// ```
/// use famcall_lib::logging::format_rate;
/// use std::time::Duration;
///
/// assert_eq!(format_rate(1000, Duration::from_secs(1)), "1,000 items/s");
/// assert_eq!(format_rate(30, Duration::from_secs(60)), "30.0 items/min");
/// ```
#[must_use]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} items/s", format_count(count));
    }
    let per_sec = count as f64 / secs;
    if per_sec >= 1.0 {
        format!("{} items/s", format_count(per_sec as u64))
    } else {
        format!("{:.1} items/min", per_sec * 60.0)
    }
}

/// Logs a summary of consensus calling. Expects finalized metrics.
pub fn log_family_summary(metrics: &FamilyMetrics) {
    log::info!("Consensus Summary:");
    log::info!("  Input reads: {}", format_count(metrics.total_input_reads));
    log::info!("  Families: {}", format_count(metrics.families));
    if metrics.families == 0 {
        return;
    }
    log::info!("  Single-read families: {}", format_count(metrics.single_read_families));
    log::info!("  Mean family size: {:.2}", metrics.mean_family_size);
    log::info!("  Max family size: {}", format_count(metrics.max_family_size));
    log::info!("  Disagreement rate: {}", format_percent(metrics.disagreement_rate, 3));
    if metrics.masked_families > 0 {
        log::info!("  Masked families: {}", format_count(metrics.masked_families));
    }
}

/// Logs a summary of mate-pair merging. Expects finalized metrics.
pub fn log_merge_summary(metrics: &MergeMetrics) {
    log::info!("Merge Summary:");
    log::info!("  Read pairs: {}", format_count(metrics.total_pairs));
    log::info!("  Merged pairs: {}", format_count(metrics.merged_pairs));
    if metrics.total_pairs > 0 {
        log::info!("  Merge rate: {}", format_percent(metrics.merge_rate, 2));
    }
    if metrics.failed_pairs() > 0 {
        log::info!(
            "  Not merged: {} unmapped, {} on different contigs, {} without overlap, {} with \
             clips inside the alignment",
            format_count(metrics.failed_unmapped),
            format_count(metrics.failed_different_contigs),
            format_count(metrics.failed_no_overlap),
            format_count(metrics.failed_interior_clip)
        );
    }
    if metrics.overlapping_bases > 0 {
        log::info!("  Overlapping bases: {}", format_count(metrics.overlapping_bases));
        log::info!("  Disagreement rate: {}", format_percent(metrics.disagreement_rate, 3));
    }
    if metrics.unpaired_records > 0 {
        log::info!("  Records passed through: {}", format_count(metrics.unpaired_records));
    }
}

/// Logs a summary of barcode rescue. Expects finalized metrics.
pub fn log_rescue_summary(metrics: &RescueMetrics) {
    log::info!("Rescue Summary:");
    log::info!(
        "  Index: {} reads, {} distinct barcodes, {} true families",
        format_count(metrics.index_reads),
        format_count(metrics.distinct_barcodes),
        format_count(metrics.true_barcodes)
    );
    log::info!(
        "  Lookup: {} registered barcodes, {} ambiguous dropped",
        format_count(metrics.registered_variants),
        format_count(metrics.ambiguous_variants)
    );
    log::info!("  Reads: {}", format_count(metrics.total_reads));
    log::info!("  Rescued reads: {}", format_count(metrics.rescued_reads));
    if metrics.total_input() > 0 {
        log::info!(
            "  Assigned to a true family: {}",
            format_percent(metrics.efficiency() / 100.0, 2)
        );
    }
    log::info!(
        "Left {} reads unassigned and {} reads without a barcode.",
        format_count(metrics.unassigned_reads),
        format_count(metrics.reads_without_barcode)
    );
}

/// Logs the start of an operation and, on completion, its count, duration and rate.
///
/// # Examples
///
/// ```no_run
/// use famcall_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Calling consensus reads");
/// timer.log_completion(10_000);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    pub fn log_completion(&self, count: u64) {
        let duration = self.start_time.elapsed();
        log::info!(
            "{} completed: {} in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0s")]
    #[case(45, "45s")]
    #[case(60, "1m")]
    #[case(135, "2m 15s")]
    #[case(3600, "1h")]
    #[case(3659, "1h")]
    #[case(5400, "1h 30m")]
    fn test_format_duration(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_duration(Duration::from_secs(secs)), expected);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.5, 1), "50.0%");
        assert_eq!(format_percent(0.0, 2), "0.00%");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(60, Duration::from_secs(60)), "1 items/s");
        assert_eq!(format_rate(2_500_000, Duration::from_secs(2)), "1,250,000 items/s");
        assert_eq!(format_rate(7, Duration::from_nanos(1)), "7 items/s");
    }

    #[test]
    fn test_summaries_accept_empty_and_populated_metrics() {
        log_family_summary(&FamilyMetrics::new());
        log_merge_summary(&MergeMetrics::new());
        log_rescue_summary(&RescueMetrics::new());

        let mut family = FamilyMetrics::new();
        family.record_family(3, 100, 2, false);
        family.record_family(1, 100, 0, true);
        family.finalize();
        log_family_summary(&family);

        let mut merge = MergeMetrics::new();
        merge.total_pairs = 4;
        merge.record_merged(11, 10, 1);
        merge.failed_no_overlap = 3;
        merge.finalize();
        log_merge_summary(&merge);
    }

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::new("Test");
        timer.log_completion(1000);
    }
}
