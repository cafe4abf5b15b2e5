#![deny(unsafe_code)]

//! Metric accumulators and TSV writer for famcall commands.
//!
//! - [`Metric`] and [`ProcessingMetrics`] traits shared by every metric type
//! - [`family`] - consensus family counts and the family size histogram
//! - [`merge`] - mate-pair merge outcomes
//! - [`rescue`] - barcode rescue outcomes
//! - [`writer`] - TSV output

pub mod family;
pub mod merge;
pub mod rescue;
pub mod writer;

use serde::{Deserialize, Serialize};

/// Number of decimal places used for float metrics.
pub const FLOAT_PRECISION: usize = 6;

/// Formats a float value with the standard precision for metrics.
///
/// # Example
/// ```
/// use famcall_metrics::format_float;
/// assert_eq!(format_float(0.9), "0.900000");
/// ```
#[must_use]
pub fn format_float(value: f64) -> String {
    format!("{value:.FLOAT_PRECISION$}")
}

/// Formats a count with thousands separators.
///
/// # Example
/// ```
/// use famcall_metrics::format_count;
/// assert_eq!(format_count(1234567), "1,234,567");
/// assert_eq!(format_count(12), "12");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Ratio of two counts, 0 when the denominator is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

/// A metric type that can be serialized to TSV files.
pub trait Metric: Serialize + for<'de> Deserialize<'de> + Clone + Default {
    /// Human-readable name used in error messages and logs.
    fn metric_name() -> &'static str;
}

/// Common interface for metrics that track processing pipeline counts.
pub trait ProcessingMetrics {
    /// Total number of input items processed.
    fn total_input(&self) -> u64;

    /// Total number of output items produced.
    fn total_output(&self) -> u64;

    /// Total number of items filtered, masked or left unresolved.
    fn total_filtered(&self) -> u64;

    /// Output as a percentage of input.
    fn efficiency(&self) -> f64 {
        ratio(self.total_output(), self.total_input()) * 100.0
    }
}

pub use family::{FamilyMetrics, FamilySizeCounter, FamilySizeMetric};
pub use merge::MergeMetrics;
pub use rescue::RescueMetrics;
pub use writer::{write_metrics, write_metrics_auto};
