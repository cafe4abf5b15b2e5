//! Phred score transforms used by the Fisher-combination consensus model.
//!
//! A Phred quality `q` corresponds to an error probability `p = 10^(-q/10)`. Fisher's method
//! combines `k` independent p-values through the statistic `X = -2 * sum(ln p_i)`, which follows
//! a chi-square distribution with `2k` degrees of freedom. All sums here are kept at half scale
//! (`X / 2`), so the combined p-value is the regularized upper incomplete gamma function
//! `Q(k, X / 2)`.

use std::f64::consts::LN_10;

use statrs::function::gamma::gamma_ur;

/// Lowest quality assigned to a resolved disagreement (matches the mask quality used for `N`)
pub const MIN_PHRED: u32 = 2;

/// Quality reported when the combined p-value underflows or is otherwise not representable
pub const DEFAULT_UNDERFLOW_QUALITY: u32 = 3114;

/// No-call base
pub const NO_CALL_BASE: u8 = b'N';

/// Base stored in layout slots that represent deleted reference bases
pub const DELETION_BASE: u8 = b'-';

/// Error probability cap. Q0 means a uniformly random call, i.e. wrong three times in four.
const MAX_ERROR_PROBABILITY: f64 = 0.75;

/// Error probability of a Phred quality, capped at 0.75.
///
/// # Examples
/// ```
/// use famcall_consensus::phred::error_probability;
///
/// assert!((error_probability(20) - 0.01).abs() < 1e-12);
/// assert!((error_probability(0) - 0.75).abs() < 1e-12);
/// ```
#[inline]
#[must_use]
pub fn error_probability(quality: u32) -> f64 {
    10f64.powf(-f64::from(quality) / 10.0).min(MAX_ERROR_PROBABILITY)
}

/// Half-scale chi-square evidence that a base with this quality is correct: `-ln(p_error)`.
///
/// # Examples
/// ```
/// use famcall_consensus::phred::chi2;
///
/// assert!((chi2(10) - std::f64::consts::LN_10).abs() < 1e-12);
/// ```
#[inline]
#[must_use]
pub fn chi2(quality: u32) -> f64 {
    if quality < 2 { -error_probability(quality).ln() } else { f64::from(quality) * LN_10 / 10.0 }
}

/// Half-scale chi-square evidence against the alternatives of a base: `-ln(1 - p_error)`.
#[inline]
#[must_use]
pub fn inv_chi2(quality: u32) -> f64 {
    -(-error_probability(quality)).ln_1p()
}

/// Combined p-value of `count` independent observations whose half-scale statistics sum to
/// `chi2_sum`. Returns `None` when `count` is zero or the sum is not a finite non-negative value.
#[must_use]
pub fn fisher_pvalue(count: u32, chi2_sum: f64) -> Option<f64> {
    if count == 0 || !chi2_sum.is_finite() || chi2_sum < 0.0 {
        return None;
    }
    if chi2_sum <= 0.0 {
        return Some(1.0);
    }
    Some(gamma_ur(f64::from(count), chi2_sum))
}

/// Converts a p-value to a rounded Phred quality, substituting `underflow_quality` for
/// p-values that produce a non-finite or negative score.
///
/// # Examples
/// ```
/// use famcall_consensus::phred::{DEFAULT_UNDERFLOW_QUALITY, pvalue_to_phred};
///
/// assert_eq!(pvalue_to_phred(0.001, DEFAULT_UNDERFLOW_QUALITY), 30);
/// assert_eq!(pvalue_to_phred(0.0, DEFAULT_UNDERFLOW_QUALITY), 3114);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn pvalue_to_phred(pvalue: f64, underflow_quality: u32) -> u32 {
    let phred = (-10.0 * pvalue.log10()).round();
    if phred.is_finite() && phred >= 0.0 && phred < f64::from(u32::MAX) {
        phred as u32
    } else {
        underflow_quality
    }
}

/// Quality of a position where two independent observations agree on the same base.
///
/// The two error probabilities are Fisher-combined; the result never drops below the better of
/// the two inputs.
///
/// # Examples
/// ```
/// use famcall_consensus::phred::{DEFAULT_UNDERFLOW_QUALITY, agreed_quality};
///
/// assert_eq!(agreed_quality(30, 30, DEFAULT_UNDERFLOW_QUALITY), 48);
/// assert_eq!(agreed_quality(30, 2, DEFAULT_UNDERFLOW_QUALITY), 30);
/// ```
#[must_use]
pub fn agreed_quality(q1: u32, q2: u32, underflow_quality: u32) -> u32 {
    let combined = fisher_pvalue(2, chi2(q1) + chi2(q2))
        .map_or(underflow_quality, |p| pvalue_to_phred(p, underflow_quality));
    combined.max(q1.max(q2))
}

/// Quality of the winning base where two observations disagree: `q_high - q_low`, floored at
/// [`MIN_PHRED`] and never above `q_high`.
///
/// # Examples
/// ```
/// use famcall_consensus::phred::disagreed_quality;
///
/// assert_eq!(disagreed_quality(35, 20), 15);
/// assert_eq!(disagreed_quality(21, 20), 2);
/// ```
#[must_use]
pub fn disagreed_quality(q1: u32, q2: u32) -> u32 {
    let (high, low) = if q1 >= q2 { (q1, q2) } else { (q2, q1) };
    (high - low).max(MIN_PHRED).min(high)
}
