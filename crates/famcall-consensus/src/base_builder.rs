//! # Fisher-combination base calling
//!
//! Accumulates the evidence of every read at a single position and calls the consensus base.
//!
//! For each observation of base `b` with quality `q`:
//! - the running sum of candidate `b` grows by `chi2(q)`, evidence that the call is correct;
//! - the sums of the three other candidates grow by `inv_chi2(q)`, evidence against them.
//!
//! The candidate with the largest sum wins, ties going to the earliest of `A < C < G < T`. Its
//! quality is the Phred-scaled Fisher p-value `Q(count, sum)` where `count` is the number of
//! reads that observed the winning base. `N` and other non-ACGT bases contribute nothing, so an
//! all-`N` column calls `A` with quality 0 and agreement 0.

use wide::f64x4;

use crate::phred::{chi2, fisher_pvalue, inv_chi2, pvalue_to_phred};

/// The four DNA bases in candidate order
pub const DNA_BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Lookup table for converting ASCII base to index (0-3 for A,C,G,T, 255 for anything else)
pub const BASE_TO_INDEX: [u8; 256] = {
    let mut table = [255u8; 256];
    table[b'A' as usize] = 0;
    table[b'a' as usize] = 0;
    table[b'C' as usize] = 1;
    table[b'c' as usize] = 1;
    table[b'G' as usize] = 2;
    table[b'g' as usize] = 2;
    table[b'T' as usize] = 3;
    table[b't' as usize] = 3;
    table
};

/// Highest quality with a precomputed transform; larger qualities are computed on demand
const TABLE_MAX_QUALITY: u32 = 93;

/// A called consensus position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseCall {
    pub base: u8,
    pub quality: u32,
    /// Number of reads whose base equals the call
    pub agreement: u32,
}

/// Builder for calling the Fisher consensus at one position.
///
/// The four candidate sums are held in one `f64x4` and accumulated with Kahan summation, so
/// deep families do not lose the small `inv_chi2` contributions.
pub struct FisherBaseBuilder {
    sums: f64x4,
    compensations: f64x4,
    counts: [u32; 4],
    chi2_table: Vec<f64>,
    inv_chi2_table: Vec<f64>,
    underflow_quality: u32,
}

impl FisherBaseBuilder {
    /// Creates a builder that reports `underflow_quality` when the p-value is not representable.
    #[must_use]
    pub fn new(underflow_quality: u32) -> Self {
        Self {
            sums: f64x4::splat(0.0),
            compensations: f64x4::splat(0.0),
            counts: [0; 4],
            chi2_table: (0..=TABLE_MAX_QUALITY).map(chi2).collect(),
            inv_chi2_table: (0..=TABLE_MAX_QUALITY).map(inv_chi2).collect(),
            underflow_quality,
        }
    }

    /// Clears all evidence before the next position.
    pub fn reset(&mut self) {
        self.sums = f64x4::splat(0.0);
        self.compensations = f64x4::splat(0.0);
        self.counts = [0; 4];
    }

    /// Adds one observation. Bases other than A, C, G and T are ignored.
    pub fn add(&mut self, base: u8, quality: u32) {
        let idx = BASE_TO_INDEX[base as usize];
        if idx == 255 {
            return;
        }
        let idx = idx as usize;

        let (support, against) = if quality <= TABLE_MAX_QUALITY {
            (self.chi2_table[quality as usize], self.inv_chi2_table[quality as usize])
        } else {
            (chi2(quality), inv_chi2(quality))
        };
        let mut values = [against; 4];
        values[idx] = support;

        let y = f64x4::from(values) - self.compensations;
        let t = self.sums + y;
        self.compensations = (t - self.sums) - y;
        self.sums = t;

        self.counts[idx] += 1;
    }

    /// Number of A/C/G/T observations added since the last reset.
    #[must_use]
    pub fn contributions(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Calls the consensus base, quality and agreement for the current position.
    #[must_use]
    pub fn call(&self) -> BaseCall {
        let sums = self.sums.to_array();
        let mut best = 0;
        for idx in 1..4 {
            if sums[idx] > sums[best] {
                best = idx;
            }
        }

        let agreement = self.counts[best];
        let quality = if agreement == 0 {
            0
        } else {
            fisher_pvalue(agreement, sums[best])
                .map_or(self.underflow_quality, |p| pvalue_to_phred(p, self.underflow_quality))
        };
        BaseCall { base: DNA_BASES[best], quality, agreement }
    }
}
