//! Parallel per-position arrays produced while calling a consensus.

/// Consensus bases with their recalibrated qualities and agreement counts.
///
/// All three vectors always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsensusSequence {
    bases: Vec<u8>,
    quals: Vec<u32>,
    agreements: Vec<u32>,
}

impl ConsensusSequence {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bases: Vec::with_capacity(capacity),
            quals: Vec::with_capacity(capacity),
            agreements: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn push(&mut self, base: u8, qual: u32, agreement: u32) {
        self.bases.push(base);
        self.quals.push(qual);
        self.agreements.push(agreement);
    }

    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    #[must_use]
    pub fn quals(&self) -> &[u32] {
        &self.quals
    }

    #[must_use]
    pub fn agreements(&self) -> &[u32] {
        &self.agreements
    }

    /// Sets every quality to zero, leaving bases and agreements untouched.
    pub fn mask_qualities(&mut self) {
        self.quals.fill(0);
    }

    /// Number of observations that did not agree with the call: `family_size * len - sum(FA)`.
    #[must_use]
    pub fn disagreements(&self, family_size: usize) -> u64 {
        let total = (family_size as u64) * (self.len() as u64);
        let agreeing: u64 = self.agreements.iter().map(|&a| u64::from(a)).sum();
        total.saturating_sub(agreeing)
    }

    /// Lowest agreement count across positions, or 0 when empty.
    #[must_use]
    pub fn min_agreement(&self) -> u32 {
        self.agreements.iter().copied().min().unwrap_or(0)
    }

    /// Highest agreement count across positions, or 0 when empty.
    #[must_use]
    pub fn max_agreement(&self) -> u32 {
        self.agreements.iter().copied().max().unwrap_or(0)
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, Vec<u32>, Vec<u32>) {
        (self.bases, self.quals, self.agreements)
    }
}
