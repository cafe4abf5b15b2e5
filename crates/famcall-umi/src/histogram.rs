//! Barcode occurrence counts.

use ahash::AHashMap;

/// Number of times each barcode was observed.
#[derive(Debug, Clone, Default)]
pub struct BarcodeHistogram {
    counts: AHashMap<String, u64>,
    total: u64,
}

impl BarcodeHistogram {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation of `barcode`.
    pub fn add(&mut self, barcode: &str) {
        self.add_count(barcode, 1);
    }

    /// Records `count` observations of `barcode`.
    pub fn add_count(&mut self, barcode: &str, count: u64) {
        if let Some(existing) = self.counts.get_mut(barcode) {
            *existing += count;
        } else {
            self.counts.insert(barcode.to_string(), count);
        }
        self.total += count;
    }

    /// Observations of `barcode`, zero if never seen.
    #[must_use]
    pub fn count(&self, barcode: &str) -> u64 {
        self.counts.get(barcode).copied().unwrap_or(0)
    }

    /// Number of distinct barcodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total observations across all barcodes.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(barcode, &count)| (barcode.as_str(), count))
    }

    /// Barcodes observed at least `min_count` times that consist only of `A`, `C`, `G` and
    /// `T`, sorted.
    #[must_use]
    pub fn barcodes_at_least(&self, min_count: u64) -> Vec<&str> {
        let mut barcodes: Vec<&str> = self
            .iter()
            .filter(|&(barcode, count)| count >= min_count && is_acgt(barcode))
            .map(|(barcode, _)| barcode)
            .collect();
        barcodes.sort_unstable();
        barcodes
    }
}

impl<S: AsRef<str>> FromIterator<S> for BarcodeHistogram {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut histogram = Self::new();
        for barcode in iter {
            histogram.add(barcode.as_ref());
        }
        histogram
    }
}

fn is_acgt(barcode: &str) -> bool {
    !barcode.is_empty() && barcode.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'))
}
