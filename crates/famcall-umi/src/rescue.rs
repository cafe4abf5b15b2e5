//! # Barcode Rescue
//!
//! Barcodes observed at least `min_family_size` times in the index-read histogram are taken
//! as true families. Every true barcode is expanded into all variants within
//! `max_mismatches` substitutions, and each variant is registered in a lookup pointing back at
//! its true barcode, so assigning a read is a single hash lookup.
//!
//! A variant reachable from several true barcodes goes to the closest one. When two true
//! barcodes are equally close the variant is ambiguous and is left out of the lookup. True
//! barcodes always map to themselves.

use ahash::AHashMap;
use log::debug;
use thiserror::Error;

use crate::histogram::BarcodeHistogram;

/// Default minimum count for a barcode to be a true family
pub const DEFAULT_MIN_FAMILY_SIZE: u64 = 10;

/// Default Hamming radius of the rescue neighborhood
pub const DEFAULT_MAX_MISMATCHES: usize = 1;

/// Largest supported Hamming radius; the neighborhood grows as `(3L)^k`
pub const MAX_SUPPORTED_MISMATCHES: usize = 3;

const SUBSTITUTIONS: [u8; 4] = [b'A', b'C', b'G', b'T'];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RescueError {
    #[error("max mismatches {requested} exceeds the supported limit of {limit}")]
    TooManyMismatches { requested: usize, limit: usize },
}

/// Tunables for [`RescueIndex::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescueOptions {
    pub min_family_size: u64,
    pub max_mismatches: usize,
}

impl Default for RescueOptions {
    fn default() -> Self {
        Self { min_family_size: DEFAULT_MIN_FAMILY_SIZE, max_mismatches: DEFAULT_MAX_MISMATCHES }
    }
}

/// How a raw barcode relates to the true families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeAssignment<'a> {
    /// The barcode is itself a true family
    True,
    /// The barcode is a near miss of the true family `canonical`
    Rescued { canonical: &'a str },
    /// Neither a true family nor an unambiguous near miss
    Unassigned,
}

#[derive(Debug, Clone)]
struct Candidate {
    canonical: usize,
    distance: usize,
    ambiguous: bool,
}

/// Precomputed lookup from every registered barcode variant to its true family.
#[derive(Debug, Clone)]
pub struct RescueIndex {
    true_barcodes: Vec<String>,
    lookup: AHashMap<String, usize>,
    ambiguous: usize,
}

impl RescueIndex {
    /// Builds the lookup from a histogram.
    ///
    /// # Errors
    ///
    /// Returns [`RescueError::TooManyMismatches`] when `max_mismatches` exceeds
    /// [`MAX_SUPPORTED_MISMATCHES`].
    pub fn build(histogram: &BarcodeHistogram, options: RescueOptions) -> Result<Self, RescueError> {
        if options.max_mismatches > MAX_SUPPORTED_MISMATCHES {
            return Err(RescueError::TooManyMismatches {
                requested: options.max_mismatches,
                limit: MAX_SUPPORTED_MISMATCHES,
            });
        }

        let true_barcodes: Vec<String> = histogram
            .barcodes_at_least(options.min_family_size)
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut candidates: AHashMap<Vec<u8>, Candidate> = AHashMap::new();
        for (index, barcode) in true_barcodes.iter().enumerate() {
            candidates.insert(
                barcode.as_bytes().to_vec(),
                Candidate { canonical: index, distance: 0, ambiguous: false },
            );
        }
        for (index, barcode) in true_barcodes.iter().enumerate() {
            let mut current = barcode.as_bytes().to_vec();
            expand(&mut current, 0, 1, options.max_mismatches, &mut |variant, distance| {
                register(&mut candidates, variant, index, distance);
            });
        }

        let mut ambiguous = 0;
        let mut lookup = AHashMap::with_capacity(candidates.len());
        for (variant, candidate) in candidates {
            if candidate.ambiguous {
                ambiguous += 1;
                continue;
            }
            // Variants are built from ASCII barcodes by ASCII substitutions.
            if let Ok(variant) = String::from_utf8(variant) {
                lookup.insert(variant, candidate.canonical);
            }
        }
        debug!(
            "Rescue index: {} true barcodes, {} registered variants, {} ambiguous",
            true_barcodes.len(),
            lookup.len(),
            ambiguous
        );
        Ok(Self { true_barcodes, lookup, ambiguous })
    }

    /// Classifies a raw barcode.
    #[must_use]
    pub fn assign(&self, barcode: &str) -> BarcodeAssignment<'_> {
        match self.lookup.get(barcode) {
            None => BarcodeAssignment::Unassigned,
            Some(&index) => {
                let canonical = self.true_barcodes[index].as_str();
                if canonical == barcode {
                    BarcodeAssignment::True
                } else {
                    BarcodeAssignment::Rescued { canonical }
                }
            }
        }
    }

    /// True barcodes, sorted.
    #[must_use]
    pub fn true_barcodes(&self) -> &[String] {
        &self.true_barcodes
    }

    /// Number of barcodes (true ones included) that resolve to a true family.
    #[must_use]
    pub fn registered_variants(&self) -> usize {
        self.lookup.len()
    }

    /// Number of variants dropped because two true barcodes were equally close.
    #[must_use]
    pub fn ambiguous_variants(&self) -> usize {
        self.ambiguous
    }
}

/// Calls `visit` with every variant of `current` differing at `distance..=max` positions at or
/// after `start`.
fn expand(
    current: &mut [u8],
    start: usize,
    distance: usize,
    max: usize,
    visit: &mut dyn FnMut(&[u8], usize),
) {
    if distance > max {
        return;
    }
    for pos in start..current.len() {
        let original = current[pos];
        for &base in &SUBSTITUTIONS {
            if base == original {
                continue;
            }
            current[pos] = base;
            visit(current, distance);
            expand(current, pos + 1, distance + 1, max, visit);
        }
        current[pos] = original;
    }
}

fn register(
    candidates: &mut AHashMap<Vec<u8>, Candidate>,
    variant: &[u8],
    canonical: usize,
    distance: usize,
) {
    match candidates.get_mut(variant) {
        None => {
            candidates
                .insert(variant.to_vec(), Candidate { canonical, distance, ambiguous: false });
        }
        Some(existing) if distance < existing.distance => {
            *existing = Candidate { canonical, distance, ambiguous: false };
        }
        Some(existing) if distance == existing.distance && canonical != existing.canonical => {
            existing.ambiguous = true;
        }
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::count_mismatches;
    use rstest::rstest;

    fn histogram(entries: &[(&str, u64)]) -> BarcodeHistogram {
        let mut histogram = BarcodeHistogram::new();
        for &(barcode, count) in entries {
            histogram.add_count(barcode, count);
        }
        histogram
    }

    #[test]
    fn test_rescue_one_mismatch() {
        let index = RescueIndex::build(
            &histogram(&[("AAAAA", 15), ("AAAAT", 2), ("CCCCC", 3)]),
            RescueOptions::default(),
        )
        .unwrap();
        assert_eq!(index.true_barcodes(), ["AAAAA".to_string()]);
        assert_eq!(index.assign("AAAAA"), BarcodeAssignment::True);
        assert_eq!(index.assign("AAAAT"), BarcodeAssignment::Rescued { canonical: "AAAAA" });
        assert_eq!(index.assign("CCCCC"), BarcodeAssignment::Unassigned);
        assert_eq!(index.assign("AAATT"), BarcodeAssignment::Unassigned);
        // Self plus 5 positions x 3 substitutions
        assert_eq!(index.registered_variants(), 16);
    }

    #[test]
    fn test_neighborhood_size_two_mismatches() {
        let options = RescueOptions { min_family_size: 1, max_mismatches: 2 };
        let index = RescueIndex::build(&histogram(&[("ACGT", 1)]), options).unwrap();
        // 1 + 4*3 + 6*9
        assert_eq!(index.registered_variants(), 67);
        assert_eq!(index.assign("TTGT"), BarcodeAssignment::Rescued { canonical: "ACGT" });
    }

    #[test]
    fn test_equally_close_variants_are_dropped() {
        let index =
            RescueIndex::build(&histogram(&[("AAAAA", 20), ("AAATT", 20)]), RescueOptions::default())
                .unwrap();
        // AAAAT is one mismatch from both
        assert_eq!(index.assign("AAAAT"), BarcodeAssignment::Unassigned);
        assert_eq!(index.assign("AAATA"), BarcodeAssignment::Unassigned);
        assert_eq!(index.ambiguous_variants(), 2);
        assert_eq!(index.assign("CAAAA"), BarcodeAssignment::Rescued { canonical: "AAAAA" });
    }

    #[test]
    fn test_closest_true_barcode_wins() {
        let options = RescueOptions { min_family_size: 10, max_mismatches: 2 };
        let index =
            RescueIndex::build(&histogram(&[("AAAAA", 20), ("AAATT", 20)]), options).unwrap();
        // True barcodes map to themselves even though each is within two of the other.
        assert_eq!(index.assign("AAATT"), BarcodeAssignment::True);
        // One from AAAAA, three from AAATT
        assert_eq!(index.assign("CAAAA"), BarcodeAssignment::Rescued { canonical: "AAAAA" });
    }

    #[test]
    fn test_rescued_barcodes_are_within_radius() {
        let options = RescueOptions { min_family_size: 5, max_mismatches: 2 };
        let index =
            RescueIndex::build(&histogram(&[("ACGTAC", 9), ("TTTTTT", 7)]), options).unwrap();
        for candidate in ["ACGTAA", "ACCTAA", "TTTTGG", "ACGTTT"] {
            if let BarcodeAssignment::Rescued { canonical } = index.assign(candidate) {
                assert!(count_mismatches(candidate, canonical) <= 2);
            }
        }
    }

    #[test]
    fn test_no_call_barcodes_are_never_true() {
        let index = RescueIndex::build(&histogram(&[("AANAA", 100)]), RescueOptions::default())
            .unwrap();
        assert!(index.true_barcodes().is_empty());
        assert_eq!(index.assign("AANAA"), BarcodeAssignment::Unassigned);
    }

    #[rstest]
    #[case(3, true)]
    #[case(4, false)]
    fn test_mismatch_limit(#[case] max_mismatches: usize, #[case] ok: bool) {
        let options = RescueOptions { min_family_size: 1, max_mismatches };
        assert_eq!(RescueIndex::build(&histogram(&[("ACGT", 1)]), options).is_ok(), ok);
    }
}
