//! Hamming distance between barcodes.

/// Counts the positions at which two barcodes differ.
///
/// Barcodes of different lengths are never comparable and return `usize::MAX`.
///
/// # Examples
///
/// ```
/// use famcall_umi::count_mismatches;
///
/// assert_eq!(count_mismatches("AAAAA", "AAAAT"), 1);
/// assert_eq!(count_mismatches("AAAAA", "AAAA"), usize::MAX);
/// ```
#[must_use]
pub fn count_mismatches(a: &str, b: &str) -> usize {
    if a.len() != b.len() {
        return usize::MAX;
    }
    a.bytes().zip(b.bytes()).filter(|(x, y)| x != y).count()
}

/// True when the barcodes have equal length and differ at no more than `max_mismatches`
/// positions. Stops as soon as the limit is exceeded.
#[must_use]
pub fn matches_within(a: &str, b: &str, max_mismatches: usize) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut mismatches = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        if x != y {
            mismatches += 1;
            if mismatches > max_mismatches {
                return false;
            }
        }
    }
    true
}
