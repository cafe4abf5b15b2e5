//! Grouping of consecutive records that share a key.
//!
//! Inputs are expected to be sorted (or at least grouped) by the key already: barcode families
//! by barcode, templates by read name. Sortedness is not checked. A key that reappears after a
//! different key starts a new group, so unsorted input yields fragmented groups.

use anyhow::{Result, anyhow};
use famcall_consensus::ReadRecord;
use noodles::sam::alignment::record_buf::RecordBuf;

/// Yields maximal runs of consecutive items with equal keys as `(key, items)`.
///
/// An error from the underlying stream, or from the key function, is returned after the group
/// that was being collected when it occurred, and ends iteration.
///
/// # Example
///
/// ```
/// use famcall_lib::grouper::KeyedGroupIterator;
///
/// let words = ["apple", "avocado", "banana", "apricot"].into_iter().map(Ok);
/// let groups: Vec<_> = KeyedGroupIterator::new(words, |w: &&str| Ok(w.as_bytes()[0]))
///     .collect::<anyhow::Result<_>>()
///     .unwrap();
/// assert_eq!(groups.len(), 3);
/// assert_eq!(groups[0], (b'a', vec!["apple", "avocado"]));
/// ```
pub struct KeyedGroupIterator<I, T, K, F>
where
    I: Iterator<Item = Result<T>>,
    F: FnMut(&T) -> Result<K>,
{
    items: I,
    key_fn: F,
    current_key: Option<K>,
    current_group: Vec<T>,
    pending_error: Option<anyhow::Error>,
    done: bool,
}

impl<I, T, K, F> KeyedGroupIterator<I, T, K, F>
where
    I: Iterator<Item = Result<T>>,
    K: PartialEq,
    F: FnMut(&T) -> Result<K>,
{
    pub fn new(items: I, key_fn: F) -> Self {
        Self {
            items,
            key_fn,
            current_key: None,
            current_group: Vec::new(),
            pending_error: None,
            done: false,
        }
    }

    /// Hands back the group being collected, if any, and remembers `error` for the next call.
    fn fail(&mut self, error: anyhow::Error) -> Option<Result<(K, Vec<T>)>> {
        match self.take_group() {
            Some(group) => {
                self.pending_error = Some(error);
                Some(Ok(group))
            }
            None => {
                self.done = true;
                Some(Err(error))
            }
        }
    }

    fn take_group(&mut self) -> Option<(K, Vec<T>)> {
        let key = self.current_key.take()?;
        Some((key, std::mem::take(&mut self.current_group)))
    }
}

impl<I, T, K, F> Iterator for KeyedGroupIterator<I, T, K, F>
where
    I: Iterator<Item = Result<T>>,
    K: PartialEq,
    F: FnMut(&T) -> Result<K>,
{
    type Item = Result<(K, Vec<T>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(error) = self.pending_error.take() {
            self.done = true;
            return Some(Err(error));
        }

        loop {
            let item = match self.items.next() {
                None => {
                    self.done = true;
                    return self.take_group().map(Ok);
                }
                Some(Err(error)) => return self.fail(error),
                Some(Ok(item)) => item,
            };
            let key = match (self.key_fn)(&item) {
                Ok(key) => key,
                Err(error) => return self.fail(error),
            };

            if self.current_key.as_ref() == Some(&key) {
                self.current_group.push(item);
                continue;
            }
            let finished = self.take_group();
            self.current_key = Some(key);
            self.current_group.push(item);
            if finished.is_some() {
                return finished.map(Ok);
            }
        }
    }
}

/// The barcode a read is grouped under: its `BS` tag.
///
/// # Errors
///
/// Fails naming the read when it carries no barcode.
pub fn read_barcode(read: &ReadRecord) -> Result<String> {
    read.barcode()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Read '{}' has no BS barcode tag", read.name))
}

/// Groups consecutive reads into barcode families.
pub type BarcodeFamilyIterator<I> =
    KeyedGroupIterator<I, ReadRecord, String, fn(&ReadRecord) -> Result<String>>;

/// Creates a [`BarcodeFamilyIterator`] over barcode-sorted reads.
pub fn barcode_families<I>(reads: I) -> BarcodeFamilyIterator<I>
where
    I: Iterator<Item = Result<ReadRecord>>,
{
    KeyedGroupIterator::new(reads, read_barcode as fn(&ReadRecord) -> Result<String>)
}

/// The name a SAM record is grouped under.
pub fn record_name(record: &RecordBuf) -> Result<Vec<u8>> {
    record
        .name()
        .map(|name| name.to_vec())
        .ok_or_else(|| anyhow!("Cannot group a SAM record without a read name"))
}

/// Groups consecutive SAM records sharing a read name into templates.
pub type TemplateIterator<I> =
    KeyedGroupIterator<I, RecordBuf, Vec<u8>, fn(&RecordBuf) -> Result<Vec<u8>>>;

/// Creates a [`TemplateIterator`] over name-grouped records.
pub fn templates<I>(records: I) -> TemplateIterator<I>
where
    I: Iterator<Item = Result<RecordBuf>>,
{
    KeyedGroupIterator::new(records, record_name as fn(&RecordBuf) -> Result<Vec<u8>>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use famcall_consensus::FamilyTags;

    fn read(name: &str, barcode: Option<&str>) -> ReadRecord {
        let mut read = ReadRecord::new(name, b"ACGT", &[30; 4]);
        read.tags = FamilyTags { bs: barcode.map(str::to_string), ..FamilyTags::default() };
        read
    }

    fn names(group: &[ReadRecord]) -> Vec<&str> {
        group.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_barcode_families_are_contiguous_runs() {
        let reads = vec![
            read("a1", Some("AAAA")),
            read("a2", Some("AAAA")),
            read("c1", Some("CCCC")),
            read("a3", Some("AAAA")),
        ];
        let families: Vec<_> =
            barcode_families(reads.into_iter().map(Ok)).collect::<Result<_>>().unwrap();
        assert_eq!(families.len(), 3);
        assert_eq!(families[0].0, "AAAA");
        assert_eq!(names(&families[0].1), ["a1", "a2"]);
        assert_eq!(names(&families[1].1), ["c1"]);
        // Unsorted input fragments the AAAA family
        assert_eq!(names(&families[2].1), ["a3"]);
    }

    #[test]
    fn test_empty_input() {
        let mut families = barcode_families(std::iter::empty());
        assert!(families.next().is_none());
    }

    #[test]
    fn test_stream_error_after_pending_group() {
        let items = vec![
            Ok(read("a1", Some("AAAA"))),
            Ok(read("a2", Some("AAAA"))),
            Err(anyhow!("truncated FASTQ")),
            Ok(read("c1", Some("CCCC"))),
        ];
        let mut families = barcode_families(items.into_iter());
        let (barcode, group) = families.next().unwrap().unwrap();
        assert_eq!(barcode, "AAAA");
        assert_eq!(group.len(), 2);
        let err = families.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("truncated"));
        assert!(families.next().is_none());
    }

    #[test]
    fn test_missing_barcode_is_an_error() {
        let items = vec![Ok(read("x1", None))];
        let err = barcode_families(items.into_iter()).next().unwrap().unwrap_err();
        assert!(err.to_string().contains("'x1'"));
    }

    #[test]
    fn test_templates_group_by_name() {
        let sam = "@HD\tVN:1.6\n\
            p1\t99\t*\t0\t0\t*\t*\t0\t0\tAC\tII\n\
            p1\t147\t*\t0\t0\t*\t*\t0\t0\tGT\tII\n\
            p2\t0\t*\t0\t0\t*\t*\t0\t0\tAC\tII\n";
        let mut reader = noodles::sam::io::Reader::new(sam.as_bytes());
        let header = reader.read_header().unwrap();
        let records = reader.record_bufs(&header).map(|r| r.map_err(anyhow::Error::from));
        let groups: Vec<_> = templates(records).collect::<Result<_>>().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, b"p1");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].1.len(), 1);
    }
}
