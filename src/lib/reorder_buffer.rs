//! Restores sequence order to results that complete out of order.

use std::collections::VecDeque;

/// Holds items keyed by a sequence number and releases them strictly in sequence.
///
/// Slot `i` of the buffer holds sequence number `next_seq + i`, so inserting and releasing are
/// both O(1) amortized.
///
/// # Example
///
/// ```
/// use famcall_lib::reorder_buffer::ReorderBuffer;
///
/// let mut buffer = ReorderBuffer::new();
/// buffer.insert(1, "b");
/// assert!(buffer.pop_ready().is_none());
/// buffer.insert(0, "a");
/// buffer.insert(3, "d");
/// let ready: Vec<_> = std::iter::from_fn(|| buffer.pop_ready()).collect();
/// assert_eq!(ready, vec!["a", "b"]);
/// assert_eq!(buffer.next_seq(), 2);
/// ```
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    slots: VecDeque<Option<T>>,
    next_seq: u64,
    held: usize,
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReorderBuffer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { slots: VecDeque::new(), next_seq: 0, held: 0 }
    }

    /// Stores `item` under `seq`.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `seq` was already released or is already held.
    pub fn insert(&mut self, seq: u64, item: T) {
        debug_assert!(seq >= self.next_seq, "sequence {seq} was already released");
        let index = (seq - self.next_seq) as usize;
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }
        debug_assert!(self.slots[index].is_none(), "duplicate sequence {seq}");
        self.slots[index] = Some(item);
        self.held += 1;
    }

    /// Releases the item with the next sequence number, if it has arrived.
    pub fn pop_ready(&mut self) -> Option<T> {
        let item = self.slots.front_mut()?.take()?;
        self.slots.pop_front();
        self.next_seq += 1;
        self.held -= 1;
        Some(item)
    }

    /// Sequence number of the next item to release.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Number of items waiting for an earlier sequence number.
    #[must_use]
    pub fn len(&self) -> usize {
        self.held
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.held == 0
    }
}
