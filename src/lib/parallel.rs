//! Ordered fan-out of independent batches over a fixed worker pool.
//!
//! Work on one barcode family or one template never depends on another, so batches are handed
//! to workers as they are read and the results are put back into input order before they reach
//! the sink. The input iterator and the sink stay on the calling thread.

use std::thread;

use anyhow::{Result, anyhow};
use crossbeam_channel::unbounded;

use crate::reorder_buffer::ReorderBuffer;

/// Default number of groups per batch handed to a worker
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Batches in flight per worker before the reader waits for results
const IN_FLIGHT_PER_WORKER: usize = 4;

/// Runs `work` over every batch and feeds the results to `sink` in input order.
///
/// With `threads <= 1` every batch is processed inline. Otherwise `threads` scoped workers take
/// batches from a shared channel. The first error, from the input, a worker or the sink, stops
/// reading and is returned once the workers have drained. Returns the number of batches sunk.
///
/// # Example
///
/// ```
/// use famcall_lib::parallel::process_ordered;
///
/// let batches = (0..20u64).map(Ok);
/// let mut out = Vec::new();
/// process_ordered(batches, 4, |x| Ok(x * x), |y| {
///     out.push(y);
///     Ok(())
/// })
/// .unwrap();
/// assert_eq!(out, (0..20u64).map(|x| x * x).collect::<Vec<_>>());
/// ```
pub fn process_ordered<I, T, U, W, S>(
    batches: I,
    threads: usize,
    work: W,
    mut sink: S,
) -> Result<u64>
where
    I: IntoIterator<Item = Result<T>>,
    T: Send,
    U: Send,
    W: Fn(T) -> Result<U> + Sync,
    S: FnMut(U) -> Result<()>,
{
    if threads <= 1 {
        let mut sunk = 0;
        for batch in batches {
            sink(work(batch?)?)?;
            sunk += 1;
        }
        return Ok(sunk);
    }

    let max_in_flight = (threads * IN_FLIGHT_PER_WORKER) as u64;
    let work = &work;
    thread::scope(|scope| {
        let (batch_tx, batch_rx) = unbounded::<(u64, T)>();
        let (result_tx, result_rx) = unbounded::<(u64, Result<U>)>();
        for _ in 0..threads {
            let batch_rx = batch_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for (seq, batch) in batch_rx {
                    if result_tx.send((seq, work(batch))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(batch_rx);
        drop(result_tx);

        let mut reorder = ReorderBuffer::new();
        let mut sent: u64 = 0;
        let mut sunk: u64 = 0;
        let mut receive_one = |reorder: &mut ReorderBuffer<Result<U>>,
                               sunk: &mut u64|
         -> Result<()> {
            let (seq, result) =
                result_rx.recv().map_err(|_| anyhow!("Worker pool stopped unexpectedly"))?;
            reorder.insert(seq, result);
            while let Some(result) = reorder.pop_ready() {
                sink(result?)?;
                *sunk += 1;
            }
            Ok(())
        };

        for batch in batches {
            let batch = batch?;
            while sent - sunk >= max_in_flight {
                receive_one(&mut reorder, &mut sunk)?;
            }
            batch_tx
                .send((sent, batch))
                .map_err(|_| anyhow!("Worker pool stopped unexpectedly"))?;
            sent += 1;
        }
        drop(batch_tx);

        while sunk < sent {
            receive_one(&mut reorder, &mut sunk)?;
        }
        Ok(sunk)
    })
}

/// Collects items of a fallible stream into vectors of at most `size` items.
pub struct Batched<I> {
    inner: I,
    size: usize,
    done: bool,
}

impl<I> Batched<I> {
    /// `size` is clamped to at least one.
    pub fn new(inner: I, size: usize) -> Self {
        Self { inner, size: size.max(1), done: false }
    }
}

impl<I, T> Iterator for Batched<I>
where
    I: Iterator<Item = Result<T>>,
{
    type Item = Result<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            match self.inner.next() {
                Some(Ok(item)) => batch.push(item),
                // Items already collected are dropped with the error; the run is aborted anyway.
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        if batch.is_empty() { None } else { Some(Ok(batch)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(8)]
    fn test_results_keep_input_order(#[case] threads: usize) {
        let batches = (0..200u64).map(Ok);
        let mut out = Vec::new();
        let sunk = process_ordered(
            batches,
            threads,
            |x| {
                // Later batches finish first
                if x % 7 == 0 {
                    thread::sleep(Duration::from_millis(2));
                }
                Ok(x + 1)
            },
            |y| {
                out.push(y);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(sunk, 200);
        assert_eq!(out, (1..=200).collect::<Vec<u64>>());
    }

    #[rstest]
    #[case(1)]
    #[case(4)]
    fn test_worker_error_is_returned(#[case] threads: usize) {
        let batches = (0..50u64).map(Ok);
        let mut out = Vec::new();
        let err = process_ordered(
            batches,
            threads,
            |x| if x == 10 { Err(anyhow!("family 10 is malformed")) } else { Ok(x) },
            |y| {
                out.push(y);
                Ok(())
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("family 10"));
        assert_eq!(out, (0..10).collect::<Vec<u64>>());
    }

    #[test]
    fn test_input_error_is_returned() {
        let batches = vec![Ok(1u64), Err(anyhow!("bad input")), Ok(3)];
        let err = process_ordered(batches, 3, Ok, |_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("bad input"));
    }

    #[test]
    fn test_sink_error_is_returned() {
        let sink = |x: u64| if x == 5 { Err(anyhow!("disk full")) } else { Ok(()) };
        let err = process_ordered((0..100u64).map(Ok), 2, Ok, sink).unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_batched() {
        let batches: Vec<_> =
            Batched::new((0..7).map(Ok), 3).collect::<Result<Vec<Vec<i32>>>>().unwrap();
        assert_eq!(batches, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
        assert!(Batched::new(std::iter::empty::<Result<i32>>(), 3).next().is_none());
    }

    #[test]
    fn test_batched_error() {
        let items = vec![Ok(1), Err(anyhow!("broken")), Ok(3)];
        let mut batched = Batched::new(items.into_iter(), 10);
        assert!(batched.next().unwrap().is_err());
        assert!(batched.next().is_none());
    }
}
