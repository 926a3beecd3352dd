//! Streaming k-way merge of pre-sorted sources.
//!
//! Each source must already be sorted; the merge never re-sorts within a
//! source. At most one pending item per source is held in memory.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Merge multiple sorted, fallible iterators into one sorted stream.
///
/// Uses a min-heap for O(n log k) complexity where n is the total number of
/// items and k the number of sources. Equal items are yielded in source order.
/// The first error from any source is yielded on the next call after it is
/// read, even if smaller items are still pending, and then the merge stops.
///
/// # Examples
/// ```
/// use pathstore::KWayMerge;
///
/// let a = vec![Ok::<_, ()>(1), Ok(4), Ok(7)];
/// let b = vec![Ok(2), Ok(3), Ok(9)];
/// let merged: Result<Vec<i32>, ()> = KWayMerge::new(vec![a.into_iter(), b.into_iter()]).collect();
/// assert_eq!(merged.unwrap(), vec![1, 2, 3, 4, 7, 9]);
/// ```
pub struct KWayMerge<T, E, I>
where
    T: Ord,
    I: Iterator<Item = Result<T, E>>,
{
    sources: Vec<I>,
    // Min-heap: (item, source_idx)
    heap: BinaryHeap<Reverse<(T, usize)>>,
    pending_error: Option<E>,
    primed: bool,
    finished: bool,
}

impl<T, E, I> KWayMerge<T, E, I>
where
    T: Ord,
    I: Iterator<Item = Result<T, E>>,
{
    pub fn new(sources: Vec<I>) -> Self {
        let capacity = sources.len();
        Self {
            sources,
            heap: BinaryHeap::with_capacity(capacity),
            pending_error: None,
            primed: false,
            finished: false,
        }
    }

    /// Pull the next item from one source into the heap.
    fn advance(&mut self, source_idx: usize) {
        match self.sources[source_idx].next() {
            Some(Ok(item)) => self.heap.push(Reverse((item, source_idx))),
            Some(Err(e)) => {
                if self.pending_error.is_none() {
                    self.pending_error = Some(e);
                }
            }
            None => {}
        }
    }

    fn prime(&mut self) {
        for idx in 0..self.sources.len() {
            self.advance(idx);
            if self.pending_error.is_some() {
                break;
            }
        }
        self.primed = true;
    }
}

impl<T, E, I> Iterator for KWayMerge<T, E, I>
where
    T: Ord,
    I: Iterator<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.primed {
            self.prime();
        }
        if let Some(e) = self.pending_error.take() {
            self.finished = true;
            return Some(Err(e));
        }

        let Reverse((item, source_idx)) = match self.heap.pop() {
            Some(entry) => entry,
            None => {
                self.finished = true;
                return None;
            }
        };
        self.advance(source_idx);
        Some(Ok(item))
    }
}
