//! The dual-trigger ingest pipeline.
//!
//! Two buffering stages sit between the hit-recording boundary and the
//! report engine, each flushing on a count threshold or a delay since its
//! first unflushed item, whichever comes first:
//!
//! ```text
//! log(hit) ──> HitBuffer ──bulk write──> HitStore
//!                  │
//!                  └──min, max logged──> WindowScheduler ──spawn──> ReportEngine
//! ```
//!
//! The split keeps storage-write frequency and report-generation frequency
//! independent: one generation window aggregates several storage flushes.

mod batcher;
mod buffer;
mod scheduler;

pub use batcher::{Batcher, FlushHandler};
pub use buffer::HitBuffer;
pub use scheduler::WindowScheduler;

/// Smallest and largest value of `items`, or `None` when empty.
pub(crate) fn min_max<T: Copy + Ord>(items: impl IntoIterator<Item = T>) -> Option<(T, T)> {
    items.into_iter().fold(None, |bounds, item| match bounds {
        None => Some((item, item)),
        Some((lo, hi)) => Some((lo.min(item), hi.max(item))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_of_empty_is_none() {
        assert_eq!(min_max(Vec::<u32>::new()), None);
    }

    #[test]
    fn min_max_is_order_independent() {
        assert_eq!(min_max([3u32, 9, 1, 4]), Some((1, 9)));
        assert_eq!(min_max([1u32, 3, 4, 9]), Some((1, 9)));
        assert_eq!(min_max([9u32, 4, 3, 1]), Some((1, 9)));
    }

    #[test]
    fn min_max_of_single_item_is_that_item() {
        assert_eq!(min_max([5u32]), Some((5, 5)));
    }
}
