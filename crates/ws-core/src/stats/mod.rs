//! Stats Module - diagnostics and counters (C12)
//!
//! Each C6 free list, the C7 queue, and the C9 index already expose a cheap
//! `stats()` snapshot; this module is where a [`crate::runtime::Runtime`]
//! aggregates the ones it owns into a single [`RuntimeStats`] structure on
//! demand. This is pure bookkeeping: nothing here affects correctness, and
//! querying it is just a handful of atomic loads.
//!
//! [`Histogram`] is kept from the source project's pause-time histogram
//! largely unchanged - it is already a generic fixed-bucket latency
//! recorder, and is repurposed here for queue wait times and pool-refill
//! latencies per the Design Notes, rather than GC pause times.

pub mod histogram;
pub mod metrics;
pub mod timer;

pub use histogram::Histogram;
pub use metrics::{MetricValue, MetricsRegistry};
pub use timer::{ScopedTimer, Timer};

use crate::freelist::FreeListStats;
use crate::tuple::TupleStoreStats;
use ws_label::LabelTableStats;

/// A point-in-time aggregate snapshot of everything a [`crate::runtime::Runtime`]
/// owns directly. Cheap to construct: every field is a handful of atomic
/// loads on the underlying primitive, never a lock held across the whole
/// snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeStats {
    pub labels: LabelTableStats,
    pub datatypes_registered: usize,
    pub tuples: TupleStoreStats,
}

impl RuntimeStats {
    /// Total slots currently resident across the three tuple bucket pools.
    pub fn tuple_pool_size(&self) -> usize {
        self.tuples.small.size + self.tuples.medium.size + self.tuples.large.size
    }

    /// Lifetime high-water mark of tuple bucket constructions, summed
    /// across all three buckets.
    pub fn tuple_pool_allocated(&self) -> usize {
        self.tuples.small.allocated + self.tuples.medium.allocated + self.tuples.large.allocated
    }
}

/// Free-list occupancy re-exported at module scope for convenience callers
/// that want to report on a pool they own outside the runtime (e.g. a
/// datatype's own normal/pointer free lists).
pub type PoolStats = FreeListStats;
