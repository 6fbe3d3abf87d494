//! Tuple Module - bucketed variable-length tuple payload (C4)
//!
//! A [`Tuple`] is a [`crate::record::Record`] whose payload is an ordered,
//! bounded list of child record handles rather than a byte buffer. Three
//! bucket sizes exist (small/medium/large); `TupleStore::allocate` always
//! starts a fresh tuple in the smallest bucket, and [`Tuple::promote`]
//! copies an outgrown tuple's member array into the next bucket up,
//! returning the smaller backing to its free list.

use std::sync::Arc;

use crate::datatype::{Datatype, DatatypeCallbacks};
use crate::error::{Result, WsError};
use crate::freelist::{FreeList, FreeListStats};
use crate::record::{MembersRecycleHook, Record};
use ws_label::Label;

/// Per-bucket occupancy snapshot, see [`TupleStore::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TupleStoreStats {
    pub small: FreeListStats,
    pub medium: FreeListStats,
    pub large: FreeListStats,
}

/// Build the hook that clears and returns a tuple's member-array buffer to
/// `list` once the record carrying it is destroyed.
fn recycle_hook(list: Arc<FreeList<Vec<Record>>>) -> MembersRecycleHook {
    Arc::new(move |mut members: Vec<Record>| {
        members.clear();
        list.release_value(members);
    })
}

/// Which bucket a tuple's member array is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Small,
    Medium,
    Large,
}

impl Bucket {
    fn next(self) -> Option<Bucket> {
        match self {
            Bucket::Small => Some(Bucket::Medium),
            Bucket::Medium => Some(Bucket::Large),
            Bucket::Large => None,
        }
    }
}

/// Owns the three bucketed free lists backing tuple allocation (C4), plus
/// the single "tuple" datatype every `Tuple` shares.
pub struct TupleStore {
    datatype: Arc<Datatype>,
    caps: [usize; 3],
    hard_ceiling: usize,
    small: Arc<FreeList<Vec<Record>>>,
    medium: Arc<FreeList<Vec<Record>>>,
    large: Arc<FreeList<Vec<Record>>>,
}

impl TupleStore {
    /// Construct a tuple store with the given bucket capacities
    /// (`[small, medium, large]`) and hard member-count ceiling, registering
    /// a "TUPLE" datatype in `registry` (sub-element descriptors and custom
    /// callbacks are not meaningful for the generic tuple shape, so it is
    /// registered with the default capability table).
    pub fn new(
        registry: &crate::datatype::DatatypeRegistry,
        caps: [usize; 3],
        hard_ceiling: usize,
    ) -> Result<Self> {
        if caps[0] >= caps[1] || caps[1] >= caps[2] || caps[2] > hard_ceiling {
            return Err(WsError::InvalidConfig {
                field: "tuple bucket sizes",
                value: format!("{caps:?}"),
                reason: "buckets must be strictly increasing and <= hard ceiling",
            });
        }
        let datatype = registry.register("TUPLE", 0, DatatypeCallbacks::default())?;
        Ok(Self {
            datatype,
            caps,
            hard_ceiling,
            small: Arc::new(FreeList::mutex_homed(0, move || Vec::with_capacity(caps[0]))),
            medium: Arc::new(FreeList::mutex_homed(0, move || Vec::with_capacity(caps[1]))),
            large: Arc::new(FreeList::mutex_homed(0, move || Vec::with_capacity(caps[2]))),
        })
    }

    pub fn hard_ceiling(&self) -> usize {
        self.hard_ceiling
    }

    /// Occupancy/allocation snapshot for each of the three bucket free
    /// lists, for [`crate::stats::RuntimeStats`].
    pub fn stats(&self) -> TupleStoreStats {
        TupleStoreStats {
            small: self.small.stats(),
            medium: self.medium.stats(),
            large: self.large.stats(),
        }
    }

    /// Allocate a fresh, empty tuple backed by the small bucket.
    pub fn allocate(&self) -> Result<Tuple> {
        let slot = self.small.alloc().ok_or_else(|| WsError::PoolExhausted {
            pool: "tuple/small".into(),
            cap: 0,
        })?;
        let mut members = slot.into_value();
        members.clear();
        let record = Record::new_members(self.datatype.clone(), members, self.datatype.label_cap());
        record.set_members_recycle_hook(recycle_hook(self.small.clone()));
        Ok(Tuple {
            record,
            bucket: Bucket::Small,
        })
    }

    fn cap_of(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Small => self.caps[0],
            Bucket::Medium => self.caps[1],
            Bucket::Large => self.caps[2],
        }
    }

    fn free_list(&self, bucket: Bucket) -> &Arc<FreeList<Vec<Record>>> {
        match bucket {
            Bucket::Small => &self.small,
            Bucket::Medium => &self.medium,
            Bucket::Large => &self.large,
        }
    }

    /// Promote a full tuple into the next bucket up: allocate a member
    /// array from the bigger bucket's free list, copy the old members
    /// across, and return the smaller backing to its own free list.
    /// Fails if the tuple is already in the large bucket.
    pub fn promote(&self, tuple: &mut Tuple) -> Result<()> {
        let next = tuple.bucket.next().ok_or_else(|| WsError::TupleFull {
            capacity: self.cap_of(tuple.bucket),
        })?;
        let slot = self
            .free_list(next)
            .alloc()
            .ok_or_else(|| WsError::PoolExhausted {
                pool: format!("tuple/{next:?}"),
                cap: 0,
            })?;
        let mut new_members = slot.into_value();
        new_members.clear();

        let mut old_members = tuple
            .record
            .with_members_mut(|m| std::mem::replace(m, Vec::new()))
            .expect("tuple record must carry a members payload");
        new_members.extend(old_members.drain(..));

        // `old_members` is now empty but still holds its original
        // allocation - return that backing (not a fresh `Vec::new()`) to
        // the smaller bucket's free list so the pool actually recycles it.
        self.free_list(tuple.bucket).release_value(old_members);
        tuple
            .record
            .with_members_mut(|m| *m = new_members)
            .expect("tuple record must carry a members payload");
        tuple
            .record
            .set_members_recycle_hook(recycle_hook(self.free_list(next).clone()));
        tuple.bucket = next;
        Ok(())
    }
}

/// A record whose payload is a bounded, ordered list of child records.
pub struct Tuple {
    record: Record,
    bucket: Bucket,
}

impl Tuple {
    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn len(&self) -> usize {
        self.record.with_members(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self, store: &TupleStore) -> usize {
        store.cap_of(self.bucket)
    }

    /// Append a child as the tuple's primary owner. Fails with
    /// [`WsError::TupleFull`] if the current bucket (already the large
    /// bucket) is full - the caller must `promote` first for smaller
    /// buckets, or copy into a fresh tuple once large is exhausted.
    pub fn add_member(&mut self, store: &TupleStore, label: Label, child: Record) -> Result<()> {
        self.ensure_capacity(store)?;
        child.add_container_label(label);
        self.record
            .with_members_mut(|m| m.push(child))
            .expect("tuple record must carry a members payload");
        Ok(())
    }

    /// Append a child by reference: the child gains this tuple as a
    /// dependency (its refcount is incremented) rather than being owned
    /// outright.
    pub fn add_member_pointer(
        &mut self,
        store: &TupleStore,
        label: Label,
        child: &Record,
    ) -> Result<()> {
        self.ensure_capacity(store)?;
        child.add_container_label(label);
        child.assign_dependency(self.record.add_ref());
        self.record
            .with_members_mut(|m| m.push(child.add_ref()))
            .expect("tuple record must carry a members payload");
        Ok(())
    }

    fn ensure_capacity(&mut self, store: &TupleStore) -> Result<()> {
        let cap = store.cap_of(self.bucket);
        if self.len() < cap {
            return Ok(());
        }
        store.promote(self)
    }

    pub fn members(&self) -> Vec<Record> {
        self.record.with_members(|m| m.to_vec()).unwrap_or_default()
    }

    /// Deep-copy this tuple: recurse on members, duplicate container
    /// labels at every level. `Record::deep_copy` already duplicates each
    /// member's own container labels (including its member label), so
    /// this only needs to re-insert the already-labeled copy, not
    /// relabel it.
    pub fn deep_copy(&self, store: &TupleStore) -> Result<Tuple> {
        let mut dst = store.allocate()?;
        for member in self.members() {
            let copied = member.deep_copy();
            dst.add_copied_member(store, copied)?;
        }
        for label in self.record.container_labels() {
            dst.record.add_container_label(label);
        }
        Ok(dst)
    }

    /// Append a member that already carries its final container labels
    /// (from `Record::deep_copy`) without touching them further.
    fn add_copied_member(&mut self, store: &TupleStore, child: Record) -> Result<()> {
        self.ensure_capacity(store)?;
        self.record
            .with_members_mut(|m| m.push(child))
            .expect("tuple record must carry a members payload");
        Ok(())
    }
}
