//! Record Module - the reference-counted record envelope (C3 + C5, "wsdata")
//!
//! A [`Record`] is a cheap handle (an `Arc` clone) around a [`RecordInner`]:
//! a datatype pointer, up to [`crate::config::RuntimeConfig::container_label_cap`]
//! container labels, a payload (either a byte buffer or, for tuples, a list
//! of child records), and a dependency stack of parent records this record
//! borrows from.
//!
//! The source project hand-rolls an atomic refcount plus a back-pointer
//! stack walked by a bespoke "destroy" routine. Per the Design Notes this
//! is re-expressed on top of `Arc`'s shared-ownership primitive: `add_ref`
//! is `Clone`, `release` is `Drop`, and "reference conservation" (the
//! number of live handles equals the refcount) is true by construction
//! rather than something a hand-rolled counter can drift from. What the
//! free-list primitive (C6) still pools by hand is the expensive part -
//! the payload buffer - handed back to the owning datatype's free list
//! when the last `Arc` drops, rather than returned to the allocator.

use std::sync::{Arc, Mutex};

use ws_label::Label;

use crate::datatype::Datatype;
use crate::error::{Result, WsError};

/// A record's payload: either an opaque byte buffer (scalar/variable
/// datatypes) or an ordered list of child records (tuples, C4).
pub enum Payload {
    Bytes(Vec<u8>),
    Members(Vec<Record>),
}

impl Payload {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Bytes(b) => Some(b),
            Payload::Members(_) => None,
        }
    }

    pub fn as_bytes_mut(&mut self) -> Option<&mut Vec<u8>> {
        match self {
            Payload::Bytes(b) => Some(b),
            Payload::Members(_) => None,
        }
    }

    pub fn as_members(&self) -> Option<&[Record]> {
        match self {
            Payload::Members(m) => Some(m),
            Payload::Bytes(_) => None,
        }
    }

    pub fn as_members_mut(&mut self) -> Option<&mut Vec<Record>> {
        match self {
            Payload::Members(m) => Some(m),
            Payload::Bytes(_) => None,
        }
    }
}

/// Offset + length into a payload's bytes, memoized lazily by the generic
/// hash callback (or by a datatype-specific one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashSpan {
    pub offset: usize,
    pub len: usize,
}

/// Returns a tuple's (now-empty) member-array buffer to the bucket free
/// list it was drawn from. Set by [`crate::tuple::TupleStore`] at
/// allocation/promotion time so a tuple's `RecordInner::drop` does not
/// need to know which of the three buckets backs it.
pub(crate) type MembersRecycleHook = Arc<dyn Fn(Vec<Record>) + Send + Sync>;

struct RecordInner {
    datatype: Arc<Datatype>,
    labels: Mutex<Vec<Label>>,
    payload: Mutex<Payload>,
    /// The record this one is a shallow alias of; always the single entry
    /// pushed by `make_alias`, present only when `is_pointer` is set.
    dependencies: Mutex<Vec<Record>>,
    is_pointer: bool,
    hash_cache: Mutex<Option<HashSpan>>,
    label_cap: usize,
    members_recycle: Mutex<Option<MembersRecycleHook>>,
}

impl Drop for RecordInner {
    fn drop(&mut self) {
        (self.datatype.callbacks().destroy)();
        if !self.is_pointer {
            let payload = std::mem::replace(&mut *self.payload.lock().unwrap(), Payload::Bytes(Vec::new()));
            match payload {
                Payload::Bytes(buf) => self.datatype.recycle_normal(buf),
                Payload::Members(members) => {
                    // Each member's own `Drop` runs here (releasing its
                    // reference and, transitively, its dependency stack)
                    // before the now-empty buffer is handed back.
                    if let Some(hook) = self.members_recycle.lock().unwrap().take() {
                        hook(members);
                    }
                }
            }
        } else {
            self.datatype.recycle_pointer();
        }
        // `dependencies` drops here, releasing each parent `Record` in turn -
        // this is the "pop and release each parent" half of the contract.
    }
}

/// A reference-counted record handle ("wsdata" in the source project).
///
/// Cloning a `Record` is `add_ref`; dropping the last clone runs the
/// datatype's destroy callback, releases the dependency stack, and
/// recycles the payload buffer back to its free list.
#[derive(Clone)]
pub struct Record(Arc<RecordInner>);

impl Record {
    pub(crate) fn new_bytes(
        datatype: Arc<Datatype>,
        buf: Vec<u8>,
        label_cap: usize,
    ) -> Self {
        let rec = Record(Arc::new(RecordInner {
            datatype: datatype.clone(),
            labels: Mutex::new(Vec::new()),
            payload: Mutex::new(Payload::Bytes(buf)),
            dependencies: Mutex::new(Vec::new()),
            is_pointer: false,
            hash_cache: Mutex::new(None),
            label_cap,
            members_recycle: Mutex::new(None),
        }));
        (datatype.callbacks().init)(&rec);
        rec
    }

    pub(crate) fn new_members(
        datatype: Arc<Datatype>,
        members: Vec<Record>,
        label_cap: usize,
    ) -> Self {
        let rec = Record(Arc::new(RecordInner {
            datatype: datatype.clone(),
            labels: Mutex::new(Vec::new()),
            payload: Mutex::new(Payload::Members(members)),
            dependencies: Mutex::new(Vec::new()),
            is_pointer: false,
            hash_cache: Mutex::new(None),
            label_cap,
            members_recycle: Mutex::new(None),
        }));
        (datatype.callbacks().init)(&rec);
        rec
    }

    /// Build a shallow alias of `src`: an empty, `is_pointer` record whose
    /// reads delegate to `src`'s payload, with `src` pushed as the sole
    /// dependency (incrementing `src`'s reference count).
    pub(crate) fn new_alias(datatype: Arc<Datatype>, src: &Record, label_cap: usize) -> Self {
        let rec = Record(Arc::new(RecordInner {
            datatype,
            labels: Mutex::new(Vec::new()),
            payload: Mutex::new(Payload::Bytes(Vec::new())),
            dependencies: Mutex::new(vec![src.add_ref()]),
            is_pointer: true,
            hash_cache: Mutex::new(None),
            label_cap,
            members_recycle: Mutex::new(None),
        }));
        rec
    }

    /// The record's datatype. Immutable for the life of the allocation.
    pub fn datatype(&self) -> &Arc<Datatype> {
        &self.0.datatype
    }

    /// True if this record's payload is borrowed from another record of
    /// the same type (via [`Datatype::make_alias`]).
    pub fn is_pointer(&self) -> bool {
        self.0.is_pointer
    }

    /// The number of live handles to this record. Equal to the
    /// spec's `references` counter by construction.
    pub fn references(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Explicit `add_ref`: hand out another owning handle. Equivalent to
    /// [`Clone::clone`], named to match the operator-facing contract in
    /// §4.5/§6.
    pub fn add_ref(&self) -> Record {
        self.clone()
    }

    /// Explicit `release`: drop this owner's handle. Equivalent to
    /// `drop(self)`.
    pub fn release(self) {
        drop(self)
    }

    /// Push `parent` onto this record's dependency stack, incrementing
    /// `parent`'s reference count. Cycles are forbidden by convention
    /// (parents are always older); the core does not detect them.
    pub fn assign_dependency(&self, parent: Record) {
        self.0.dependencies.lock().unwrap().push(parent);
    }

    /// Snapshot of this record's dependency stack (for traversal/testing).
    pub fn dependencies(&self) -> Vec<Record> {
        self.0.dependencies.lock().unwrap().clone()
    }

    /// Append a container label, subject to the registry-wide cap.
    /// Returns `false` (caller's problem, per §4.5) on overflow.
    pub fn add_container_label(&self, label: Label) -> bool {
        let mut labels = self.0.labels.lock().unwrap();
        if labels.len() >= self.0.label_cap {
            return false;
        }
        labels.push(label);
        true
    }

    pub fn container_labels(&self) -> Vec<Label> {
        self.0.labels.lock().unwrap().clone()
    }

    pub fn has_container_label(&self, label: &Label) -> bool {
        self.0.labels.lock().unwrap().iter().any(|l| l == label)
    }

    /// Read-only access to the payload bytes. For an alias record this
    /// delegates to the single dependency it borrows from.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        if self.0.is_pointer {
            let deps = self.0.dependencies.lock().unwrap();
            return deps.first().and_then(|p| p.with_bytes(f));
        }
        let payload = self.0.payload.lock().unwrap();
        payload.as_bytes().map(f)
    }

    /// Mutate the payload bytes. Only valid before the record has been
    /// handed off to a second thread; the core does not enforce this.
    pub fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut Vec<u8>) -> R) -> Result<R> {
        if self.0.is_pointer {
            return Err(WsError::InvalidState {
                expected: "owning record".into(),
                actual: "pointer/alias record".into(),
            });
        }
        let mut payload = self.0.payload.lock().unwrap();
        payload
            .as_bytes_mut()
            .map(f)
            .ok_or_else(|| WsError::InvalidState {
                expected: "bytes payload".into(),
                actual: "members payload".into(),
            })
    }

    /// Read-only access to tuple members (empty for non-tuple records).
    pub fn with_members<R>(&self, f: impl FnOnce(&[Record]) -> R) -> Option<R> {
        let payload = self.0.payload.lock().unwrap();
        payload.as_members().map(f)
    }

    pub(crate) fn with_members_mut<R>(&self, f: impl FnOnce(&mut Vec<Record>) -> R) -> Option<R> {
        let mut payload = self.0.payload.lock().unwrap();
        payload.as_members_mut().map(f)
    }

    /// Install (or replace) the callback that returns this record's
    /// member-array buffer to its owning bucket free list once the record
    /// is destroyed. Used by [`crate::tuple::TupleStore`] at allocation and
    /// promotion time.
    pub(crate) fn set_members_recycle_hook(&self, hook: MembersRecycleHook) {
        *self.0.members_recycle.lock().unwrap() = Some(hook);
    }

    /// Lazily compute and cache the (offset, len) span the generic hash
    /// callback should hash over. Returns the cached span on repeat calls.
    pub fn hash_span(&self) -> Option<HashSpan> {
        let mut cache = self.0.hash_cache.lock().unwrap();
        if let Some(span) = *cache {
            return Some(span);
        }
        let len = self.with_bytes(|b| b.len())?;
        let span = HashSpan { offset: 0, len };
        *cache = Some(span);
        Some(span)
    }

    pub fn hash_cached(&self) -> bool {
        self.0.hash_cache.lock().unwrap().is_some()
    }

    /// Deep-copy `self` into a freshly allocated record of the same
    /// datatype: recurses on tuple members, duplicates container labels at
    /// every level, and otherwise invokes the datatype's copy callback.
    pub fn deep_copy(&self) -> Record {
        if let Some(members) = self.with_members(|m| m.to_vec()) {
            let copied: Vec<Record> = members.iter().map(Record::deep_copy).collect();
            let dst = Record::new_members(self.0.datatype.clone(), copied, self.0.label_cap);
            for label in self.container_labels() {
                dst.add_container_label(label);
            }
            return dst;
        }
        let dst = (self.0.datatype.callbacks().copy)(self);
        for label in self.container_labels() {
            dst.add_container_label(label);
        }
        dst
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("datatype", &self.0.datatype.name())
            .field("is_pointer", &self.0.is_pointer)
            .field("references", &self.references())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DatatypeRegistry;

    fn registry() -> DatatypeRegistry {
        DatatypeRegistry::new(20)
    }

    #[test]
    fn allocate_resets_refcount_and_labels() {
        let reg = registry();
        let dt = reg.register("uint32", 4, Default::default()).unwrap();
        let rec = dt.allocate().unwrap();
        assert_eq!(rec.references(), 1);
        assert!(rec.container_labels().is_empty());
    }

    #[test]
    fn dependency_release_order() {
        let reg = registry();
        let dt = reg.register("string", 0, Default::default()).unwrap();
        let parent = dt.allocate().unwrap();
        assert_eq!(parent.references(), 1);

        let child = dt.make_alias(&parent).unwrap();
        // make_alias added a dependency -> parent now has 2 live handles.
        assert_eq!(parent.references(), 2);

        drop(parent);
        // The caller's handle on `parent` is gone, but the alias keeps it
        // alive via the dependency stack.
        drop(child);
        // Once the alias drops, its dependency stack drops `parent` too -
        // nothing left to assert on directly, but this must not panic or
        // double-free, which `Arc` guarantees by construction.
    }

    #[test]
    fn container_label_cap_is_enforced() {
        let reg = DatatypeRegistry::new(2);
        let dt = reg.register("t", 0, Default::default()).unwrap();
        let rec = dt.allocate().unwrap();
        let l1 = ws_label::LabelTable::new(16).register("A");
        let l2 = ws_label::LabelTable::new(16).register("B");
        let l3 = ws_label::LabelTable::new(16).register("C");
        assert!(rec.add_container_label(l1));
        assert!(rec.add_container_label(l2));
        assert!(!rec.add_container_label(l3));
    }

    #[test]
    fn alias_reads_through_to_source_bytes() {
        let reg = registry();
        let dt = reg.register("bytes", 0, Default::default()).unwrap();
        let src = dt.allocate().unwrap();
        src.with_bytes_mut(|b| b.extend_from_slice(b"hello")).unwrap();

        let alias = dt.make_alias(&src).unwrap();
        assert_eq!(alias.with_bytes(|b| b.to_vec()), Some(b"hello".to_vec()));
        assert!(alias.is_pointer());
    }

    #[test]
    fn deep_copy_duplicates_labels_and_bytes() {
        let reg = registry();
        let dt = reg.register("scalar", 0, Default::default()).unwrap();
        let src = dt.allocate().unwrap();
        src.with_bytes_mut(|b| b.extend_from_slice(b"x")).unwrap();
        let l = ws_label::LabelTable::new(16).register("K");
        src.add_container_label(l.clone());

        let dst = src.deep_copy();
        assert_eq!(dst.with_bytes(|b| b.to_vec()), Some(b"x".to_vec()));
        assert!(dst.has_container_label(&l));
        assert_ne!(
            Arc::as_ptr(&src.0) as usize,
            Arc::as_ptr(&dst.0) as usize
        );
    }
}
