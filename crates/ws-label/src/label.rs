//! Label registry.
//!
//! A label is an interned name attached to a record (as a "container
//! label") or to a tuple member slot (as a search key). Two mentions of
//! the same text always resolve to the same `Label`, so comparisons and
//! lookups downstream are pointer/integer comparisons rather than string
//! comparisons.
//!
//! Only labels that are explicitly marked *searchable* (via [`LabelTable::search`])
//! consume an entry in the dense index-id space that tuple-member scans use;
//! plain [`LabelTable::register`] calls never touch that space.

use ahash::AHasher;
use dashmap::DashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{LabelError, LabelResult};

const MAX_PROBES: u64 = 32;
const PROBE_PRIME: u64 = 0x9e3779b97f4a7c15;

struct LabelInner {
    name: String,
    hash: u64,
    registered: AtomicBool,
    searchable: AtomicBool,
    /// 0 means "no index id assigned yet"; real ids start at 1.
    index_id: AtomicU32,
}

/// A handle to an interned label.
///
/// Cloning is cheap (an `Arc` bump); equality is by identity, not by
/// string content, matching the invariant that equal names always share
/// one label object.
#[derive(Clone)]
pub struct Label(Arc<LabelInner>);

impl Label {
    /// The label's original text.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// 64-bit hash of the label's text, stable for the life of the process.
    pub fn hash(&self) -> u64 {
        self.0.hash
    }

    /// True once the label has passed through `register` or `search`.
    pub fn is_registered(&self) -> bool {
        self.0.registered.load(Ordering::Relaxed)
    }

    /// True if the label was marked searchable (assigned a dense index id).
    pub fn is_searchable(&self) -> bool {
        self.0.searchable.load(Ordering::Relaxed)
    }

    /// The label's dense index id, if it has been assigned one.
    pub fn index_id(&self) -> Option<u32> {
        match self.0.index_id.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id),
        }
    }

    fn ptr_key(&self) -> *const LabelInner {
        Arc::as_ptr(&self.0)
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ptr_key().hash(state);
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Label")
            .field("name", &self.0.name)
            .field("searchable", &self.is_searchable())
            .field("index_id", &self.index_id())
            .finish()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

/// Statistics snapshot for a [`LabelTable`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LabelTableStats {
    pub registered: usize,
    pub searchable: usize,
    pub collisions: usize,
    pub hits: usize,
    pub misses: usize,
}

/// Owns the label interning tables for one [`crate::Runtime`][rt]-scoped universe.
///
/// Unlike a process-wide singleton, each `LabelTable` is independent: tests
/// construct their own and never observe another table's labels or index-id
/// allocations.
///
/// [rt]: https://docs.rs/ws-core
pub struct LabelTable {
    by_name: DashMap<String, Label>,
    by_hash: DashMap<u64, Label>,
    next_index: AtomicU32,
    ceiling: u32,
    collisions: AtomicUsize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl LabelTable {
    /// Construct an empty table. `index_ceiling` bounds how many labels may
    /// be marked searchable (each consumes one dense index id).
    pub fn new(index_ceiling: u32) -> Self {
        Self {
            by_name: DashMap::with_capacity(256),
            by_hash: DashMap::with_capacity(256),
            next_index: AtomicU32::new(1),
            ceiling: index_ceiling,
            collisions: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Register a label name, interning it if this is the first mention.
    ///
    /// Does not assign an index id or mark the label searchable; use
    /// [`search`][Self::search] for that.
    pub fn register(&self, name: &str) -> Label {
        if let Some(existing) = self.by_name.get(name) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return existing.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        match self.by_name.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => entry.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let label = self.new_label(name);
                entry.insert(label.clone());
                self.insert_hash(label.hash(), label.clone());
                label
            }
        }
    }

    /// Register a label and mark it searchable, assigning it a dense index
    /// id if it does not already have one.
    ///
    /// Fails if the process-wide index-id ceiling has been reached.
    pub fn search(&self, name: &str) -> LabelResult<Label> {
        let label = self.register(name);
        if label.0.searchable.swap(true, Ordering::AcqRel) {
            return Ok(label);
        }
        let id = self.next_index.fetch_add(1, Ordering::Relaxed);
        if id > self.ceiling {
            self.next_index.fetch_sub(1, Ordering::Relaxed);
            label.0.searchable.store(false, Ordering::Relaxed);
            return Err(LabelError::IndexCeilingExceeded {
                ceiling: self.ceiling,
            });
        }
        label.0.index_id.store(id, Ordering::Relaxed);
        Ok(label)
    }

    /// Bind an additional name to an already-interned label.
    ///
    /// Returns [`LabelError::AliasConflict`] if `new_name` is already bound
    /// to a different label.
    pub fn alias(&self, existing: &Label, new_name: &str) -> LabelResult<()> {
        match self.by_name.entry(new_name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                if entry.get() == existing {
                    Ok(())
                } else {
                    Err(LabelError::AliasConflict {
                        name: new_name.to_string(),
                    })
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(existing.clone());
                Ok(())
            }
        }
    }

    /// Look up a label by its 64-bit hash, as recovered from a serialized form.
    pub fn find_by_hash(&self, hash: u64) -> Option<Label> {
        self.by_hash.get(&hash).map(|e| e.value().clone())
    }

    /// Look up a label by name without registering it.
    pub fn find_by_name(&self, name: &str) -> Option<Label> {
        self.by_name.get(name).map(|e| e.value().clone())
    }

    fn new_label(&self, name: &str) -> Label {
        let hash = Self::hash_name(name);
        Label(Arc::new(LabelInner {
            name: name.to_string(),
            hash,
            registered: AtomicBool::new(true),
            searchable: AtomicBool::new(false),
            index_id: AtomicU32::new(0),
        }))
    }

    /// Insert into the hash-keyed table, probing past collisions the same
    /// way the underlying interner does for its own hash table.
    fn insert_hash(&self, hash: u64, label: Label) {
        if self.by_hash.contains_key(&hash) {
            for i in 1u64..=MAX_PROBES {
                let probe = hash.wrapping_add(i.wrapping_mul(PROBE_PRIME));
                if !self.by_hash.contains_key(&probe) {
                    self.collisions.fetch_add(1, Ordering::Relaxed);
                    self.by_hash.insert(probe, label);
                    return;
                }
            }
        }
        self.by_hash.insert(hash, label);
    }

    fn hash_name(name: &str) -> u64 {
        let mut hasher = AHasher::default();
        name.hash(&mut hasher);
        hasher.finish()
    }

    /// Snapshot of registry occupancy and interning statistics.
    pub fn stats(&self) -> LabelTableStats {
        LabelTableStats {
            registered: self.by_name.len(),
            searchable: self
                .by_name
                .iter()
                .filter(|e| e.value().is_searchable())
                .count(),
            collisions: self.collisions.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_same_name_returns_same_label() {
        let table = LabelTable::new(1024);
        let a = table.register("PACKET");
        let b = table.register("PACKET");
        assert_eq!(a, b);
    }

    #[test]
    fn register_different_names_returns_different_labels() {
        let table = LabelTable::new(1024);
        let a = table.register("A");
        let b = table.register("B");
        assert_ne!(a, b);
    }

    #[test]
    fn search_marks_searchable_and_assigns_index_id() {
        let table = LabelTable::new(1024);
        let a = table.register("A");
        assert!(!a.is_searchable());
        let a2 = table.search("A").unwrap();
        assert!(a2.is_searchable());
        assert_eq!(a2.index_id(), Some(1));
        // Re-searching the same label does not burn a second index id.
        let a3 = table.search("A").unwrap();
        assert_eq!(a3.index_id(), a2.index_id());
    }

    #[test]
    fn find_by_hash_recovers_registered_label() {
        let table = LabelTable::new(1024);
        let a = table.register("DNS");
        let hash = a.hash();
        let found = table.find_by_hash(hash).unwrap();
        assert_eq!(found, a);
    }

    #[test]
    fn alias_resolves_to_same_label() {
        let table = LabelTable::new(1024);
        let a = table.register("IPV4");
        table.alias(&a, "IP").unwrap();
        let via_alias = table.register("IP");
        assert_eq!(a, via_alias);
    }

    #[test]
    fn alias_conflict_is_rejected() {
        let table = LabelTable::new(1024);
        let a = table.register("A");
        let b = table.register("B");
        assert!(table.alias(&a, "B").is_err());
        assert_eq!(table.register("B"), b);
    }

    #[test]
    fn index_ceiling_is_enforced() {
        let table = LabelTable::new(2);
        table.search("A").unwrap();
        table.search("B").unwrap();
        let err = table.search("C").unwrap_err();
        assert!(matches!(err, LabelError::IndexCeilingExceeded { ceiling: 2 }));
    }

    #[test]
    fn independent_tables_do_not_share_index_space() {
        let t1 = LabelTable::new(1024);
        let t2 = LabelTable::new(1024);
        let a = t1.search("A").unwrap();
        let b = t2.search("A").unwrap();
        assert_eq!(a.index_id(), b.index_id());
        assert_ne!(a, b);
    }

    #[test]
    fn concurrent_register_converges_on_one_label() {
        use std::thread;
        let table = Arc::new(LabelTable::new(1024));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let table = table.clone();
                thread::spawn(move || table.register("SHARED"))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for r in &results[1..] {
            assert_eq!(&results[0], r);
        }
    }
}
