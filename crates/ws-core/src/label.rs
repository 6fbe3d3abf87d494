//! Label Module - runtime-scoped view over the label registry (C1)
//!
//! The interning table itself lives in `ws-label`; this module wires it to
//! a `Runtime`'s configuration (the index ceiling) and re-exports the
//! handle types operators actually touch, so operator code never needs to
//! depend on `ws-label` directly.

pub use ws_label::{Label, LabelTableStats};

use crate::error::Result;
use std::sync::Arc;
use ws_label::LabelTable;

/// Runtime-owned label registry.
///
/// Cloning is cheap (`Arc` handle) and every clone observes the same
/// interned labels - this is the `Runtime`-owned `Arc` handle described in
/// the component design for C1, not a process-wide singleton: two
/// independently constructed `Runtime`s never share index-id allocation.
#[derive(Clone)]
pub struct LabelRegistry {
    table: Arc<LabelTable>,
}

impl LabelRegistry {
    /// Construct a registry with the given index-id ceiling.
    pub fn new(index_ceiling: u32) -> Self {
        Self {
            table: Arc::new(LabelTable::new(index_ceiling)),
        }
    }

    /// Intern `name`, marking it registered. Does not assign an index id.
    pub fn register(&self, name: &str) -> Label {
        self.table.register(name)
    }

    /// Intern `name`, marking it registered *and* searchable, assigning a
    /// dense index id if one has not already been assigned.
    pub fn search(&self, name: &str) -> Result<Label> {
        Ok(self.table.search(name)?)
    }

    /// Add a secondary name that resolves to the same label object as
    /// `existing`.
    pub fn alias(&self, existing: &Label, new_name: &str) -> Result<()> {
        Ok(self.table.alias(existing, new_name)?)
    }

    /// O(1) lookup by a label's 64-bit content hash, for resolving
    /// on-the-wire label references.
    pub fn find_by_hash(&self, hash: u64) -> Option<Label> {
        self.table.find_by_hash(hash)
    }

    /// Look up a label by name without registering it.
    pub fn find_by_name(&self, name: &str) -> Option<Label> {
        self.table.find_by_name(name)
    }

    /// Snapshot of registration/search counters.
    pub fn stats(&self) -> LabelTableStats {
        self.table.stats()
    }
}
