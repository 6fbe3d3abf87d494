//! Datatype Module - named record-shape registry with callback tables (C2)
//!
//! A [`Datatype`] is the registered "shape" of a [`crate::record::Record`]:
//! a name, a content hash, a fixed record size (`0` for variable-length),
//! a small capability table of callbacks, and the two free lists (normal,
//! pointer/alias) backing [`Datatype::allocate`] and [`Datatype::make_alias`].
//!
//! The source project dispatches through a process-wide function-pointer
//! vtable per datatype. Per the Design Notes this is re-expressed as a
//! struct of `Arc<dyn Fn>` capabilities rather than raw function pointers,
//! with sensible generic defaults (see [`DatatypeCallbacks::default`]) so
//! most datatypes never need to supply one.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

use crate::error::{Result, WsError};
use crate::freelist::{FreeList, Slot};
use crate::record::Record;
use ws_label::Label;

/// Maximum number of sub-element descriptors a single datatype may carry.
pub const MAX_SUB_ELEMENTS: usize = 64;

/// How a sub-element is pulled out of a parent record.
pub enum Extractor {
    /// memcpy `len` bytes at `offset` into a freshly allocated child of
    /// `child_datatype`.
    Offset {
        offset: usize,
        len: usize,
        child_datatype: Arc<Datatype>,
    },
    /// A user callback that returns either a newly allocated child or a
    /// shallow alias into the parent.
    Callback(Arc<dyn Fn(&Record) -> ExtractedChild + Send + Sync>),
}

/// The result of running a sub-element [`Extractor`].
pub enum ExtractedChild {
    New(Record),
    Alias(Record),
}

/// One entry in a datatype's sub-element table: a child label plus how to
/// extract that child from a parent record.
pub struct SubElement {
    pub label: Label,
    pub extractor: Extractor,
}

/// The capability table a datatype's callbacks implement.
///
/// Every field has a generic default so registering a datatype with
/// `DatatypeCallbacks::default()` is enough for a plain scalar record.
#[derive(Clone)]
pub struct DatatypeCallbacks {
    /// Run once, immediately after allocation, on the freshly built record.
    pub init: Arc<dyn Fn(&Record) + Send + Sync>,
    /// Run as a side-effecting hook when the last reference to a record of
    /// this datatype drops, before its payload is recycled. Reference
    /// counting and dependency-chain release themselves are handled by
    /// `Record`'s `Drop` impl, not by this hook.
    pub destroy: Arc<dyn Fn() + Send + Sync>,
    /// Deep-copy a non-tuple record's payload into a fresh allocation.
    /// (Tuple members are copied by `Record::deep_copy` recursing directly,
    /// without going through this callback.)
    pub copy: Arc<dyn Fn(&Record) -> Record + Send + Sync>,
    /// Hash the record's payload (by default, the bytes covered by its
    /// lazily-memoized [`crate::record::HashSpan`]).
    pub hash: Arc<dyn Fn(&Record) -> u64 + Send + Sync>,
    pub print: Option<Arc<dyn Fn(&Record) -> String + Send + Sync>>,
    pub serialize: Option<Arc<dyn Fn(&Record) -> Vec<u8> + Send + Sync>>,
    pub to_string: Option<Arc<dyn Fn(&Record) -> String + Send + Sync>>,
    pub to_u64: Option<Arc<dyn Fn(&Record) -> Option<u64> + Send + Sync>>,
}

impl Default for DatatypeCallbacks {
    fn default() -> Self {
        DatatypeCallbacks {
            init: Arc::new(|_rec: &Record| {}),
            destroy: Arc::new(|| {}),
            copy: Arc::new(generic_copy),
            hash: Arc::new(generic_hash),
            print: None,
            serialize: None,
            to_string: None,
            to_u64: None,
        }
    }
}

/// Deep-copies a non-tuple record's bytes into a fresh allocation of the
/// same datatype, falling back to an unpooled allocation if the free list
/// is exhausted rather than failing the copy outright.
fn generic_copy(record: &Record) -> Record {
    let dt = record.datatype().clone();
    let dst = dt
        .allocate()
        .unwrap_or_else(|_| Record::new_bytes(dt.clone(), Vec::new(), dt.label_cap()));
    if let Some(bytes) = record.with_bytes(|b| b.to_vec()) {
        let _ = dst.with_bytes_mut(|buf| {
            buf.clear();
            buf.extend_from_slice(&bytes);
        });
    }
    dst
}

/// Hashes the bytes covered by the record's memoized hash span with a
/// fast, non-cryptographic hasher (consistent with C6/C7's "wire speed,
/// not durability" framing - labels and datatypes use a similar tradeoff).
fn generic_hash(record: &Record) -> u64 {
    let mut hasher = FxHasher::default();
    if let Some(span) = record.hash_span() {
        record.with_bytes(|bytes| {
            let end = (span.offset + span.len).min(bytes.len());
            bytes[span.offset.min(end)..end].hash(&mut hasher);
        });
    }
    hasher.finish()
}

enum Pool {
    Bytes {
        normal: FreeList<Vec<u8>>,
        pointer: FreeList<()>,
    },
}

/// A registered record shape: name, hash, size, callbacks, free lists, and
/// an optional sub-element descriptor table.
pub struct Datatype {
    name: String,
    hash: u64,
    record_size: usize,
    callbacks: DatatypeCallbacks,
    sub_elements: Mutex<Vec<SubElement>>,
    pool: Pool,
    label_cap: usize,
}

impl Datatype {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Fixed record size in bytes, or `0` for a variable-length datatype.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn callbacks(&self) -> &DatatypeCallbacks {
        &self.callbacks
    }

    pub fn label_cap(&self) -> usize {
        self.label_cap
    }

    /// Register a sub-element descriptor. Fails once the table reaches
    /// [`MAX_SUB_ELEMENTS`].
    pub fn add_sub_element(&self, sub: SubElement) -> Result<()> {
        let mut subs = self.sub_elements.lock().unwrap();
        if subs.len() >= MAX_SUB_ELEMENTS {
            return Err(WsError::Internal(format!(
                "datatype '{}': sub-element table full ({})",
                self.name, MAX_SUB_ELEMENTS
            )));
        }
        subs.push(sub);
        Ok(())
    }

    /// Extract the named sub-element from `record`, if registered.
    pub fn extract(&self, record: &Record, label: &Label) -> Option<ExtractedChild> {
        let subs = self.sub_elements.lock().unwrap();
        let sub = subs.iter().find(|s| &s.label == label)?;
        let child = match &sub.extractor {
            Extractor::Offset {
                offset,
                len,
                child_datatype,
            } => {
                let bytes = record.with_bytes(|b| {
                    let end = (*offset + *len).min(b.len());
                    b[(*offset).min(end)..end].to_vec()
                })?;
                let child = child_datatype.allocate().ok()?;
                let _ = child.with_bytes_mut(|buf| {
                    buf.clear();
                    buf.extend_from_slice(&bytes);
                });
                ExtractedChild::New(child)
            }
            Extractor::Callback(f) => f(record),
        };
        let child_rec = match &child {
            ExtractedChild::New(r) => r,
            ExtractedChild::Alias(r) => r,
        };
        child_rec.add_container_label(sub.label.clone());
        Some(child)
    }

    /// Pop an envelope from the normal free list (or grow the pool),
    /// reset its payload to `record_size` zeroed bytes, and run `init`.
    pub fn allocate(self: &Arc<Self>) -> Result<Record> {
        match &self.pool {
            Pool::Bytes { normal, .. } => {
                let mut slot = normal.alloc().ok_or_else(|| WsError::PoolExhausted {
                    pool: format!("{}/normal", self.name),
                    cap: 0,
                })?;
                slot.value_mut().clear();
                slot.value_mut().resize(self.record_size, 0);
                Ok(Record::new_bytes(self.clone(), slot.into_value(), self.label_cap))
            }
        }
    }

    /// Pop an envelope from the pointer free list, alias `src`'s payload,
    /// and register `src` as a dependency (incrementing its refcount).
    pub fn make_alias(self: &Arc<Self>, src: &Record) -> Result<Record> {
        match &self.pool {
            Pool::Bytes { pointer, .. } => {
                let _slot: Slot<()> = pointer.alloc().ok_or_else(|| WsError::PoolExhausted {
                    pool: format!("{}/pointer", self.name),
                    cap: 0,
                })?;
                Ok(Record::new_alias(self.clone(), src, self.label_cap))
            }
        }
    }

    pub(crate) fn recycle_normal(&self, buf: Vec<u8>) {
        if let Pool::Bytes { normal, .. } = &self.pool {
            normal.release_value(buf);
        }
    }

    pub(crate) fn recycle_pointer(&self) {
        if let Pool::Bytes { pointer, .. } = &self.pool {
            pointer.release_value(());
        }
    }
}

/// A name→datatype and hash→datatype registry (C2).
///
/// Registration is one-shot per name: a second registration of the same
/// name is logged and the existing datatype is returned unchanged.
pub struct DatatypeRegistry {
    by_name: DashMap<String, Arc<Datatype>>,
    by_hash: DashMap<u64, Arc<Datatype>>,
    container_label_cap: usize,
}

impl DatatypeRegistry {
    pub fn new(container_label_cap: usize) -> Self {
        Self {
            by_name: DashMap::new(),
            by_hash: DashMap::new(),
            container_label_cap,
        }
    }

    /// Register a scalar/variable-length datatype. Returns the existing
    /// datatype, unchanged, if `name` is already registered.
    pub fn register(
        &self,
        name: &str,
        record_size: usize,
        callbacks: DatatypeCallbacks,
    ) -> Result<Arc<Datatype>> {
        if let Some(existing) = self.by_name.get(name) {
            log::warn!("datatype '{name}' registered twice; ignoring second registration");
            return Ok(existing.clone());
        }

        let hash = hash_name(name);
        let dt = Arc::new(Datatype {
            name: name.to_string(),
            hash,
            record_size,
            callbacks,
            sub_elements: Mutex::new(Vec::new()),
            pool: Pool::Bytes {
                normal: FreeList::mutex_homed(0, move || Vec::with_capacity(record_size)),
                pointer: FreeList::mutex_homed(0, || ()),
            },
            label_cap: self.container_label_cap,
        });

        self.by_name.insert(name.to_string(), dt.clone());
        self.by_hash.insert(hash, dt.clone());
        Ok(dt)
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<Datatype>> {
        self.by_name.get(name).map(|e| e.value().clone())
    }

    pub fn find_by_hash(&self, hash: u64) -> Option<Arc<Datatype>> {
        self.by_hash.get(&hash).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn hash_name(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    hasher.finish()
}
