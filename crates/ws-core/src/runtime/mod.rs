//! Runtime Module - the explicit runtime handle (C10)
//!
//! The source project reaches for process-wide global tables. Per the
//! Design Notes' "explicit runtime handle" redesign, a [`Runtime`] owns the
//! label registry, the datatype registry, and the tuple-bucket pools, and
//! is constructed once per process (or per test) and threaded explicitly
//! through operator `init`/`input_set` calls rather than touched through a
//! hidden singleton. Two independently constructed `Runtime`s never share
//! label index-id allocation or datatype registrations.

use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::datatype::DatatypeRegistry;
use crate::error::{Result, WsError};
use crate::label::LabelRegistry;
use crate::stats::RuntimeStats;
use crate::tuple::TupleStore;

/// Owns the label registry, datatype registry, and tuple pools for one
/// process (or one test). Cheap to pass around: every field is itself an
/// `Arc` handle or a cheap clone, so cloning a `Runtime` is inexpensive and
/// every clone observes the same registrations.
#[derive(Clone)]
pub struct Runtime {
    config: RuntimeConfig,
    labels: LabelRegistry,
    datatypes: Arc<DatatypeRegistry>,
    tuples: Arc<TupleStore>,
}

impl Runtime {
    /// Construct a runtime from the given configuration, failing fast (per
    /// §7's "Configuration" error policy) if it is not internally
    /// consistent.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| WsError::Configuration(e.to_string()))?;

        let labels = LabelRegistry::new(config.label_index_ceiling);
        let datatypes = Arc::new(DatatypeRegistry::new(config.container_label_cap));
        let tuples = Arc::new(TupleStore::new(
            &datatypes,
            [
                config.tuple_bucket_small,
                config.tuple_bucket_medium,
                config.tuple_bucket_large,
            ],
            config.tuple_member_hard_ceiling,
        )?);

        Ok(Self {
            config,
            labels,
            datatypes,
            tuples,
        })
    }

    /// Construct a runtime from `RuntimeConfig::from_env()`.
    pub fn from_env() -> Result<Self> {
        Self::new(RuntimeConfig::from_env())
    }

    /// The configuration this runtime was constructed with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// This runtime's label registry (C1).
    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    /// This runtime's datatype registry (C2).
    pub fn datatypes(&self) -> &Arc<DatatypeRegistry> {
        &self.datatypes
    }

    /// This runtime's tuple bucket pools (C4).
    pub fn tuples(&self) -> &Arc<TupleStore> {
        &self.tuples
    }

    /// Aggregate a point-in-time [`RuntimeStats`] snapshot (C12) from every
    /// pool this runtime owns directly.
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            labels: self.labels.stats(),
            datatypes_registered: self.datatypes.len(),
            tuples: self.tuples.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_config() {
        let bad = RuntimeConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(Runtime::new(bad), Err(WsError::Configuration(_))));
    }

    #[test]
    fn independent_runtimes_do_not_share_registrations() {
        let a = Runtime::new(RuntimeConfig::default()).unwrap();
        let b = Runtime::new(RuntimeConfig::default()).unwrap();

        a.labels().register("ONLY_IN_A");
        assert!(b.labels().find_by_name("ONLY_IN_A").is_none());

        a.datatypes().register("U32", 4, Default::default()).unwrap();
        assert!(b.datatypes().find_by_name("U32").is_none());
    }

    #[test]
    fn stats_reflects_registrations() {
        let rt = Runtime::new(RuntimeConfig::default()).unwrap();
        rt.labels().register("X");
        rt.datatypes().register("U32", 4, Default::default()).unwrap();

        let stats = rt.stats();
        // "TUPLE" is registered internally by TupleStore::new, plus "U32".
        assert_eq!(stats.datatypes_registered, 2);
        assert_eq!(stats.labels.registered, 1);
    }

    #[test]
    fn cloned_runtime_shares_state() {
        let rt = Runtime::new(RuntimeConfig::default()).unwrap();
        let clone = rt.clone();
        rt.labels().register("SHARED");
        assert!(clone.labels().find_by_name("SHARED").is_some());
    }
}
