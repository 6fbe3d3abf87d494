//! # ws-core: the WaterSlide runtime core
//!
//! `ws-core` is the runtime core of a streaming dataflow engine: user graphs
//! of small operators ("kids") process an open-ended sequence of typed,
//! labeled records ("tuples"). This crate owns the parts of that engine that
//! have to be fast and correct under concurrent, zero-copy forwarding: the
//! type-and-label registry, the reference-counted tuple data model, the
//! per-type free-list memory pools, and the concurrency primitives (bounded
//! MWMR queue, lock-free stack, red-black ordered key index) that move
//! records between operator threads without copying them.
//!
//! ## Quick start
//!
//! ```rust
//! use ws_core::{Runtime, RuntimeConfig};
//!
//! let runtime = Runtime::new(RuntimeConfig::default()).unwrap();
//! let label = runtime.labels().register("SRC_IP");
//! assert_eq!(label.name(), "SRC_IP");
//! ```
//!
//! ## Modules
//!
//! - [`label`]: runtime-scoped label registry (wraps [`ws_label::LabelTable`])
//! - [`datatype`]: named record-shape registry with callback tables
//! - [`record`]: reference-counted record envelope, dependency stack
//! - [`tuple`]: bucketed variable-length tuple payload
//! - [`freelist`]: thread-cached and atomic-stack free-list backends
//! - [`queue`]: bounded MWMR event queue
//! - [`stack`]: lock-free Treiber stack
//! - [`index`]: red-black ordered key index with a preallocated node arena
//! - [`flush`]: in-band flush/shutdown protocol
//! - [`runtime`]: the `Runtime` handle that owns C1-C4 and is threaded
//!   through operator construction
//! - [`config`]: environment-driven runtime configuration
//! - [`error`]: the crate's error taxonomy
//! - [`stats`]: diagnostics and counters

pub mod config;
pub mod error;

pub mod label;
pub mod datatype;
pub mod record;
pub mod tuple;

pub mod freelist;
pub mod queue;
pub mod stack;
pub mod index;

pub mod flush;
pub mod runtime;
pub mod stats;

pub use config::RuntimeConfig;
pub use error::{Result, WsError};
pub use flush::FlushKind;
pub use runtime::Runtime;

/// ws-core version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_default() {
        let runtime = Runtime::new(RuntimeConfig::default());
        assert!(runtime.is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_version_not_empty() {
        assert!(!VERSION.is_empty());
    }
}
