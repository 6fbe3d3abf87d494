//! # ws-ffi: the leaf-operator ("kid") contract
//!
//! `ws-ffi` is the narrow surface external collaborators - the hundred-plus
//! leaf operators, and eventually a graph loader - compile against, per §6
//! of the runtime core's contract. It never touches `ws-core`'s internals
//! directly; everything here is built on the core's public API
//! ([`ws_core::Runtime`], [`ws_core::record::Record`],
//! [`ws_core::flush::EdgeMessage`]).
//!
//! ## Modules
//!
//! - [`metadata`]: the static description a kid publishes before any
//!   record flows (name, version, option schema, declared ports)
//! - [`ports`]: the `dout` half of the contract - direct in-thread edges
//!   and cross-thread queue-backed edges, unified behind one trait
//! - [`operator`]: the `init`/`input_set`/`process_fn`/`destroy` contract
//!   itself, plus the type-erased adapter a graph loader needs

pub mod metadata;
pub mod operator;
pub mod ports;

pub use metadata::{OperatorMetadata, PortSpec};
pub use operator::{DynOperator, Operator, OperatorCounters, ProcessFn, SourceRegistry};
pub use ports::{DirectPort, OutputPort, OutputPorts};
