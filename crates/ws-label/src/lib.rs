//! ws-label - label interning and dense index-id assignment.
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! A label is a short, interned name attached to records and to tuple
//! member slots. This crate provides the interning substrate: given the
//! same name twice, it always returns the same handle, so everything
//! downstream compares labels by pointer/index rather than by string.
//!
//! DESIGN PRINCIPLES:
//! ------------------
//! 1. IDENTITY, NOT CONTENT
//!    Label equality is `Arc` pointer equality. Two labels interned from
//!    equal strings are literally the same allocation.
//!
//! 2. DENSE IDS ONLY WHERE NEEDED
//!    Most labels are just names; the dense `u32` index-id space (bounded,
//!    checked at construction) is reserved for labels explicitly marked
//!    *searchable* via [`LabelTable::search`].
//!
//! 3. NO PROCESS-WIDE SINGLETON
//!    Unlike a classic compiler symbol table, a `LabelTable` is owned by
//!    whoever constructs it (normally a runtime handle), so independent
//!    tests never share index-id allocations.
//!
//! ============================================================================
//! TYPED INDEX VECTORS
//! ============================================================================
//!
//! The crate also exports [`IndexVec`] and the [`Idx`] trait: a vector
//! indexed by a newtype rather than a bare `usize`, used by node-pool
//! structures (e.g. a red-black tree's arena) that want the compiler to
//! catch an index from the wrong space.

pub mod error;
pub mod label;
pub mod index_vec;

pub use error::{IndexVecError, IndexVecResult, LabelError, LabelResult};
pub use index_vec::{Idx, IndexVec};
pub use label::{Label, LabelTable, LabelTableStats};

// Re-export commonly used types
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;

// `define_idx!` is declared with `#[macro_export]` inside `index_vec` and is
// therefore already available at the crate root as `ws_label::define_idx!`.
