//! Error Module - runtime error taxonomy.
//!
//! Errors are grouped by *kind*, matching how the runtime reacts to them
//! rather than where in the code they happened: configuration errors abort
//! construction, resource exhaustion is routed back to the caller as a
//! dropped record plus a counter bump, programmer errors are logged with
//! context, and shutdown is a deliberate, successful drain.

use std::sync::PoisonError;
use thiserror::Error;

/// The runtime's error type.
#[derive(Debug, Error)]
pub enum WsError {
    // ---- Configuration --------------------------------------------------
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid runtime config: {field} = {value} ({reason})")]
    InvalidConfig {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    // ---- Resource exhaustion ---------------------------------------------
    #[error("free list '{pool}' exhausted: cap {cap} reached")]
    PoolExhausted { pool: String, cap: usize },

    #[error("label index ceiling exceeded: {ceiling}")]
    LabelIndexCeilingExceeded { ceiling: u32 },

    #[error("tuple member array full: capacity {capacity}")]
    TupleFull { capacity: usize },

    #[error("container label cap exceeded: {cap}")]
    LabelCapExceeded { cap: usize },

    #[error("ordered index node pool exhausted: capacity {capacity}")]
    IndexPoolExhausted { capacity: usize },

    #[error("queue '{queue}' is full after {attempts} push attempts")]
    QueueFull { queue: String, attempts: u32 },

    #[error("queue '{queue}' is empty")]
    QueueEmpty { queue: String },

    // ---- Programmer error --------------------------------------------------
    #[error("reference count underflow on release")]
    RefcountUnderflow,

    #[error("datatype '{0}' registered twice")]
    DuplicateDatatype(String),

    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("bounds check failed: index {index} out of bounds for length {length}")]
    BoundsCheckFailed { index: usize, length: usize },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    // ---- Data error --------------------------------------------------------
    #[error("decode error: {0}")]
    Decode(String),
}

impl WsError {
    /// True if the runtime can continue after this error (the caller drops
    /// the record and moves on) rather than needing to stop the graph.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WsError::PoolExhausted { .. }
                | WsError::QueueFull { .. }
                | WsError::QueueEmpty { .. }
                | WsError::TupleFull { .. }
                | WsError::LabelCapExceeded { .. }
                | WsError::IndexPoolExhausted { .. }
                | WsError::Decode(_)
        )
    }

    /// True if this error indicates a bug in calling code rather than
    /// ordinary resource pressure.
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            WsError::InvalidState { .. }
                | WsError::BoundsCheckFailed { .. }
                | WsError::Internal(_)
                | WsError::LockPoisoned(_)
                | WsError::RefcountUnderflow
                | WsError::DuplicateDatatype(_)
        )
    }
}

impl<T> From<PoisonError<T>> for WsError {
    fn from(err: PoisonError<T>) -> Self {
        WsError::LockPoisoned(err.to_string())
    }
}

impl From<ws_label::LabelError> for WsError {
    fn from(err: ws_label::LabelError) -> Self {
        match err {
            ws_label::LabelError::IndexCeilingExceeded { ceiling } => {
                WsError::LabelIndexCeilingExceeded { ceiling }
            }
            other => WsError::Configuration(other.to_string()),
        }
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, WsError>;

/// Handle mutex lock poisoning with a typed error instead of an unwrap.
#[macro_export]
macro_rules! lock_result {
    ($lock:expr) => {
        $lock.map_err(|e| $crate::error::WsError::from(e))
    };
}

/// Unwrap a mutex guard with a clear panic message instead of the default one.
#[macro_export]
macro_rules! lock_unwrap {
    ($lock:expr) => {
        $lock.unwrap_or_else(|e| {
            panic!(
                "mutex poisoned - another thread panicked while holding the lock: {}",
                e
            )
        })
    };
}

/// Early return with an error, converting via `Into`.
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

/// Ensure a condition holds, otherwise return the given error.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
