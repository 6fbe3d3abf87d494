//! Error types for the label registry crate.

use thiserror::Error;

/// Errors raised while registering or looking up labels.
#[derive(Debug, Error)]
pub enum LabelError {
    /// The process-wide index-id space is exhausted.
    ///
    /// Only searchable labels consume an index id; the ceiling is set by
    /// `RuntimeConfig::label_index_ceiling` and defaults to 1024.
    #[error("label index ceiling exceeded: {ceiling} searchable labels already assigned")]
    IndexCeilingExceeded { ceiling: u32 },

    /// `alias` was called with a name that is already bound to a different label.
    #[error("label name '{name}' is already registered to a different label")]
    AliasConflict { name: String },

    /// A hash lookup found no matching label.
    #[error("no label registered with hash {hash:#x}")]
    NotFound { hash: u64 },
}

/// Result alias for label registry operations.
pub type LabelResult<T> = std::result::Result<T, LabelError>;

/// Error type for index vector operations.
#[derive(Debug, Error)]
pub enum IndexVecError {
    /// Index out of bounds
    #[error("index out of bounds: index {index}, length {length}")]
    OutOfBounds { index: usize, length: usize },

    /// Invalid index
    #[error("invalid index: {0}")]
    InvalidIndex(String),
}

/// Result type alias for index vector operations.
pub type IndexVecResult<T> = std::result::Result<T, IndexVecError>;
