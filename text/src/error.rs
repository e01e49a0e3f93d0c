//! Error types for document operations.

pub type Result<T, E = TextError> = std::result::Result<T, E>;

/// Errors surfaced at the public entry points. Internal recursion
/// assumes already-validated bounds.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("position {pos} out of range for document of length {len}")]
    OutOfRange { pos: usize, len: usize },

    #[error("line {line} out of range for document with {lines} lines")]
    InvalidLine { line: usize, lines: usize },

    #[error("line {line} contains a line separator")]
    SeparatorInLine { line: usize },

    #[error("a document needs at least one line")]
    EmptyText,

    #[error("malformed JSON document")]
    Json(#[from] serde_json::Error),
}
