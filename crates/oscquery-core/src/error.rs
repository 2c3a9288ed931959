//! Error types for OSCQuery tree operations

use thiserror::Error;

/// Result type alias for OSCQuery core operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Path cannot be used for the requested operation
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// No node exists at the path
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Node id refers to a slot that has since been removed
    #[error("node no longer exists in the tree")]
    StaleNode,

    /// Value operations need a method node
    #[error("not a method: {0}")]
    NotAMethod(String),

    #[error("argument index {index} out of range ({len} declared)")]
    ArgumentIndex { index: usize, len: usize },

    #[error("value does not match declared type '{expected}'")]
    TypeMismatch { expected: String },

    /// Query attribute outside the fixed OSCQuery set
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("unknown access code: {0}")]
    UnknownAccess(u8),
}
