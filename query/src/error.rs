//! Engine error types.

use canopy_pattern::PatternError;
use thiserror::Error;

/// Errors raised while applying a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A pattern or dialect error, surfaced during compilation or
    /// candidate generation.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// The frame's indexing does not fit the engine's multi-index mode.
    #[error("multi-index mode mismatch: {message}")]
    ModeMismatch { message: String },

    /// An unrecognized multi-index mode name.
    #[error("unknown multi-index mode '{mode}', expected off, any, or all")]
    UnknownMode { mode: String },
}

/// Result type for engine operations.
pub type QueryResult<T> = Result<T, QueryError>;
