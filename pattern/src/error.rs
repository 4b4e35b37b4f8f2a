//! Pattern and dialect error types.

use canopy_parser::ParseError;
use thiserror::Error;

/// Errors raised while building patterns or compiling dialects.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The path shape is malformed (bad quantifier, empty pattern,
    /// unbound name, unparseable query text).
    #[error("invalid path: {message}")]
    InvalidPath { message: String },

    /// A predicate is malformed or type-inconsistent.
    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    /// A compound query was built with the wrong number of subqueries.
    #[error("bad arity: {message}")]
    BadArity { message: String },
}

impl PatternError {
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath {
            message: message.into(),
        }
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }

    pub fn bad_arity(message: impl Into<String>) -> Self {
        Self::BadArity {
            message: message.into(),
        }
    }
}

impl From<ParseError> for PatternError {
    fn from(err: ParseError) -> Self {
        Self::InvalidPath {
            message: err.to_string(),
        }
    }
}

/// Result type for pattern operations.
pub type PatternResult<T> = Result<T, PatternError>;
