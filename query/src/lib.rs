//! Canopy Query
//!
//! Applies queries to a call graph and its metric frame.
//!
//! Responsibilities:
//! - Candidate generation: per-position predicate sweeps over the frame,
//!   with multi-index aggregation modes
//! - Memoized path search over (node, pattern position)
//! - Set-algebraic evaluation of compound queries

mod engine;
mod error;

pub use engine::{MultiIndexMode, QueryEngine};
pub use error::{QueryError, QueryResult};
