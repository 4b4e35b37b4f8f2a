//! Canopy Pattern
//!
//! Path patterns over call graphs and the query algebra built on them.
//!
//! Responsibilities:
//! - Represent patterns as ordered (quantifier, predicate) elements
//! - Evaluate predicates against per-node metric rows
//! - Compile the structured and textual dialects into patterns
//! - Combine queries with set operations (AND/OR/XOR/NOT)

mod compound;
mod error;
mod object;
mod pattern;
mod predicate;
mod string;

pub use compound::{CompoundQuery, Query, SetOp};
pub use error::{PatternError, PatternResult};
pub use object::{compile_object_dialect, AttrFilter, FilterValue, PathElement};
pub use pattern::{Pattern, PatternElement, QuantSpec, Quantifier};
pub use predicate::{Check, CmpOp, Field, Predicate, RowContext};
pub use string::compile_string_dialect;
