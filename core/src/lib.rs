//! Canopy Core Types
//!
//! This crate provides the foundational types used throughout Canopy:
//! - Identity types (NodeId)
//! - Metric value types (the Value enum)

mod id;
mod value;

pub use id::*;
pub use value::*;
