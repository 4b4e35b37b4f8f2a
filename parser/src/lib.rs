//! Canopy Parser
//!
//! This crate provides parsing for the textual query dialect:
//! - Path parsing (`MATCH (quant, name)->(quant, name)->...`)
//! - Predicate parsing (`WHERE p."time" > 5 AND q."name" =~ "mpi_.*"`)
//! - Error handling with location information

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::*;
pub use error::*;
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{parse_query, Parser};
