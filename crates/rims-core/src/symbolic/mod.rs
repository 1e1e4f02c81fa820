//! A small symbolic-algebra engine for deciding whether two LaTeX answers
//! denote the same mathematical object.
//!
//! The pipeline is parse -> canonicalize -> (structural match | numeric
//! probing). Every stage is total: malformed input surfaces as a
//! [`SymbolicError`] rather than a panic, and long-running work observes a
//! cooperative [`Deadline`](crate::worker::Deadline).

pub mod canonical;
pub mod eval;
pub mod expr;
pub mod parser;
pub mod simplify;

pub use canonical::canonicalize;
pub use eval::{evaluate, evaluate_const};
pub use expr::{Constant, Expr, Func};
pub use parser::{parse, parse_expr, Parsed};
pub use simplify::{difference_is_zero, equations_match};

use thiserror::Error;

/// Errors raised by the symbolic engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SymbolicError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("expression has free symbols: {0}")]
    FreeSymbols(String),

    #[error("expression does not evaluate to a finite number")]
    NonFinite,

    #[error("expression too large: {0} nodes")]
    TooLarge(usize),

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("symbolic comparison exceeded its time limit")]
    Timeout,

    #[error("not enough valid sample points to decide")]
    Undecidable,
}
