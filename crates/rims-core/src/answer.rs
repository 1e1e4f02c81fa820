//! Answer model: the tagged answer variant, grading domains and candidate
//! sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RimsError};
use crate::symbolic::Expr;

/// Marker used by upstream tooling for an answer that could not be produced.
pub const INVALID_ANSWER: &str = "[invalidanswer]";

/// Selects which normalization and equivalence rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Word problems with plain numeric answers.
    Arithmetic,
    /// Competition-style answers compared as LaTeX expressions.
    SymbolicExpression,
    /// Science-course answers: numbers with units, expressions or equations.
    SymbolicEquationOrExpression,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Arithmetic => "arithmetic",
            Domain::SymbolicExpression => "symbolic_expression",
            Domain::SymbolicEquationOrExpression => "symbolic_equation_or_expression",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = RimsError;

    /// Accepts the canonical names plus the dataset names they stand for.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "arithmetic" | "gsm" | "gsm8k" | "svamp" => Ok(Domain::Arithmetic),
            "symbolic_expression" | "math" => Ok(Domain::SymbolicExpression),
            "symbolic_equation_or_expression" | "ocw" => Ok(Domain::SymbolicEquationOrExpression),
            _ => Err(RimsError::UnknownDomain(s.to_string())),
        }
    }
}

/// A parsed equation, kept with the text it was parsed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equation {
    pub lhs: Expr,
    pub rhs: Expr,
    pub text: String,
}

impl PartialEq for Equation {
    fn eq(&self, other: &Self) -> bool {
        self.lhs == other.lhs && self.rhs == other.rhs
    }
}

/// A normalized answer.
///
/// Comparison across variants is always "not equal", and [`Answer::Invalid`]
/// is not equal to anything, itself included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Numeric(f64),
    Symbolic(String),
    Equation(Equation),
    Invalid,
}

impl Answer {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Answer::Invalid)
    }

    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Answer::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Answer::Numeric(_) => "numeric",
            Answer::Symbolic(_) => "symbolic",
            Answer::Equation(_) => "equation",
            Answer::Invalid => "invalid",
        }
    }
}

impl PartialEq for Answer {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Answer::Numeric(a), Answer::Numeric(b)) => a == b,
            (Answer::Symbolic(a), Answer::Symbolic(b)) => a == b,
            (Answer::Equation(a), Answer::Equation(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Numeric(v) => write!(f, "{v}"),
            Answer::Symbolic(s) => f.write_str(s),
            Answer::Equation(eq) => f.write_str(&eq.text),
            Answer::Invalid => f.write_str(INVALID_ANSWER),
        }
    }
}

/// An ordered, non-empty list of candidate answers for one query.
///
/// Order is significant: consensus tie-breaks favour earlier candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSet {
    domain: Domain,
    candidates: Vec<Answer>,
}

impl CandidateSet {
    pub fn new(domain: Domain, candidates: Vec<Answer>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(RimsError::EmptyCandidateSet);
        }
        Ok(Self { domain, candidates })
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn candidates(&self) -> &[Answer] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
