//! Normalizer: raw answer text to a canonical [`Answer`].
//!
//! Normalization never fails; text that cannot be read as the answer kind a
//! domain expects becomes [`Answer::Invalid`].

pub mod braces;
pub mod equation;
pub mod extract;
pub mod numeric;
pub mod tex;

pub use equation::normalize_equation;
pub use extract::{extract_cot_answer, extract_last_number, parse_num_from_answer};
pub use numeric::{normalize_numeric, parse_number};
pub use tex::normalize_final_answer;

use crate::answer::{Answer, Domain, INVALID_ANSWER};

/// Stateless, domain-specific normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    domain: Domain,
}

impl Normalizer {
    pub fn new(domain: Domain) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Normalizes raw answer text.
    ///
    /// - arithmetic: a float or `Invalid`;
    /// - symbolic expression: the normalized LaTeX string;
    /// - symbolic equation or expression: a number if the text reads as one
    ///   (after unit stripping), else an equation when it contains `=`, else
    ///   the normalized LaTeX string.
    pub fn normalize(&self, raw: &str) -> Answer {
        if raw.trim() == INVALID_ANSWER {
            return Answer::Invalid;
        }
        match self.domain {
            Domain::Arithmetic => match normalize_numeric(raw, Domain::Arithmetic) {
                Some(v) => Answer::Numeric(v),
                None => Answer::Invalid,
            },
            Domain::SymbolicExpression => symbolic_or_invalid(normalize_final_answer(raw)),
            Domain::SymbolicEquationOrExpression => self.dispatch(raw),
        }
    }

    /// Normalizes an optional candidate; a missing one is `Invalid`.
    pub fn normalize_opt(&self, raw: Option<&str>) -> Answer {
        raw.map_or(Answer::Invalid, |r| self.normalize(r))
    }

    fn dispatch(&self, raw: &str) -> Answer {
        if let Some(v) = normalize_numeric(raw, self.domain) {
            return Answer::Numeric(v);
        }
        if raw.contains('=') {
            return normalize_equation(raw);
        }
        let text = normalize_final_answer(raw);
        // Normalization can expose a number that was wrapped in markup.
        if let Some(v) = normalize_numeric(&text, self.domain) {
            return Answer::Numeric(v);
        }
        symbolic_or_invalid(text)
    }
}

fn symbolic_or_invalid(text: String) -> Answer {
    if text.is_empty() || text == INVALID_ANSWER {
        Answer::Invalid
    } else {
        Answer::Symbolic(text)
    }
}
