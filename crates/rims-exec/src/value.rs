use std::fmt;

use serde::{Deserialize, Serialize};

use rims_core::{Answer, Normalizer};

/// What a piece of generated code evaluated to.
///
/// Anything `float()` accepts arrives as a number; everything else, including
/// algebraic objects already rendered to LaTeX, as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecValue {
    Number(f64),
    Text(String),
}

impl ExecValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Normalizes the value as an answer of the normalizer's domain.
    pub fn to_answer(&self, normalizer: &Normalizer) -> Answer {
        normalizer.normalize(&self.to_string())
    }
}

impl fmt::Display for ExecValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}
