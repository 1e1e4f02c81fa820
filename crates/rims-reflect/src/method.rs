//! Solving-method names.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The strategy that produced an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Chain-of-thought prose.
    Cot,
    /// Program-aided language model: code written straight from the question.
    Pal,
    /// Plan-then-code: code written from a natural-language plan.
    P2c,
    /// Method text no alias matched, kept verbatim.
    Unknown(String),
}

/// Aliases in match order. Matching is on whole words of the lowercased
/// text with punctuation turned into spaces.
const ALIASES: &[(&str, Method)] = &[
    ("cot", Method::Cot),
    ("pal", Method::Pal),
    ("p2c", Method::P2c),
    ("chain of thought", Method::Cot),
    ("program aided language modeling", Method::Pal),
    ("program aided language model", Method::Pal),
    ("plan and then code", Method::P2c),
];

static SELECTION_CHOICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-C])\)").expect("selection regex"));

impl Method {
    /// Maps free-form method text onto a known method.
    pub fn canonicalize(text: &str) -> Self {
        let words: String = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();
        let padded = format!(" {} ", words.split_whitespace().collect::<Vec<_>>().join(" "));

        ALIASES
            .iter()
            .find(|(alias, _)| padded.contains(&format!(" {alias} ")))
            .map(|(_, method)| method.clone())
            .unwrap_or_else(|| Self::Unknown(text.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Cot => "cot",
            Self::Pal => "pal",
            Self::P2c => "p2c",
            Self::Unknown(text) => text,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Whether attempts by this method are code.
    pub fn writes_code(&self) -> bool {
        matches!(self, Self::Pal | Self::P2c)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads a method-selection reply: the first `(A)`, `(B)` or `(C)` picks
/// cot, pal or p2c.
pub fn parse_selection_choice(text: &str) -> Option<Method> {
    let caps = SELECTION_CHOICE.captures(text)?;
    match &caps[1] {
        "A" => Some(Method::Cot),
        "B" => Some(Method::Pal),
        "C" => Some(Method::P2c),
        _ => None,
    }
}
