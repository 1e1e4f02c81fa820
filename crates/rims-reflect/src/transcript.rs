//! Parsing of reflection transcripts.
//!
//! A transcript is model output made of fields:
//!
//! ````text
//! `Method`: pal
//! `Attempt 1`: ```python
//! def solution():
//!     return 3
//! ```
//! `Answer 1`: 3
//! `Evaluation`: Wrong
//! `Mistakes`: ...
//! `Workaround Method`: cot
//! ```
//!
//! A value runs from its marker to the next line that opens a field with a
//! capitalized name (a fence closing just before that line is dropped), or to
//! the end of the text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static FIELD_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]*?)`:").expect("field marker regex"));

static VALUE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:```)?\n`[A-Z]").expect("value end regex"));

static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Attempt|Answer)(?:\s+(\d+))?$").expect("numbered field regex"));

const FENCE: &str = "```";

const IGNORED: &str = "Evaluation";
const METHOD: &str = "Method";
const WORKAROUND_METHOD: &str = "Workaround Method";
const MISTAKES: &str = "Mistakes";
const HINT: &str = "Hint for a better Method choice";

/// Fields recovered from a transcript. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTranscript {
    /// `Attempt N` solutions by attempt number.
    pub attempts: BTreeMap<u32, String>,
    /// `Answer N` declared answers by attempt number.
    pub answers: BTreeMap<u32, String>,
    pub methods: Vec<String>,
    pub workaround_methods: Vec<String>,
    pub mistakes: Vec<String>,
    pub hints: Vec<String>,
    /// Any other field, first occurrence only.
    pub other: BTreeMap<String, String>,
    /// The method in force when each attempt number first appeared.
    pub attempt_methods: BTreeMap<u32, DeclaredMethod>,
}

/// A `Method` or `Workaround Method` value as declared in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredMethod {
    pub text: String,
    pub is_workaround: bool,
}

/// One attempt: a solution, its declared answer and the method it was
/// written under. Any part may be missing from the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub index: u32,
    pub solution_text: Option<String>,
    pub declared_method_text: Option<String>,
    pub declared_answer_text: Option<String>,
    pub is_workaround: bool,
}

/// Attempts in index order plus the reflection notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptParseResult {
    pub attempts: Vec<AttemptRecord>,
    pub mistakes: Vec<String>,
    pub hints: Vec<String>,
}

impl ParsedTranscript {
    /// True when no recognizable field was found.
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
            && self.answers.is_empty()
            && self.methods.is_empty()
            && self.workaround_methods.is_empty()
            && self.mistakes.is_empty()
            && self.hints.is_empty()
            && self.other.is_empty()
    }

    /// Attempt records for every attempt or answer number, in index order.
    pub fn records(&self) -> Vec<AttemptRecord> {
        let mut indices: Vec<u32> = self.attempts.keys().chain(self.answers.keys()).copied().collect();
        indices.sort_unstable();
        indices.dedup();
        indices
            .into_iter()
            .map(|index| {
                let method = self.attempt_methods.get(&index);
                AttemptRecord {
                    index,
                    solution_text: self.attempts.get(&index).cloned(),
                    declared_method_text: method.map(|m| m.text.clone()),
                    declared_answer_text: self.answers.get(&index).cloned(),
                    is_workaround: method.is_some_and(|m| m.is_workaround),
                }
            })
            .collect()
    }

    pub fn to_result(&self) -> TranscriptParseResult {
        TranscriptParseResult {
            attempts: self.records(),
            mistakes: self.mistakes.clone(),
            hints: self.hints.clone(),
        }
    }

    fn insert_first(&mut self, name: &str, value: String, method: Option<&DeclaredMethod>) {
        if let Some(caps) = NUMBERED.captures(name) {
            // A bare `Attempt`/`Answer` counts as number 0.
            let number = caps
                .get(2)
                .and_then(|n| n.as_str().parse::<u32>().ok())
                .unwrap_or(0);
            let slot = if &caps[1] == "Attempt" {
                &mut self.attempts
            } else {
                &mut self.answers
            };
            slot.entry(number).or_insert(value);
            if let Some(method) = method {
                self.attempt_methods
                    .entry(number)
                    .or_insert_with(|| method.clone());
            }
        } else {
            self.other.entry(name.to_string()).or_insert(value);
        }
    }

    fn repeatable(&mut self, name: &str) -> Option<&mut Vec<String>> {
        match name {
            METHOD => Some(&mut self.methods),
            WORKAROUND_METHOD => Some(&mut self.workaround_methods),
            MISTAKES => Some(&mut self.mistakes),
            HINT => Some(&mut self.hints),
            _ => None,
        }
    }
}

/// Splits transcripts into fields. Never fails: malformed text gives a
/// sparser result.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscriptParser;

impl TranscriptParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, text: &str) -> ParsedTranscript {
        let mut parsed = ParsedTranscript::default();
        // A marker inside an earlier value is part of that value.
        let mut consumed = 0;
        let mut current_method: Option<DeclaredMethod> = None;

        for caps in FIELD_MARKER.captures_iter(text) {
            let (Some(marker), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str().trim();
            if name.is_empty() || marker.start() < consumed {
                continue;
            }

            let (value, end) = field_value(text, marker.end());
            consumed = end;
            if name == IGNORED {
                continue;
            }

            let value = if NUMBERED.captures(name).is_some_and(|c| &c[1] == "Attempt") {
                clean_attempt(value)
            } else {
                value.trim().to_string()
            };

            if name == METHOD || name == WORKAROUND_METHOD {
                current_method = Some(DeclaredMethod {
                    text: value.clone(),
                    is_workaround: name == WORKAROUND_METHOD,
                });
            }
            match parsed.repeatable(name) {
                Some(list) => list.push(value),
                None => parsed.insert_first(name, value, current_method.as_ref()),
            }
        }
        parsed
    }
}

/// The value starting at `start`, and the offset where it ends.
fn field_value(text: &str, start: usize) -> (&str, usize) {
    let rest = &text[start..];
    let skipped = rest.len() - rest.trim_start().len();
    let mut begin = start + skipped;
    if text[begin..].starts_with(FENCE) {
        begin += FENCE.len();
    }
    let end = VALUE_END
        .find(&text[begin..])
        .map_or(text.len(), |m| begin + m.start());
    (&text[begin..end], end)
}

/// Drops a leftover closing fence and a leading language tag.
fn clean_attempt(value: &str) -> String {
    let mut value = value.trim();
    if let Some(stripped) = value.strip_suffix(FENCE) {
        value = stripped.trim_end();
    }
    for tag in ["python\n", "python3\n", "py\n"] {
        if let Some(stripped) = value.strip_prefix(tag) {
            value = stripped;
            break;
        }
    }
    value.trim().to_string()
}
