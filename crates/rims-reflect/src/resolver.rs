//! Resolution of a reflection transcript into good and bad attempts.
//!
//! The attempt that ends the transcript is the good one. Which method
//! produced it depends on how far the model got:
//!
//! 1. a `Workaround Method` list: its last entry is the good method; every
//!    `Method` entry and earlier workaround is bad;
//! 2. otherwise a `Method` list: the last entry is good, earlier ones bad;
//! 3. otherwise a single-shot transcript: the last attempt is good and
//!    nothing is bad;
//! 4. no recognizable fields: nothing is resolved.
//!
//! In every case the good solution and declared answer are the last
//! `Attempt`/`Answer` entries; with reflection the earlier ones are bad.

use serde::{Deserialize, Serialize};
use tracing::warn;

use rims_core::{parse_num_from_answer, Answer, Domain, Normalizer};
use rims_exec::CodeAnswerExtractor;

use crate::method::Method;
use crate::transcript::{ParsedTranscript, TranscriptParseResult, TranscriptParser};

/// Good/bad split of a transcript, before any answer is computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub good_method: Option<Method>,
    pub good_solution: Option<String>,
    pub good_answer_text: Option<String>,
    pub bad_methods: Vec<Method>,
    pub bad_solutions: Vec<String>,
    pub bad_answer_texts: Vec<String>,
    pub mistakes: Vec<String>,
    pub hints: Vec<String>,
    /// Reflection rounds: workaround entries when present, else mistakes
    /// when resolved through the `Method` list.
    pub did_reflect: usize,
}

impl Resolution {
    /// Applies the resolution rules to parsed fields.
    pub fn from_parsed(parsed: &ParsedTranscript) -> Self {
        let (good_method, bad_methods, did_reflect, reflected) =
            if let Some((last, earlier)) = parsed.workaround_methods.split_last() {
                let mut bad = canonical(&parsed.methods);
                bad.extend(canonical(earlier));
                let rounds = parsed.workaround_methods.len();
                (Some(Method::canonicalize(last)), bad, rounds, true)
            } else if let Some((last, earlier)) = parsed.methods.split_last() {
                let rounds = parsed.mistakes.len();
                (Some(Method::canonicalize(last)), canonical(earlier), rounds, true)
            } else {
                (None, Vec::new(), 0, false)
            };

        let (good_solution, bad_solutions) = split_last(parsed.attempts.values(), reflected);
        let (good_answer_text, bad_answer_texts) = split_last(parsed.answers.values(), reflected);

        let resolution = Self {
            good_method,
            good_solution,
            good_answer_text,
            bad_methods,
            bad_solutions,
            bad_answer_texts,
            mistakes: parsed.mistakes.clone(),
            hints: parsed.hints.clone(),
            did_reflect,
        };
        if !resolution.lengths_consistent() {
            warn!(
                bad_methods = resolution.bad_methods.len(),
                bad_solutions = resolution.bad_solutions.len(),
                bad_answers = resolution.bad_answer_texts.len(),
                "bad attempt lists differ in length, possibly a repeated generation"
            );
        }
        resolution
    }

    /// Whether the bad method, solution and answer lists line up.
    pub fn lengths_consistent(&self) -> bool {
        self.bad_methods.len() == self.bad_solutions.len()
            && self.bad_solutions.len() == self.bad_answer_texts.len()
    }

    /// True when the transcript carried no attempt at all.
    pub fn is_informational(&self) -> bool {
        self.good_method.is_none() && self.good_solution.is_none() && self.good_answer_text.is_none()
    }
}

fn canonical(texts: &[String]) -> Vec<Method> {
    texts.iter().map(|text| Method::canonicalize(text)).collect()
}

fn split_last<'a>(
    values: impl Iterator<Item = &'a String>,
    keep_earlier: bool,
) -> (Option<String>, Vec<String>) {
    let mut values: Vec<String> = values.cloned().collect();
    let last = values.pop();
    if !keep_earlier {
        values.clear();
    }
    (last, values)
}

/// One attempt with its computed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAttempt {
    pub method: Option<Method>,
    pub solution: Option<String>,
    pub declared_answer: Option<String>,
    pub answer: Answer,
    /// True for the attempt that ends the transcript.
    pub is_good: bool,
}

/// A resolved transcript, ready for scoring and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub good: Option<ResolvedAttempt>,
    /// Bad attempts in transcript order. When the underlying lists differ in
    /// length the missing parts are `None`.
    pub bad: Vec<ResolvedAttempt>,
    pub mistakes: Vec<String>,
    pub hints: Vec<String>,
    pub did_reflect: usize,
    pub lengths_consistent: bool,
}

impl ResolutionOutcome {
    pub fn good_method(&self) -> Option<&Method> {
        self.good.as_ref().and_then(|attempt| attempt.method.as_ref())
    }

    pub fn bad_methods(&self) -> Vec<&Method> {
        self.bad
            .iter()
            .filter_map(|attempt| attempt.method.as_ref())
            .collect()
    }

    pub fn good_answer(&self) -> Option<&Answer> {
        self.good.as_ref().map(|attempt| &attempt.answer)
    }

    /// Every attempt in transcript order: the bad ones, then the good one.
    pub fn attempts(&self) -> impl Iterator<Item = &ResolvedAttempt> {
        self.bad.iter().chain(self.good.as_ref())
    }
}

/// Parses transcripts and computes the answer of every attempt.
#[derive(Debug, Clone)]
pub struct AttemptResolver {
    parser: TranscriptParser,
    normalizer: Normalizer,
    extractor: CodeAnswerExtractor,
}

impl AttemptResolver {
    pub fn new(domain: Domain, extractor: CodeAnswerExtractor) -> Self {
        Self {
            parser: TranscriptParser::new(),
            normalizer: Normalizer::new(domain),
            extractor,
        }
    }

    pub fn domain(&self) -> Domain {
        self.normalizer.domain()
    }

    /// Attempt records of `transcript`, in index order.
    pub fn records(&self, transcript: &str) -> TranscriptParseResult {
        self.parser.parse(transcript).to_result()
    }

    /// The good/bad split of `transcript` without running any code.
    pub fn plan(&self, transcript: &str) -> Resolution {
        Resolution::from_parsed(&self.parser.parse(transcript))
    }

    pub async fn resolve(&self, transcript: &str) -> ResolutionOutcome {
        self.resolve_plan(self.plan(transcript)).await
    }

    pub async fn resolve_plan(&self, plan: Resolution) -> ResolutionOutcome {
        let lengths_consistent = plan.lengths_consistent();

        let good = if plan.is_informational() {
            None
        } else {
            Some(
                self.resolve_attempt(
                    plan.good_method,
                    plan.good_solution,
                    plan.good_answer_text,
                    true,
                )
                .await,
            )
        };

        let rounds = plan
            .bad_methods
            .len()
            .max(plan.bad_solutions.len())
            .max(plan.bad_answer_texts.len());
        let mut methods = plan.bad_methods.into_iter();
        let mut solutions = plan.bad_solutions.into_iter();
        let mut answers = plan.bad_answer_texts.into_iter();
        let mut bad = Vec::with_capacity(rounds);
        for _ in 0..rounds {
            bad.push(
                self.resolve_attempt(methods.next(), solutions.next(), answers.next(), false)
                    .await,
            );
        }

        ResolutionOutcome {
            good,
            bad,
            mistakes: plan.mistakes,
            hints: plan.hints,
            did_reflect: plan.did_reflect,
            lengths_consistent,
        }
    }

    /// cot attempts use the declared answer; pal/p2c attempts, and attempts
    /// of unknown method whose solution returns a value, are executed.
    async fn resolve_attempt(
        &self,
        method: Option<Method>,
        solution: Option<String>,
        declared_answer: Option<String>,
        is_good: bool,
    ) -> ResolvedAttempt {
        let run_code = match &method {
            Some(Method::Cot) => false,
            Some(m) if m.writes_code() => true,
            _ => solution.as_deref().is_some_and(|s| s.contains("return ")),
        };

        let answer = if run_code {
            match solution.as_deref() {
                Some(code) => self.extractor.extract_answer(code, &self.normalizer).await,
                None => Answer::Invalid,
            }
        } else {
            declared_answer
                .as_deref()
                .map_or(Answer::Invalid, |text| self.declared(text))
        };

        ResolvedAttempt {
            method,
            solution,
            declared_answer,
            answer,
            is_good,
        }
    }

    fn declared(&self, text: &str) -> Answer {
        match self.normalizer.domain() {
            Domain::Arithmetic => parse_num_from_answer(text).map_or(Answer::Invalid, Answer::Numeric),
            Domain::SymbolicExpression | Domain::SymbolicEquationOrExpression => {
                self.normalizer.normalize(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(text: &str) -> Resolution {
        Resolution::from_parsed(&TranscriptParser::new().parse(text))
    }

    #[test]
    fn test_method_only_transcript() {
        let resolution = plan("`Method`: cot");
        assert_eq!(resolution.good_method, Some(Method::Cot));
        assert!(resolution.bad_methods.is_empty());
        assert_eq!(resolution.good_solution, None);
        assert!(resolution.lengths_consistent());
    }

    #[test]
    fn test_workaround_rule() {
        let resolution = plan(
            "`Method`: pal\n`Attempt 1`: a1\n`Answer 1`: 1\n`Mistakes`: m1\n\
             `Workaround Method`: p2c\n`Attempt 2`: a2\n`Answer 2`: 2\n`Mistakes`: m2\n\
             `Workaround Method`: cot\n`Attempt 3`: a3\n`Answer 3`: 3",
        );
        assert_eq!(resolution.good_method, Some(Method::Cot));
        assert_eq!(resolution.bad_methods, vec![Method::Pal, Method::P2c]);
        assert_eq!(resolution.good_solution.as_deref(), Some("a3"));
        assert_eq!(resolution.good_answer_text.as_deref(), Some("3"));
        assert_eq!(resolution.bad_solutions, vec!["a1", "a2"]);
        assert_eq!(resolution.bad_answer_texts, vec!["1", "2"]);
        assert_eq!(resolution.mistakes, vec!["m1", "m2"]);
        assert_eq!(resolution.did_reflect, 2);
        assert!(resolution.lengths_consistent());
    }

    #[test]
    fn test_method_list_rule_counts_mistakes() {
        let resolution = plan(
            "`Method`: cot\n`Attempt 1`: a1\n`Answer 1`: 1\n`Mistakes`: wrong sum\n\
             `Method`: pal\n`Attempt 2`: a2\n`Answer 2`: 2",
        );
        assert_eq!(resolution.good_method, Some(Method::Pal));
        assert_eq!(resolution.bad_methods, vec![Method::Cot]);
        assert_eq!(resolution.bad_solutions, vec!["a1"]);
        assert_eq!(resolution.did_reflect, 1);
    }

    #[test]
    fn test_single_shot_rule() {
        let resolution = plan("`Attempt 1`: 2 + 2 = 4\n`Answer 1`: 4");
        assert_eq!(resolution.good_method, None);
        assert_eq!(resolution.good_solution.as_deref(), Some("2 + 2 = 4"));
        assert!(resolution.bad_solutions.is_empty());
        assert_eq!(resolution.did_reflect, 0);
        assert!(!resolution.is_informational());
    }

    #[test]
    fn test_informational_transcript() {
        let resolution = plan("`Evaluation`: Correct");
        assert!(resolution.is_informational());
        assert_eq!(resolution, Resolution::default());
    }

    #[test]
    fn test_length_mismatch_is_reported_not_fatal() {
        let resolution = plan(
            "`Method`: pal\n`Attempt 1`: a1\n`Attempt 2`: a1 again\n`Answer 1`: 1\n\
             `Method`: cot\n`Attempt 3`: a3\n`Answer 3`: 3",
        );
        assert_eq!(resolution.bad_solutions.len(), 2);
        assert_eq!(resolution.bad_answer_texts.len(), 1);
        assert!(!resolution.lengths_consistent());
        assert_eq!(resolution.good_solution.as_deref(), Some("a3"));
    }
}
