use std::sync::Arc;

use rims_core::{Answer, Domain, Normalizer};
use rims_exec::{CodeAnswerExtractor, ExecValue, ExecutionFailure, ScriptedRunner};
use rims_reflect::{AttemptResolver, Method};

const PAL_CODE: &str = "def solution():\n    return 3 + 4";
const P2C_CODE: &str = "def solution():\n    total = 3 * 4\n    return total";

fn transcript() -> String {
    format!(
        "`Method`: pal\n`Attempt 1`: ```python\n{PAL_CODE}\n```\n`Answer 1`: 7\n\
         `Evaluation`: Wrong\n`Mistakes`: Added instead of multiplying.\n\
         `Hint for a better Method choice`: Plan first.\n\
         `Workaround Method`: plan-and-then-code\n`Attempt 2`: ```python\n{P2C_CODE}\n```\n\
         `Answer 2`: 12"
    )
}

fn resolver(runner: ScriptedRunner, domain: Domain) -> (AttemptResolver, Arc<ScriptedRunner>) {
    let runner = Arc::new(runner);
    let extractor = CodeAnswerExtractor::new(runner.clone());
    (AttemptResolver::new(domain, extractor), runner)
}

#[tokio::test]
async fn test_workaround_transcript_runs_code_attempts() {
    let (resolver, runner) = resolver(
        ScriptedRunner::new()
            .with(PAL_CODE, Ok(ExecValue::Number(7.0)))
            .with(P2C_CODE, Ok(ExecValue::Number(12.0))),
        Domain::Arithmetic,
    );
    let outcome = resolver.resolve(&transcript()).await;

    assert_eq!(outcome.good_method(), Some(&Method::P2c));
    assert_eq!(outcome.good_answer(), Some(&Answer::Numeric(12.0)));
    assert_eq!(outcome.bad_methods(), vec![&Method::Pal]);
    assert_eq!(outcome.bad.len(), 1);
    assert_eq!(outcome.bad[0].answer, Answer::Numeric(7.0));
    assert_eq!(outcome.bad[0].declared_answer.as_deref(), Some("7"));
    let flags: Vec<bool> = outcome.attempts().map(|a| a.is_good).collect();
    assert_eq!(flags, vec![false, true]);
    assert_eq!(outcome.mistakes, vec!["Added instead of multiplying."]);
    assert_eq!(outcome.hints, vec!["Plan first."]);
    assert_eq!(outcome.did_reflect, 1);
    assert!(outcome.lengths_consistent);
    assert_eq!(runner.calls(), vec![P2C_CODE, PAL_CODE]);
}

#[tokio::test]
async fn test_method_only_transcript_resolves_cot() {
    let (resolver, runner) = resolver(ScriptedRunner::new(), Domain::Arithmetic);
    let outcome = resolver.resolve("`Method`: cot").await;

    assert_eq!(outcome.good_method(), Some(&Method::Cot));
    assert!(outcome.bad_methods().is_empty());
    assert_eq!(outcome.good_answer(), Some(&Answer::Invalid));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_cot_attempts_use_declared_answer() {
    let (resolver, runner) = resolver(ScriptedRunner::new(), Domain::Arithmetic);
    let outcome = resolver
        .resolve("`Method`: Chain of Thought\n`Attempt 1`: 1,200 plus 34 is 1,234.\n`Answer 1`: The answer is 1,234.")
        .await;

    assert_eq!(outcome.good_answer(), Some(&Answer::Numeric(1234.0)));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_execution_failure_yields_invalid_answer() {
    let (resolver, _) = resolver(
        ScriptedRunner::new().with(PAL_CODE, Err(ExecutionFailure::Timeout { limit_ms: 3000 })),
        Domain::Arithmetic,
    );
    let outcome = resolver
        .resolve(&format!("`Method`: pal\n`Attempt 1`: {PAL_CODE}\n`Answer 1`: 7"))
        .await;

    assert_eq!(outcome.good_answer(), Some(&Answer::Invalid));
    assert_eq!(outcome.good.unwrap().declared_answer.as_deref(), Some("7"));
}

#[tokio::test]
async fn test_unknown_method_with_return_runs_code() {
    let (resolver, runner) = resolver(
        ScriptedRunner::new().with(PAL_CODE, Ok(ExecValue::Text("\\frac{7}{1}".into()))),
        Domain::SymbolicExpression,
    );
    let outcome = resolver
        .resolve(&format!("`Method`: tree search\n`Attempt 1`: {PAL_CODE}\n`Answer 1`: 7"))
        .await;

    assert_eq!(
        outcome.good_method(),
        Some(&Method::Unknown("tree search".into()))
    );
    let expected = Normalizer::new(Domain::SymbolicExpression).normalize("\\frac{7}{1}");
    assert_eq!(outcome.good_answer(), Some(&expected));
    assert_eq!(runner.calls(), vec![PAL_CODE]);
}

#[tokio::test]
async fn test_informational_transcript_resolves_nothing() {
    let (resolver, _) = resolver(ScriptedRunner::new(), Domain::Arithmetic);
    let outcome = resolver.resolve("`Evaluation`: Correct").await;
    assert!(outcome.good.is_none());
    assert!(outcome.bad.is_empty());
    assert_eq!(outcome.did_reflect, 0);
}

#[tokio::test]
async fn test_outcome_serializes_for_reporting() {
    let (resolver, _) = resolver(
        ScriptedRunner::new().with(PAL_CODE, Ok(ExecValue::Number(7.0))),
        Domain::Arithmetic,
    );
    let outcome = resolver
        .resolve(&format!("`Method`: pal\n`Attempt 1`: {PAL_CODE}\n`Answer 1`: 7"))
        .await;
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["good"]["method"], "pal");
    assert_eq!(json["good"]["answer"]["kind"], "numeric");
    assert_eq!(json["good"]["is_good"], true);
    assert_eq!(json["lengths_consistent"], true);
}

#[test]
fn test_records_link_attempts_to_methods() {
    let (resolver, _) = resolver(ScriptedRunner::new(), Domain::Arithmetic);
    let result = resolver.records(&transcript());

    let methods: Vec<(u32, Option<&str>, bool)> = result
        .attempts
        .iter()
        .map(|r| (r.index, r.declared_method_text.as_deref(), r.is_workaround))
        .collect();
    assert_eq!(
        methods,
        vec![(1, Some("pal"), false), (2, Some("plan-and-then-code"), true)]
    );
    assert_eq!(result.attempts[1].solution_text.as_deref(), Some(P2C_CODE));
    assert_eq!(result.attempts[0].declared_answer_text.as_deref(), Some("7"));
    assert_eq!(result.mistakes, vec!["Added instead of multiplying."]);
}
