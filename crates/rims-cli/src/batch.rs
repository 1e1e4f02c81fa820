//! Batch grading of JSONL records.
//!
//! Each non-blank input line is one record:
//!
//! ```json
//! {"candidates": ["42", 42.0, null], "ground_truth": "42", "domain": "arithmetic"}
//! ```
//!
//! Records are graded concurrently and reported in input order. A record
//! that cannot be graded is logged and listed in `failed_indices`; the rest of
//! the batch carries on.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{Instrument, Span};
use uuid::Uuid;

use rims_core::{obs, Answer, Consensus, ConsensusAggregator, Domain, GraderConfig};

#[derive(Debug, Deserialize)]
struct GradeRecord {
    candidates: Vec<Value>,
    ground_truth: Value,
    domain: String,
}

/// Grading result of one record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    /// Zero-based input line number.
    pub index: usize,
    pub domain: Domain,
    pub consensus: Consensus,
    pub ground_truth: Answer,
    pub correct: bool,
}

/// Summary of a batch run.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    /// SHA-256 of the raw input, hex encoded.
    pub input_digest: String,
    pub total: usize,
    pub graded: usize,
    pub correct: usize,
    pub no_consensus: usize,
    pub failed_indices: Vec<usize>,
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// JSON values as candidate text: strings verbatim, `null` as missing,
/// anything else in its JSON form.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Grades one JSONL line.
///
/// An ambiguous consensus is correct when any of its answers matches the
/// ground truth.
pub fn grade_record(index: usize, line: &str, config: &GraderConfig) -> Result<RecordOutcome> {
    let record: GradeRecord = serde_json::from_str(line).context("malformed record")?;
    let domain: Domain = record.domain.parse()?;

    let aggregator = ConsensusAggregator::new(config.checker_for(domain));
    let candidates: Vec<Option<String>> = record.candidates.iter().map(value_text).collect();
    let consensus = aggregator.aggregate_raw(&candidates)?;

    let checker = aggregator.checker();
    let ground_truth = checker
        .normalizer()
        .normalize_opt(value_text(&record.ground_truth).as_deref());
    let correct = consensus
        .answers()
        .into_iter()
        .any(|answer| checker.is_equiv(answer, &ground_truth));

    Ok(RecordOutcome {
        index,
        domain,
        consensus,
        ground_truth,
        correct,
    })
}

/// Grades every record of `input`, at most `concurrency` at a time.
pub async fn grade_batch(input: &str, config: &GraderConfig, concurrency: usize) -> BatchReport {
    let run_id = Uuid::new_v4().to_string();
    let span = obs::batch_span(&run_id);
    grade_lines(run_id, input, config, concurrency)
        .instrument(span)
        .await
}

async fn grade_lines(
    run_id: String,
    input: &str,
    config: &GraderConfig,
    concurrency: usize,
) -> BatchReport {
    let started_at = Utc::now();
    let clock = Instant::now();
    let input_digest = hex::encode(Sha256::digest(input.as_bytes()));

    let records: Vec<(usize, String)> = input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| (index, line.to_string()))
        .collect();
    let total = records.len();

    // Grading is CPU-bound; each record runs on the blocking pool.
    let results: Vec<(usize, Result<RecordOutcome>)> = stream::iter(records)
        .map(|(index, line)| {
            let config = config.clone();
            let span = Span::current();
            async move {
                let graded = tokio::task::spawn_blocking(move || {
                    span.in_scope(|| grade_record(index, &line, &config))
                })
                .await
                .map_err(anyhow::Error::from)
                .and_then(|result| result);
                (index, graded)
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut report = BatchReport {
        run_id,
        started_at,
        input_digest,
        total,
        graded: 0,
        correct: 0,
        no_consensus: 0,
        failed_indices: Vec::new(),
        outcomes: Vec::with_capacity(total),
    };
    for (index, result) in results {
        match result {
            Ok(outcome) => {
                report.graded += 1;
                report.correct += usize::from(outcome.correct);
                report.no_consensus += usize::from(outcome.consensus.is_none());
                report.outcomes.push(outcome);
            }
            Err(err) => {
                obs::emit_record_failed(index, &format!("{err:#}"));
                report.failed_indices.push(index);
            }
        }
    }

    obs::emit_batch_finished(
        &report.run_id,
        report.total,
        report.correct,
        report.failed_indices.len(),
        clock.elapsed().as_millis() as u64,
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH: &str = r#"{"candidates": ["42", 42.0, "43"], "ground_truth": "42", "domain": "arithmetic"}
{"candidates": [3.0, 4.0, 5.0], "ground_truth": 3, "domain": "gsm"}
not json

{"candidates": [], "ground_truth": "1", "domain": "arithmetic"}
{"candidates": ["x+1", "1+x", "y"], "ground_truth": "x+1", "domain": "math"}
{"candidates": ["1"], "ground_truth": "1", "domain": "geometry"}
{"candidates": [null, null], "ground_truth": "7", "domain": "arithmetic"}
"#;

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&Value::Null), None);
        assert_eq!(value_text(&serde_json::json!("3/4")).as_deref(), Some("3/4"));
        assert_eq!(value_text(&serde_json::json!(42)).as_deref(), Some("42"));
        assert_eq!(value_text(&serde_json::json!(2.5)).as_deref(), Some("2.5"));
    }

    #[test]
    fn test_grade_record_majority() {
        let outcome = grade_record(
            0,
            r#"{"candidates": ["42", "42.0", "43"], "ground_truth": "42", "domain": "arithmetic"}"#,
            &GraderConfig::default(),
        )
        .unwrap();
        assert_eq!(outcome.consensus, Consensus::Agreed(Answer::Numeric(42.0)));
        assert!(outcome.correct);
    }

    #[test]
    fn test_grade_record_wrong_consensus() {
        let outcome = grade_record(
            0,
            r#"{"candidates": ["5", "5", "6"], "ground_truth": "6", "domain": "arithmetic"}"#,
            &GraderConfig::default(),
        )
        .unwrap();
        assert!(!outcome.correct);
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let report = grade_batch(BATCH, &GraderConfig::default(), 3).await;

        assert_eq!(report.total, 7);
        assert_eq!(report.failed_indices, vec![2, 4, 6]);
        assert_eq!(report.graded, 4);
        assert_eq!(report.correct, 2);
        assert_eq!(report.no_consensus, 2);

        let indices: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 5, 7]);
        assert_eq!(report.input_digest.len(), 64);
        assert!((report.accuracy() - 2.0 / 7.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = grade_batch("", &GraderConfig::default(), 1).await;
        assert_eq!(report.total, 0);
        assert!(report.outcomes.is_empty());
        assert_eq!(report.accuracy(), 0.0);
        assert_eq!(
            report.input_digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
