//! Runs the built `rims` binary end to end.

use std::process::Command;

fn rims() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rims"))
}

#[test]
fn test_grade_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("batch.jsonl");
    let output = dir.path().join("report.json");
    std::fs::write(
        &input,
        "{\"candidates\": [\"3.0\", \"3.0\", \"5.0\"], \"ground_truth\": \"3\", \"domain\": \"arithmetic\"}\n\
         {\"candidates\": [\"3.0\", \"4.0\", \"5.0\"], \"ground_truth\": \"3\", \"domain\": \"arithmetic\"}\n\
         {broken\n",
    )
    .unwrap();

    let status = rims()
        .arg("grade")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .status()
        .unwrap();
    assert!(status.success());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(report["total"], 3);
    assert_eq!(report["correct"], 1);
    assert_eq!(report["no_consensus"], 1);
    assert_eq!(report["failed_indices"], serde_json::json!([2]));
    assert_eq!(report["outcomes"][0]["consensus"]["status"], "agreed");
}

#[test]
fn test_equiv_prints_verdict() {
    let out = rims()
        .args(["equiv", "\\frac{1}{2}", "0.5", "--domain", "ocw"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let verdict: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(verdict["equivalent"], true);
}

#[test]
fn test_resolve_plan_only() {
    let dir = tempfile::tempdir().unwrap();
    let transcript = dir.path().join("transcript.txt");
    std::fs::write(&transcript, "`Method`: cot").unwrap();

    let out = rims()
        .arg("resolve")
        .arg(&transcript)
        .arg("--plan-only")
        .output()
        .unwrap();
    assert!(out.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(plan["good_method"], "cot");
    assert_eq!(plan["bad_methods"], serde_json::json!([]));
}

#[test]
fn test_missing_config_fails() {
    let out = rims()
        .args(["--config", "/nonexistent/rims.toml", "equiv", "1", "1"])
        .output()
        .unwrap();
    assert!(!out.status.success());
}
