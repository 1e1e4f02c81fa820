//! End-to-end runs against a real interpreter. Each test returns early when
//! `python3` is not installed.

use std::time::{Duration, Instant};

use rims_core::{Answer, Domain, ExecConfig, Normalizer};
use rims_exec::{CodeAnswerExtractor, CodeRunner, ExecValue, ExecutionFailure, PythonRunner};

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn runner() -> PythonRunner {
    PythonRunner::new(ExecConfig::default())
}

#[tokio::test]
async fn test_solution_function_return_value() {
    if !python_available() {
        return;
    }
    let code = "```python\ndef solution():\n    \"\"\"Tom has 3 bags of 14 apples.\"\"\"\n    bags = 3\n    apples = bags * 14\n    print(apples)\n    return apples\n```";
    assert_eq!(runner().run(code).await, Ok(ExecValue::Number(42.0)));
}

#[tokio::test]
async fn test_other_entry_function_and_preloaded_modules() {
    if !python_available() {
        return;
    }
    let code = "def compute():\n    return math.factorial(5) + Fraction(1, 2)\n";
    assert_eq!(runner().run(code).await, Ok(ExecValue::Number(120.5)));
}

#[tokio::test]
async fn test_script_fallback_reads_result_variable() {
    if !python_available() {
        return;
    }
    let code = "x = 10\nanswer = x * 3\nprint('answer is', answer)";
    assert_eq!(runner().run(code).await, Ok(ExecValue::Number(30.0)));
}

#[tokio::test]
async fn test_defaulted_parameters_and_parens_in_printed_text() {
    if !python_available() {
        return;
    }
    let code = "def solution(n=4, rate=0.5):\n    print(\"Total (before tax\")\n    total = n * 10\n    return total * (1 + rate)\n";
    assert_eq!(runner().run(code).await, Ok(ExecValue::Number(60.0)));
}

#[tokio::test]
async fn test_input_does_not_block() {
    if !python_available() {
        return;
    }
    let code = "def solution():\n    name = input('name? ')\n    return len(name) + 7\n";
    assert_eq!(runner().run(code).await, Ok(ExecValue::Number(7.0)));
}

#[tokio::test]
async fn test_text_results_stay_text() {
    if !python_available() {
        return;
    }
    let code = "def solution():\n    return 'x + 1'\n";
    assert_eq!(runner().run(code).await, Ok(ExecValue::Text("x + 1".into())));
}

#[tokio::test]
async fn test_exceptions_are_runtime_failures() {
    if !python_available() {
        return;
    }
    let err = runner()
        .run("def solution():\n    return 1 / 0\n")
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionFailure::Runtime(ref msg) if msg.starts_with("ZeroDivisionError")));

    let err = runner().run("def solution(:\n    return 1\n").await.unwrap_err();
    assert!(matches!(err, ExecutionFailure::Runtime(ref msg) if msg.starts_with("SyntaxError")));
}

#[tokio::test]
async fn test_no_value_is_no_answer() {
    if !python_available() {
        return;
    }
    assert_eq!(
        runner().run("x = 5\n").await,
        Err(ExecutionFailure::NoAnswer)
    );
}

#[tokio::test]
async fn test_non_terminating_code_times_out() {
    if !python_available() {
        return;
    }
    let runner = PythonRunner::new(ExecConfig {
        timeout_ms: 300,
        ..ExecConfig::default()
    });
    let started = Instant::now();
    let result = runner
        .run("def solution():\n    while True:\n        pass\n")
        .await;
    assert_eq!(result, Err(ExecutionFailure::Timeout { limit_ms: 300 }));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_extractor_yields_domain_answer() {
    if !python_available() {
        return;
    }
    let extractor = CodeAnswerExtractor::python(ExecConfig::default());
    let answer = extractor
        .extract_answer(
            "def solution():\n    total = 1200 + 34\n    return total\n",
            &Normalizer::new(Domain::Arithmetic),
        )
        .await;
    assert_eq!(answer, Answer::Numeric(1234.0));

    let missing = extractor
        .extract_answer("raise SystemExit(3)", &Normalizer::new(Domain::Arithmetic))
        .await;
    assert!(missing.is_invalid());
}

#[tokio::test]
async fn test_spawned_processes_do_not_hold_the_run_open() {
    if !python_available() {
        return;
    }
    let scratch = tempfile::tempdir().unwrap();
    let marker = scratch.path().join("survived");
    let code = format!(
        "import subprocess, sys\n\
         subprocess.Popen([sys.executable, '-c', \"import time; time.sleep(2); open(r'{}', 'w').close(); time.sleep(30)\"])\n\
         ans = 1\n",
        marker.display()
    );
    let runner = PythonRunner::new(ExecConfig {
        timeout_ms: 10_000,
        ..ExecConfig::default()
    });

    let started = Instant::now();
    assert_eq!(runner.run(&code).await, Ok(ExecValue::Number(1.0)));
    assert!(started.elapsed() < Duration::from_secs(10));

    // The grandchild was killed with the interpreter's process group.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!marker.exists());
}
