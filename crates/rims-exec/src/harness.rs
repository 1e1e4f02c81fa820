//! The Python program wrapped around generated code.
//!
//! The harness preloads the modules solutions tend to assume, silences
//! `print` and `input`, runs the code in a fresh namespace and reports the
//! answer on a single sentinel-prefixed JSON line.

use serde::Deserialize;
use serde_json::Value;

use crate::code::PreparedCode;
use crate::error::{ExecResult, ExecutionFailure};
use crate::value::ExecValue;

/// Prefix of the harness's report line on stdout.
pub const RESULT_SENTINEL: &str = "__RIMS_RESULT__";

const HARNESS: &str = r#"import builtins as __rims_builtins
import json as __rims_json
import math as __rims_math
import os as __rims_os
import sys as __rims_sys

__rims_stdout = __rims_sys.stdout


def __rims_quiet(*args, **kwargs):
    return None


def __rims_input(prompt=""):
    return ""


__rims_builtins.print = __rims_quiet
__rims_builtins.input = __rims_input


def __rims_emit(report):
    __rims_stdout.write("__RIMS_RESULT__" + __rims_json.dumps(report) + "\n")
    __rims_stdout.flush()
    __rims_os._exit(0)


def __rims_value(ans):
    if ans is None:
        return None
    sympy = __rims_sys.modules.get("sympy")
    if sympy is not None and isinstance(ans, sympy.Basic):
        ans = sympy.latex(ans)
    try:
        number = float(ans)
    except Exception:
        return str(ans)
    if __rims_math.isfinite(number):
        return number
    return str(ans)


__rims_ns = {"__name__": "__main__"}
exec("import math\nimport itertools\nimport random\nimport datetime\nfrom fractions import Fraction\n", __rims_ns)
try:
    exec("import sympy\nimport sympy as sp\nfrom sympy import Symbol, symbols, Rational, sqrt, pi\n", __rims_ns)
except Exception:
    pass

try:
    exec(compile(__RIMS_CODE, "<generated>", "exec"), __rims_ns)
    if __RIMS_ENTRY is not None:
        __rims_ans = __rims_ns[__RIMS_ENTRY]()
    else:
        __rims_ans = next((__rims_ns[name] for name in __RIMS_VARS if name in __rims_ns), None)
    __rims_report = {"status": "ok", "value": __rims_value(__rims_ans)}
except BaseException as exc:
    __rims_report = {"status": "error", "error": type(exc).__name__ + ": " + str(exc)}
__rims_emit(__rims_report)
"#;

/// Builds the script piped to the interpreter for `prepared`.
///
/// Without an entry function the first of `result_vars` (after the entry's
/// own return expression, when it names a variable) defined at module level
/// is the answer.
pub fn build_script(prepared: &PreparedCode, result_vars: &[String]) -> String {
    let mut vars: Vec<String> = Vec::with_capacity(result_vars.len() + 1);
    if let Some(expr) = prepared.return_expr.as_deref() {
        if is_identifier(expr) {
            vars.push(expr.to_string());
        }
    }
    vars.extend(result_vars.iter().cloned());

    // JSON string and list literals are valid Python literals.
    let entry = prepared
        .entry
        .as_ref()
        .map_or_else(|| "None".to_string(), |name| Value::from(name.as_str()).to_string());
    format!(
        "__RIMS_CODE = {code}\n__RIMS_ENTRY = {entry}\n__RIMS_VARS = {vars}\n{HARNESS}",
        code = Value::from(prepared.source.as_str()),
        vars = Value::from(vars),
    )
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum HarnessReport {
    Ok { value: Option<ExecValue> },
    Error { error: String },
}

/// Reads the harness report from the interpreter's stdout.
pub fn parse_output(stdout: &str) -> ExecResult<ExecValue> {
    let line = stdout
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(RESULT_SENTINEL))
        .ok_or_else(|| ExecutionFailure::MalformedOutput("no result line".to_string()))?;
    let report: HarnessReport = serde_json::from_str(line)
        .map_err(|e| ExecutionFailure::MalformedOutput(e.to_string()))?;
    match report {
        HarnessReport::Ok { value: Some(value) } => Ok(value),
        HarnessReport::Ok { value: None } => Err(ExecutionFailure::NoAnswer),
        HarnessReport::Error { error } => Err(ExecutionFailure::Runtime(error)),
    }
}
