//! In-memory runner for tests.
//!
//! `ScriptedRunner` answers with canned results keyed by the exact code text
//! and records every call, so callers can be tested without an interpreter.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ExecResult, ExecutionFailure};
use crate::runner::CodeRunner;
use crate::value::ExecValue;

#[derive(Debug, Default)]
pub struct ScriptedRunner {
    script: HashMap<String, ExecResult<ExecValue>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `code` with `result`. Unscripted code yields `NoAnswer`.
    pub fn with(mut self, code: impl Into<String>, result: ExecResult<ExecValue>) -> Self {
        self.script.insert(code.into(), result);
        self
    }

    /// Code passed to `run`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeRunner for ScriptedRunner {
    async fn run(&self, code: &str) -> ExecResult<ExecValue> {
        self.calls.lock().unwrap().push(code.to_string());
        self.script
            .get(code)
            .cloned()
            .unwrap_or(Err(ExecutionFailure::NoAnswer))
    }
}
