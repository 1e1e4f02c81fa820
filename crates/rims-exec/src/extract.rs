//! Answer extraction from generated code.

use std::sync::Arc;

use rims_core::metrics::METRICS;
use rims_core::{obs, Answer, ExecConfig, Normalizer};

use crate::runner::{CodeRunner, PythonRunner};
use crate::value::ExecValue;

/// Runs generated code and turns what it returns into an answer.
///
/// Execution failures of any kind (spawn errors, exceptions, timeouts, no
/// value) are logged and come back as a missing answer.
#[derive(Clone)]
pub struct CodeAnswerExtractor {
    runner: Arc<dyn CodeRunner>,
}

impl CodeAnswerExtractor {
    pub fn new(runner: Arc<dyn CodeRunner>) -> Self {
        Self { runner }
    }

    /// Extractor backed by a Python interpreter configured by `config`.
    pub fn python(config: ExecConfig) -> Self {
        Self::new(Arc::new(PythonRunner::new(config)))
    }

    pub async fn extract(&self, code: &str) -> Option<ExecValue> {
        METRICS.inc_code_executions();
        match self.runner.run(code).await {
            Ok(value) => Some(value),
            Err(err) => {
                METRICS.inc_execution_failures();
                obs::emit_execution_failed(&err);
                None
            }
        }
    }

    /// Like [`extract`](Self::extract), normalized for `normalizer`'s domain.
    /// A missing answer is `Invalid`.
    pub async fn extract_answer(&self, code: &str, normalizer: &Normalizer) -> Answer {
        self.extract(code)
            .await
            .map_or(Answer::Invalid, |value| value.to_answer(normalizer))
    }
}

impl std::fmt::Debug for CodeAnswerExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeAnswerExtractor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionFailure;
    use crate::fakes::ScriptedRunner;
    use rims_core::Domain;

    #[tokio::test]
    async fn test_failures_become_missing_answers() {
        let runner = ScriptedRunner::new()
            .with("ok", Ok(ExecValue::Text("\\frac{1}{2}".into())))
            .with("boom", Err(ExecutionFailure::Runtime("ValueError".into())));
        let extractor = CodeAnswerExtractor::new(Arc::new(runner));

        assert_eq!(
            extractor.extract("ok").await,
            Some(ExecValue::Text("\\frac{1}{2}".into()))
        );
        assert_eq!(extractor.extract("boom").await, None);

        let arithmetic = Normalizer::new(Domain::Arithmetic);
        assert_eq!(
            extractor.extract_answer("ok", &arithmetic).await,
            Answer::Numeric(0.5)
        );
        assert!(extractor.extract_answer("boom", &arithmetic).await.is_invalid());
    }
}
