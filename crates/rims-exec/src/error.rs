//! Failures while executing generated code.
//!
//! None of these reach a grading caller: the extractor turns every one of
//! them into a missing answer.

/// Why an execution produced no answer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionFailure {
    #[error("no code left after cleanup")]
    EmptyCode,

    #[error("failed to start interpreter: {0}")]
    Spawn(String),

    #[error("execution exceeded {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("code raised: {0}")]
    Runtime(String),

    #[error("unreadable harness output: {0}")]
    MalformedOutput(String),

    #[error("code produced no answer")]
    NoAnswer,
}

impl ExecutionFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type for a single execution.
pub type ExecResult<T> = std::result::Result<T, ExecutionFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display() {
        let err = ExecutionFailure::Timeout { limit_ms: 3000 };
        assert_eq!(err.to_string(), "execution exceeded 3000ms");
        assert!(err.is_timeout());
        assert!(!ExecutionFailure::NoAnswer.is_timeout());
        assert!(ExecutionFailure::Runtime("ZeroDivisionError".into())
            .to_string()
            .contains("ZeroDivisionError"));
    }
}
