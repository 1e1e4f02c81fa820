//! Grader configuration, loadable from TOML.
//!
//! ```toml
//! arithmetic_tolerance = 1e-3
//! symbolic_time_limit_ms = 3000
//!
//! [exec]
//! timeout_ms = 2000
//! max_concurrent = 4
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::answer::Domain;
use crate::equivalence::{
    EquivalenceChecker, DEFAULT_ARITHMETIC_TOLERANCE, DEFAULT_RELATIVE_TOLERANCE,
};
use crate::error::{Result, RimsError};

/// Settings for executing generated code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecConfig {
    /// Interpreter binary.
    pub interpreter: String,
    /// Arguments passed before the script is piped on stdin.
    pub interpreter_args: Vec<String>,
    /// Maximum wall-clock time for one execution (milliseconds).
    pub timeout_ms: u64,
    /// Variable names read when the code has no entry-point function.
    pub result_vars: Vec<String>,
    /// Maximum number of interpreter processes alive at once.
    pub max_concurrent: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            interpreter_args: vec!["-I".to_string(), "-".to_string()],
            timeout_ms: 3_000,
            result_vars: vec!["ans".to_string(), "answer".to_string(), "result".to_string()],
            max_concurrent: 8,
        }
    }
}

impl ExecConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level grading configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraderConfig {
    /// Absolute tolerance for arithmetic grading and consensus.
    pub arithmetic_tolerance: f64,
    /// Relative tolerance for numbers in the symbolic domains.
    pub relative_tolerance: f64,
    /// Wall-clock budget for one symbolic comparison (milliseconds).
    pub symbolic_time_limit_ms: u64,
    pub exec: ExecConfig,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            arithmetic_tolerance: DEFAULT_ARITHMETIC_TOLERANCE,
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
            symbolic_time_limit_ms: 5_000,
            exec: ExecConfig::default(),
        }
    }
}

impl GraderConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RimsError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Rejects settings that would make every comparison meaningless.
    pub fn validate(&self) -> Result<()> {
        for (name, tol) in [
            ("arithmetic_tolerance", self.arithmetic_tolerance),
            ("relative_tolerance", self.relative_tolerance),
        ] {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(RimsError::InvalidConfig(format!(
                    "{name} must be a positive number, got {tol}"
                )));
            }
        }
        if self.symbolic_time_limit_ms == 0 || self.exec.timeout_ms == 0 {
            return Err(RimsError::InvalidConfig("time limits must be non-zero".into()));
        }
        if self.exec.max_concurrent == 0 {
            return Err(RimsError::InvalidConfig("exec.max_concurrent must be at least 1".into()));
        }
        Ok(())
    }

    pub fn symbolic_time_limit(&self) -> Duration {
        Duration::from_millis(self.symbolic_time_limit_ms)
    }

    /// Builds the checker for `domain` from these settings.
    pub fn checker_for(&self, domain: Domain) -> EquivalenceChecker {
        let tolerance = match domain {
            Domain::Arithmetic => self.arithmetic_tolerance,
            Domain::SymbolicExpression | Domain::SymbolicEquationOrExpression => {
                self.relative_tolerance
            }
        };
        EquivalenceChecker::new(domain, tolerance, self.symbolic_time_limit())
    }
}
