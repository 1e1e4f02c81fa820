//! Error taxonomy for the grading engine.
//!
//! Domain-level failures (unparsable answers, timeouts, failed executions)
//! are absorbed into typed "no result" values and never surface here. What
//! remains are contract violations and configuration problems.

use std::path::PathBuf;

/// RIMS engine errors.
#[derive(Debug, thiserror::Error)]
pub enum RimsError {
    #[error("candidate set must not be empty")]
    EmptyCandidateSet,

    #[error("unknown domain: {0}")]
    UnknownDomain(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for RIMS engine operations.
pub type Result<T> = std::result::Result<T, RimsError>;
