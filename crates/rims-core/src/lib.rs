//! RIMS Core Library
//!
//! Answer normalization, equivalence checking and consensus for grading
//! free-form math answers produced by several solving strategies.

pub mod answer;
pub mod config;
pub mod consensus;
pub mod equivalence;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod obs;
pub mod symbolic;
pub mod telemetry;
pub mod worker;

pub use answer::{Answer, CandidateSet, Domain, Equation, INVALID_ANSWER};
pub use config::{ExecConfig, GraderConfig};
pub use consensus::{Consensus, ConsensusAggregator};
pub use equivalence::{is_equiv_numeric, EquivalenceChecker};
pub use error::{Result, RimsError};
pub use normalize::{
    extract_cot_answer, extract_last_number, normalize_final_answer, normalize_numeric,
    parse_num_from_answer, Normalizer,
};
pub use worker::{run_with_deadline, Deadline, WorkerError};
