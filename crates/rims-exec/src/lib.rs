//! RIMS code execution
//!
//! Turns generated solution code into answers: the code is cleaned up,
//! wrapped in a small Python harness and executed in a separate,
//! timeout-bounded interpreter process.

pub mod code;
pub mod error;
pub mod extract;
pub mod fakes;
pub mod harness;
pub mod runner;
pub mod value;

pub use code::{locate_entry_point, neutralize_prints, strip_fences, EntryPoint, PreparedCode};
pub use error::{ExecResult, ExecutionFailure};
pub use extract::CodeAnswerExtractor;
pub use fakes::ScriptedRunner;
pub use runner::{CodeRunner, PythonRunner};
pub use value::ExecValue;
