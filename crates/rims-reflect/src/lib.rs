//! RIMS reflection transcripts
//!
//! Parses the fielded transcripts written during a reflection run and
//! resolves them into the final (good) attempt and the abandoned (bad)
//! ones, with an answer computed for each.

pub mod method;
pub mod resolver;
pub mod transcript;

pub use method::{parse_selection_choice, Method};
pub use resolver::{AttemptResolver, Resolution, ResolutionOutcome, ResolvedAttempt};
pub use transcript::{
    AttemptRecord, DeclaredMethod, ParsedTranscript, TranscriptParseResult, TranscriptParser,
};
