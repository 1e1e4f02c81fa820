//! RIMS - answer resolution and consensus CLI
//!
//! The `rims` command grades free-form math answers.
//!
//! ## Commands
//!
//! - `grade`: grade a JSONL batch of candidate sets against their ground truths
//! - `resolve`: split a reflection transcript into good and bad attempts
//! - `equiv`: check whether two answers are equivalent in a domain

mod batch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use rims_core::metrics::METRICS;
use rims_core::{Domain, GraderConfig};
use rims_exec::CodeAnswerExtractor;
use rims_reflect::AttemptResolver;

#[derive(Parser)]
#[command(name = "rims")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Answer resolution and consensus for math solutions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true, env = "RIMS_LOG_JSON")]
    json: bool,

    /// Grader configuration file (TOML)
    #[arg(long, global = true, env = "RIMS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a JSONL file of candidate sets
    Grade {
        /// Input file, one record per line
        input: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Records graded at once
        #[arg(long, default_value = "8")]
        concurrency: usize,
    },

    /// Resolve a reflection transcript into good and bad attempts
    Resolve {
        /// Transcript file
        transcript: PathBuf,

        /// Answer domain
        #[arg(short, long, default_value = "arithmetic")]
        domain: Domain,

        /// Only split the transcript; do not execute any code
        #[arg(long)]
        plan_only: bool,
    },

    /// Check two answers for equivalence
    Equiv {
        a: String,
        b: String,

        /// Answer domain
        #[arg(short, long, default_value = "arithmetic")]
        domain: Domain,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    rims_core::telemetry::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Grade {
            input,
            output,
            concurrency,
        } => cmd_grade(&config, &input, output.as_deref(), concurrency).await,
        Commands::Resolve {
            transcript,
            domain,
            plan_only,
        } => cmd_resolve(&config, &transcript, domain, plan_only).await,
        Commands::Equiv { a, b, domain } => cmd_equiv(&config, &a, &b, domain),
    };
    METRICS.flush();
    result
}

fn load_config(path: Option<&Path>) -> Result<GraderConfig> {
    match path {
        Some(path) => GraderConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => Ok(GraderConfig::default()),
    }
}

fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {:?}", path))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn cmd_grade(
    config: &GraderConfig,
    input: &Path,
    output: Option<&Path>,
    concurrency: usize,
) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {:?}", input))?;
    let report = batch::grade_batch(&text, config, concurrency).await;
    info!(
        total = report.total,
        correct = report.correct,
        failed = report.failed_indices.len(),
        accuracy = report.accuracy(),
        "batch graded"
    );
    emit_json(&report, output)
}

async fn cmd_resolve(
    config: &GraderConfig,
    transcript: &Path,
    domain: Domain,
    plan_only: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(transcript)
        .with_context(|| format!("Failed to read {:?}", transcript))?;
    let resolver = AttemptResolver::new(domain, CodeAnswerExtractor::python(config.exec.clone()));
    if plan_only {
        emit_json(&resolver.plan(&text), None)
    } else {
        emit_json(&resolver.resolve(&text).await, None)
    }
}

#[derive(Debug, Serialize)]
struct EquivVerdict {
    domain: Domain,
    a: rims_core::Answer,
    b: rims_core::Answer,
    /// `None` when either side could not be normalized.
    equivalent: Option<bool>,
}

fn equiv_verdict(config: &GraderConfig, a: &str, b: &str, domain: Domain) -> EquivVerdict {
    let checker = config.checker_for(domain);
    let normalizer = checker.normalizer();
    let (a, b) = (normalizer.normalize(a), normalizer.normalize(b));
    let equivalent = checker.decide(&a, &b);
    EquivVerdict {
        domain,
        a,
        b,
        equivalent,
    }
}

fn cmd_equiv(config: &GraderConfig, a: &str, b: &str, domain: Domain) -> Result<()> {
    emit_json(&equiv_verdict(config, a, b, domain), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_grade_args() {
        let cli = Cli::try_parse_from(["rims", "--verbose", "grade", "in.jsonl", "--concurrency", "2"])
            .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Grade {
                input,
                output,
                concurrency,
            } => {
                assert_eq!(input, PathBuf::from("in.jsonl"));
                assert!(output.is_none());
                assert_eq!(concurrency, 2);
            }
            _ => panic!("expected grade"),
        }
    }

    #[test]
    fn test_domain_aliases_parse() {
        let cli = Cli::try_parse_from(["rims", "equiv", "1", "1.0", "--domain", "ocw"]).unwrap();
        match cli.command {
            Commands::Equiv { domain, .. } => {
                assert_eq!(domain, Domain::SymbolicEquationOrExpression)
            }
            _ => panic!("expected equiv"),
        }
        assert!(Cli::try_parse_from(["rims", "equiv", "1", "1", "--domain", "geometry"]).is_err());
    }

    #[test]
    fn test_load_config() {
        assert_eq!(load_config(None).unwrap(), GraderConfig::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rims.toml");
        std::fs::write(&path, "arithmetic_tolerance = 0.01\n").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().arithmetic_tolerance, 0.01);

        let err = load_config(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_equiv_verdict() {
        let config = GraderConfig::default();
        let verdict = equiv_verdict(&config, "x+1", "1+x", Domain::SymbolicExpression);
        assert_eq!(verdict.equivalent, Some(true));

        let verdict = equiv_verdict(&config, "3.0", "3", Domain::Arithmetic);
        assert_eq!(verdict.equivalent, Some(true));

        let verdict = equiv_verdict(&config, "seven", "7", Domain::Arithmetic);
        assert_eq!(verdict.equivalent, None);
    }

    #[test]
    fn test_emit_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        emit_json(&serde_json::json!({"ok": true}), Some(&path)).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["ok"], true);
    }
}
