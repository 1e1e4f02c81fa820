//! Code runners.
//!
//! [`PythonRunner`] executes code in a separate interpreter process under a
//! wall-clock timeout. The interpreter leads its own process group, and the
//! whole group is killed once the report is read or the timeout fires, so
//! neither the solution nor anything it spawned outlives its budget.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio::sync::Semaphore;
use tracing::debug;

use rims_core::ExecConfig;

use crate::code::PreparedCode;
use crate::error::{ExecResult, ExecutionFailure};
use crate::harness::{build_script, parse_output, RESULT_SENTINEL};
use crate::value::ExecValue;

/// Executes generated code and reports its answer.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    /// Runs `code` (raw model output) and returns the value it produced.
    async fn run(&self, code: &str) -> ExecResult<ExecValue>;
}

/// Runs code through a Python interpreter, one process per execution.
#[derive(Debug, Clone)]
pub struct PythonRunner {
    config: ExecConfig,
    permits: Arc<Semaphore>,
}

impl PythonRunner {
    pub fn new(config: ExecConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self { config, permits }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    async fn execute(&self, script: String) -> ExecResult<ExecValue> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ExecutionFailure::Spawn(e.to_string()))?;
        let workdir = tempfile::tempdir().map_err(|e| ExecutionFailure::Spawn(e.to_string()))?;

        let mut command = Command::new(&self.config.interpreter);
        command
            .args(&self.config.interpreter_args)
            .current_dir(workdir.path())
            .env("MPLBACKEND", "Agg")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Anything the solution spawns joins the interpreter's group and is
        // killed with it.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            ExecutionFailure::Spawn(format!("{}: {e}", self.config.interpreter))
        })?;
        let pid = child.id();
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            return Err(ExecutionFailure::Spawn("interpreter pipes unavailable".to_string()));
        };
        let stderr_tail = tokio::spawn(read_tail(stderr));

        // Reading stops at the report line: a leftover grandchild may hold
        // stdout open long after the interpreter has exited.
        let exchange = async {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(script.as_bytes()).await?;
            }
            let report = read_report(stdout).await?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((report, status))
        };

        let limit = self.config.timeout();
        let outcome = tokio::time::timeout(limit, exchange).await;
        if let Some(pid) = pid {
            kill_process_group(pid);
        }
        let (report, status) = match outcome {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                stderr_tail.abort();
                return Err(ExecutionFailure::Spawn(e.to_string()));
            }
            Err(_) => {
                stderr_tail.abort();
                return Err(ExecutionFailure::Timeout {
                    limit_ms: limit.as_millis() as u64,
                });
            }
        };

        match parse_output(&report) {
            Err(ExecutionFailure::MalformedOutput(_)) if !status.success() => {
                let stderr = tokio::time::timeout(STDERR_GRACE, stderr_tail)
                    .await
                    .ok()
                    .and_then(|joined| joined.ok())
                    .unwrap_or_default();
                let last = stderr.lines().last().unwrap_or("").trim().to_string();
                debug!(status = %status, stderr = %last, "interpreter exited without a report");
                Err(ExecutionFailure::Runtime(if last.is_empty() {
                    status.to_string()
                } else {
                    last
                }))
            }
            result => {
                stderr_tail.abort();
                result
            }
        }
    }
}

/// How long to wait for stderr to drain once the process group is gone.
const STDERR_GRACE: Duration = Duration::from_millis(250);

/// Bytes of stderr kept for error reporting.
const STDERR_TAIL_BYTES: usize = 16 * 1024;

/// Returns the harness report line, or an empty string when stdout closes
/// without one.
async fn read_report(stdout: ChildStdout) -> std::io::Result<String> {
    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(String::new());
        }
        let text = String::from_utf8_lossy(&line);
        if text.starts_with(RESULT_SENTINEL) {
            return Ok(text.into_owned());
        }
    }
}

async fn read_tail(stderr: ChildStderr) -> String {
    let mut reader = BufReader::new(stderr);
    let mut tail: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > STDERR_TAIL_BYTES {
                    tail.drain(..tail.len() - STDERR_TAIL_BYTES);
                }
            }
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal. A group that is already gone
    // reports ESRCH, which is fine here.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

#[async_trait]
impl CodeRunner for PythonRunner {
    async fn run(&self, code: &str) -> ExecResult<ExecValue> {
        let prepared = PreparedCode::from_raw(code);
        if prepared.is_empty() {
            return Err(ExecutionFailure::EmptyCode);
        }
        debug!(entry = ?prepared.entry, "executing generated code");
        let script = build_script(&prepared, &self.config.result_vars);
        self.execute(script).await
    }
}
