//! Bounded execution of CPU-bound work.
//!
//! Symbolic comparison runs on a dedicated thread with a hard wall-clock
//! limit. The caller stops waiting at the limit; the worker observes the
//! shared [`Deadline`] and unwinds on its own shortly after.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Cooperative cancellation point shared between a caller and its worker.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// A deadline that never expires unless cancelled.
    pub fn unbounded() -> Self {
        Self {
            at: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(limit),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn expired(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed) || self.at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// Why a bounded worker produced no value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorkerError {
    #[error("worker timed out after {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    #[error("worker panicked: {0}")]
    Panicked(String),

    #[error("failed to spawn worker: {0}")]
    Spawn(String),
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs `work` on its own thread and waits at most `limit` for the result.
///
/// Panics inside `work` are caught and reported as
/// [`WorkerError::Panicked`]. On timeout the deadline handed to `work` is
/// cancelled so the thread can exit at its next checkpoint.
pub fn run_with_deadline<T, F>(limit: Duration, work: F) -> Result<T, WorkerError>
where
    T: Send + 'static,
    F: FnOnce(&Deadline) -> T + Send + 'static,
{
    let deadline = Deadline::after(limit);
    let worker_deadline = deadline.clone();
    let (tx, rx) = mpsc::channel();

    std::thread::Builder::new()
        .name("rims-symbolic".into())
        .spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| work(&worker_deadline)));
            // The receiver is gone if the caller already timed out.
            let _ = tx.send(outcome);
        })
        .map_err(|e| WorkerError::Spawn(e.to_string()))?;

    match rx.recv_timeout(limit) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(payload)) => Err(WorkerError::Panicked(panic_message(payload))),
        Err(RecvTimeoutError::Timeout) => {
            deadline.cancel();
            Err(WorkerError::Timeout {
                limit_ms: limit.as_millis() as u64,
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Panicked(
            "worker exited without a result".into(),
        )),
    }
}
