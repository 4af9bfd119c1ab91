//! Run a blocking computation against a hard deadline.
//!
//! The work runs on its own thread. Past the deadline the thread is
//! abandoned rather than joined and its late result is dropped; it stays
//! alive at most until the process exits.

use std::fmt;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Why a time-boxed computation produced no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadlineError {
    /// The deadline passed first.
    TimedOut(Duration),
    /// The worker panicked.
    Panicked,
    /// The worker thread could not be started.
    Spawn(String),
}

impl fmt::Display for DeadlineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadlineError::TimedOut(limit) => {
                write!(f, "timed out after {:.1}s", limit.as_secs_f64())
            }
            DeadlineError::Panicked => write!(f, "worker panicked"),
            DeadlineError::Spawn(msg) => write!(f, "could not start worker: {msg}"),
        }
    }
}

impl std::error::Error for DeadlineError {}

/// Run `work` on a named worker thread and wait at most `deadline`.
pub fn run_with_deadline<T, F>(name: &str, deadline: Duration, work: F) -> Result<T, DeadlineError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            // The receiver is gone once the deadline has passed.
            let _ = tx.send(work());
        })
        .map_err(|e| DeadlineError::Spawn(e.to_string()))?;

    match rx.recv_timeout(deadline) {
        Ok(value) => Ok(value),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(DeadlineError::TimedOut(deadline)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(DeadlineError::Panicked),
    }
}
