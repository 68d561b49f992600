//! Worker capability traits.
//!
//! A worker is the thing a process entry actually controls: an OS child
//! process in the binary, a set of state flags in tests. The engine only ever
//! talks to workers through these traits.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// What to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerSpec {
    /// The permanent fallback worker.
    Idle,
    /// A generated worker that repeatedly reports its label.
    Synthetic { label: String },
    /// An external program whose output is captured.
    Executable { path: PathBuf },
}

impl fmt::Display for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerSpec::Idle => write!(f, "idle"),
            WorkerSpec::Synthetic { label } => write!(f, "{}", label),
            WorkerSpec::Executable { path } => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("launch failed: {0}")]
    Launch(String),

    #[error("failed to {action} worker: {reason}")]
    Signal { action: &'static str, reason: String },

    #[error("worker has already exited")]
    Exited,
}

/// Control surface of one running worker.
///
/// Every call is made from the scheduler's single control thread and must
/// return promptly.
pub trait WorkerHandle: Send {
    fn pause(&mut self) -> Result<(), WorkerError>;

    fn resume(&mut self) -> Result<(), WorkerError>;

    fn terminate(&mut self) -> Result<(), WorkerError>;

    fn is_alive(&mut self) -> bool;

    /// OS process id, when the worker is backed by one.
    fn os_pid(&self) -> Option<u32>;
}

/// Creates workers. A freshly started worker must be paused.
pub trait WorkerLauncher: Send {
    fn start(&mut self, spec: &WorkerSpec) -> Result<Box<dyn WorkerHandle>, WorkerError>;
}
