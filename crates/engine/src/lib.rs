//! Round-robin process scheduler engine.
//!
//! The [`Scheduler`] owns every process entry, keeps runnable entries in a
//! circular ready ring and parked entries in a blocked set, and falls back to
//! an always-present idle entry when nothing else can run. Workers are driven
//! through the [`WorkerHandle`] capability so the engine never touches the OS
//! directly; [`sim::SimLauncher`] provides a deterministic in-memory backend.

pub mod process;
pub mod scheduler;
pub mod sim;
pub mod snapshot;
pub mod table;
pub mod worker;

pub use process::ProcessEntry;
pub use scheduler::Scheduler;
pub use snapshot::{EntryView, Snapshot};
pub use worker::{WorkerError, WorkerHandle, WorkerLauncher, WorkerSpec};

pub use rrsched_core::{EntryId, ProcessKind, ProcessState, SchedError, SchedResult};
