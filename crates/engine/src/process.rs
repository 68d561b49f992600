use std::fmt;

use chrono::{DateTime, Utc};
use tracing::warn;

use rrsched_core::{EntryId, ProcessKind, ProcessState};

use crate::snapshot::EntryView;
use crate::worker::WorkerHandle;

/// Scheduling metadata for one worker, plus ownership of that worker.
///
/// The state field is only changed by the scheduler's transitions. Dropping
/// an entry terminates its worker unless that already happened.
pub struct ProcessEntry {
    id: EntryId,
    name: String,
    kind: ProcessKind,
    state: ProcessState,
    created_at: DateTime<Utc>,
    worker: Box<dyn WorkerHandle>,
    terminated: bool,
}

impl ProcessEntry {
    pub(crate) fn new(
        id: EntryId,
        name: String,
        kind: ProcessKind,
        worker: Box<dyn WorkerHandle>,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            state: ProcessState::Ready,
            created_at: Utc::now(),
            worker,
            terminated: false,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProcessKind {
        self.kind
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn os_pid(&self) -> Option<u32> {
        self.worker.os_pid()
    }

    pub(crate) fn set_state(&mut self, state: ProcessState) {
        self.state = state;
    }

    pub(crate) fn pause(&mut self) {
        if let Err(e) = self.worker.pause() {
            warn!(id = %self.id, name = %self.name, error = %e, "pause failed");
        }
    }

    pub(crate) fn resume(&mut self) {
        if let Err(e) = self.worker.resume() {
            warn!(id = %self.id, name = %self.name, error = %e, "resume failed");
        }
    }

    pub(crate) fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        if let Err(e) = self.worker.terminate() {
            warn!(id = %self.id, name = %self.name, error = %e, "terminate failed");
        }
    }

    pub(crate) fn is_alive(&mut self) -> bool {
        !self.terminated && self.worker.is_alive()
    }

    pub fn view(&self) -> EntryView {
        EntryView {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            state: self.state,
            os_pid: self.os_pid(),
            created_at: self.created_at,
        }
    }
}

impl Drop for ProcessEntry {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl fmt::Debug for ProcessEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("os_pid", &self.os_pid())
            .finish()
    }
}
