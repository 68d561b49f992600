use chrono::{DateTime, Utc};
use serde::Serialize;

use rrsched_core::{EntryId, ProcessKind, ProcessState};

/// Read-only view of one process entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub id: EntryId,
    pub name: String,
    pub kind: ProcessKind,
    pub state: ProcessState,
    pub os_pid: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time copy of the scheduler tables for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Ready queue in scheduling order, running head first.
    pub ready: Vec<EntryView>,
    /// Blocked entries in the order they were parked.
    pub blocked: Vec<EntryView>,
    pub idle: EntryView,
    /// Currently running entry (`0` when idle runs).
    pub running: EntryId,
    pub quantum_ms: u64,
    pub timer_epoch: u64,
}

impl Snapshot {
    /// All rows in display order: ready queue, blocked set, idle.
    pub fn rows(&self) -> impl Iterator<Item = &EntryView> {
        self.ready
            .iter()
            .chain(self.blocked.iter())
            .chain(std::iter::once(&self.idle))
    }

    pub fn find(&self, id: EntryId) -> Option<&EntryView> {
        self.rows().find(|view| view.id == id)
    }

    /// Number of user entries (idle excluded).
    pub fn user_count(&self) -> usize {
        self.ready.len() + self.blocked.len()
    }
}
