use std::time::Duration;

use tracing::{error, info};

use rrsched_core::config::SchedulerSettings;
use rrsched_core::{EntryId, ProcessKind, ProcessState, SchedError, SchedResult};

use crate::process::ProcessEntry;
use crate::snapshot::{EntryView, Snapshot};
use crate::table::{ProcessTable, SlotId};
use crate::worker::{WorkerError, WorkerLauncher, WorkerSpec};

/// The scheduler engine. Owns every process entry, the ready ring, the
/// blocked set and the idle entry, and is the only thing that changes
/// entry states.
///
/// Not thread-safe on purpose: callers serialize operations and the quantum
/// tick through a single owner.
pub struct Scheduler {
    pub(super) settings: SchedulerSettings,
    pub(super) launcher: Box<dyn WorkerLauncher>,
    pub(super) table: ProcessTable,
    /// Fallback entry. Never a member of the table.
    pub(super) idle: ProcessEntry,
    /// Next user id to hand out. Ids are never reused.
    pub(super) next_id: u32,
    /// Bumped on every timer rearm; the driver resets its quantum timer
    /// whenever it observes a change.
    pub(super) timer_epoch: u64,
    /// Set once the idle worker is found dead.
    pub(super) poisoned: bool,
    pub(super) shut_down: bool,
}

impl Scheduler {
    /// Start the idle worker and let it run.
    pub fn new(settings: SchedulerSettings, mut launcher: Box<dyn WorkerLauncher>) -> SchedResult<Self> {
        let worker = launcher
            .start(&WorkerSpec::Idle)
            .map_err(|e| launch_failed(&WorkerSpec::Idle, e))?;

        let mut idle = ProcessEntry::new(EntryId::IDLE, "idle".to_string(), ProcessKind::Idle, worker);
        idle.resume();
        idle.set_state(ProcessState::Running);

        let mut scheduler = Self {
            settings,
            launcher,
            table: ProcessTable::new(),
            idle,
            next_id: 1,
            timer_epoch: 0,
            poisoned: false,
            shut_down: false,
        };
        scheduler.rearm_timer();
        info!(
            quantum_ms = scheduler.settings.quantum_ms,
            idle_pid = ?scheduler.idle.os_pid(),
            "scheduler started"
        );
        scheduler.debug_verify();
        Ok(scheduler)
    }

    pub fn quantum(&self) -> Duration {
        self.settings.quantum()
    }

    /// Id of the entry that currently holds the CPU, `0` when idle runs.
    pub fn running(&self) -> EntryId {
        match self.table.head() {
            Some(slot) => self.table.entry(slot).id(),
            None => EntryId::IDLE,
        }
    }

    pub fn state_of(&self, id: EntryId) -> Option<ProcessState> {
        if id.is_idle() {
            return Some(self.idle.state());
        }
        self.table.lookup(id).map(|slot| self.table.entry(slot).state())
    }

    /// Ready queue ids, running head first.
    pub fn ready_ids(&self) -> Vec<EntryId> {
        self.table.ready_iter().map(|(_, entry)| entry.id()).collect()
    }

    pub fn blocked_ids(&self) -> Vec<EntryId> {
        self.table
            .blocked_slots()
            .map(|slot| self.table.entry(slot).id())
            .collect()
    }

    /// Number of user entries; the idle entry is not counted.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn timer_epoch(&self) -> u64 {
        self.timer_epoch
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn snapshot(&self) -> Snapshot {
        let ready: Vec<EntryView> = self.table.ready_iter().map(|(_, entry)| entry.view()).collect();
        let blocked = self
            .table
            .blocked_slots()
            .map(|slot| self.table.entry(slot).view())
            .collect();
        Snapshot {
            ready,
            blocked,
            idle: self.idle.view(),
            running: self.running(),
            quantum_ms: self.settings.quantum_ms,
            timer_epoch: self.timer_epoch,
        }
    }

    /// Terminate every worker, idle included, and empty both collections.
    /// Safe to call more than once; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let entries = self.table.drain();
        let count = entries.len();
        for mut entry in entries {
            entry.terminate();
        }
        self.idle.terminate();
        info!(terminated = count, "scheduler shut down");
    }

    // ── internal helpers ───────────────────────────────────────

    pub(super) fn rearm_timer(&mut self) {
        self.timer_epoch += 1;
    }

    /// Refuse every mutation once the scheduler is poisoned or shut down.
    pub(super) fn ensure_operational(&self) -> SchedResult<()> {
        if self.poisoned || self.shut_down {
            return Err(SchedError::IdleLost);
        }
        Ok(())
    }

    /// Must run before any mutation of an operation that would hand the CPU
    /// back to idle.
    pub(super) fn ensure_idle_alive(&mut self) -> SchedResult<()> {
        if self.idle.is_alive() {
            return Ok(());
        }
        self.poisoned = true;
        error!(idle_pid = ?self.idle.os_pid(), "idle worker died, scheduler poisoned");
        Err(SchedError::IdleLost)
    }

    /// Resolve a user id to its slot. The idle entry is never found.
    pub(super) fn locate(&self, id: EntryId) -> SchedResult<SlotId> {
        if id.is_idle() {
            return Err(SchedError::NotFound(id));
        }
        self.table.lookup(id).ok_or(SchedError::NotFound(id))
    }

    /// Give the CPU to the current ring head, or to idle if the ring is now
    /// empty. Called after the running head left the ring.
    pub(super) fn promote_head_or_idle(&mut self) {
        match self.table.head() {
            Some(slot) => {
                let entry = self.table.entry_mut(slot);
                entry.set_state(ProcessState::Running);
                entry.resume();
                info!(id = %entry.id(), name = %entry.name(), "promoted");
            }
            None => {
                self.idle.set_state(ProcessState::Running);
                self.idle.resume();
                info!("ready queue empty, idle running");
            }
        }
        self.rearm_timer();
    }

    /// Hand the CPU from idle to `slot`, the only ready entry.
    pub(super) fn promote_from_idle(&mut self, slot: SlotId) {
        self.idle.pause();
        self.idle.set_state(ProcessState::Ready);
        let entry = self.table.entry_mut(slot);
        entry.set_state(ProcessState::Running);
        entry.resume();
        info!(id = %entry.id(), name = %entry.name(), "promoted from idle");
        self.rearm_timer();
    }

    pub(super) fn debug_verify(&self) {
        if cfg!(debug_assertions) {
            if let Err(e) = self.check_invariants() {
                panic!("scheduler invariant violated: {}", e);
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub(super) fn launch_failed(spec: &WorkerSpec, err: WorkerError) -> SchedError {
    let reason = match err {
        WorkerError::Launch(reason) => reason,
        other => other.to_string(),
    };
    SchedError::LaunchFailed {
        target: spec.to_string(),
        reason,
    }
}
