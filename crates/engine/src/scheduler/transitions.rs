use std::path::Path;

use tracing::info;

use rrsched_core::{EntryId, ProcessKind, ProcessState, SchedError, SchedResult};

use crate::process::ProcessEntry;
use crate::table::Membership;
use crate::worker::WorkerSpec;

use super::core::launch_failed;
use super::Scheduler;

impl Scheduler {
    /// Start a synthetic worker labelled `name` and queue it at the tail.
    /// Takes the CPU straight away when nothing else is ready.
    pub fn spawn(&mut self, name: &str) -> SchedResult<EntryId> {
        self.ensure_operational()?;
        let limit = self.settings.name_limit;
        if name.chars().count() > limit {
            return Err(SchedError::NameTooLong {
                name: name.to_string(),
                limit,
            });
        }
        let spec = WorkerSpec::Synthetic {
            label: name.to_string(),
        };
        self.admit(name.to_string(), ProcessKind::Spawned, spec)
    }

    /// Start an external program and queue it at the tail. The entry is
    /// named after the path exactly as given.
    pub fn exec(&mut self, path: &Path) -> SchedResult<EntryId> {
        self.ensure_operational()?;
        let spec = WorkerSpec::Executable {
            path: path.to_path_buf(),
        };
        self.admit(path.display().to_string(), ProcessKind::Executed, spec)
    }

    fn admit(&mut self, name: String, kind: ProcessKind, spec: WorkerSpec) -> SchedResult<EntryId> {
        let worker = self.launcher.start(&spec).map_err(|e| launch_failed(&spec, e))?;

        let id = EntryId(self.next_id);
        self.next_id += 1;

        let was_empty = self.table.is_ready_empty();
        let slot = self.table.insert_ready(ProcessEntry::new(id, name, kind, worker));
        {
            let entry = self.table.entry(slot);
            info!(id = %id, name = %entry.name(), kind = %kind, pid = ?entry.os_pid(), "admitted");
        }
        if was_empty {
            self.promote_from_idle(slot);
        }
        self.debug_verify();
        Ok(id)
    }

    /// Park an entry in the blocked set. If it was running, the next ready
    /// entry (or idle) takes over.
    pub fn block(&mut self, id: EntryId) -> SchedResult<()> {
        self.ensure_operational()?;
        let slot = self.locate(id)?;
        if self.table.membership(slot) == Membership::Blocked {
            return Err(SchedError::AlreadyBlocked(id));
        }

        let was_head = self.table.head() == Some(slot);
        if was_head && self.table.ready_len() == 1 {
            self.ensure_idle_alive()?;
        }

        let entry = self.table.entry_mut(slot);
        entry.pause();
        entry.set_state(ProcessState::Blocked);
        self.table.move_to_blocked(slot);
        info!(id = %id, "blocked");

        if was_head {
            self.promote_head_or_idle();
        }
        self.debug_verify();
        Ok(())
    }

    /// Return a blocked entry to the ready queue tail without preempting
    /// the running entry. An empty queue means idle is running, so the entry
    /// is promoted at once.
    pub fn run(&mut self, id: EntryId) -> SchedResult<()> {
        self.ensure_operational()?;
        let slot = self.locate(id)?;
        if self.table.membership(slot) == Membership::Ready {
            return Err(SchedError::AlreadyReady(id));
        }

        let was_empty = self.table.is_ready_empty();
        self.table.entry_mut(slot).set_state(ProcessState::Ready);
        self.table.move_to_ready(slot);
        info!(id = %id, "unblocked");

        if was_empty {
            self.promote_from_idle(slot);
        }
        self.debug_verify();
        Ok(())
    }

    /// Terminate an entry's worker and forget the entry.
    pub fn kill(&mut self, id: EntryId) -> SchedResult<()> {
        self.ensure_operational()?;
        let slot = self.locate(id)?;

        let was_head = self.table.head() == Some(slot);
        if was_head && self.table.ready_len() == 1 {
            self.ensure_idle_alive()?;
        }

        let mut entry = self.table.remove(slot);
        entry.terminate();
        info!(id = %id, name = %entry.name(), "killed");
        drop(entry);

        if was_head {
            self.promote_head_or_idle();
        }
        self.debug_verify();
        Ok(())
    }
}
