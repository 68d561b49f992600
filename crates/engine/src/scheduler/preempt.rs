use tracing::debug;

use rrsched_core::{EntryId, ProcessState, SchedResult};

use super::Scheduler;

impl Scheduler {
    /// Quantum expiry: the running head goes to the tail and the next entry
    /// runs. Returns the id now running.
    ///
    /// With one ready entry it keeps running and no worker is signalled.
    /// With none, idle keeps running. The timer is rearmed in every case.
    pub fn tick(&mut self) -> SchedResult<EntryId> {
        self.ensure_operational()?;

        let Some(old) = self.table.head() else {
            self.ensure_idle_alive()?;
            self.rearm_timer();
            return Ok(EntryId::IDLE);
        };

        if self.table.ready_len() == 1 {
            self.rearm_timer();
            return Ok(self.table.entry(old).id());
        }

        let previous = {
            let entry = self.table.entry_mut(old);
            entry.pause();
            entry.set_state(ProcessState::Ready);
            entry.id()
        };

        let next = self.table.rotate().unwrap_or(old);
        let entry = self.table.entry_mut(next);
        entry.set_state(ProcessState::Running);
        entry.resume();
        let current = entry.id();
        debug!(from = %previous, to = %current, "quantum expired");

        self.rearm_timer();
        self.debug_verify();
        Ok(current)
    }
}
