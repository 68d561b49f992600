use std::collections::HashSet;

use rrsched_core::{EntryId, ProcessKind, ProcessState};

use crate::table::Membership;

use super::Scheduler;

impl Scheduler {
    /// Check the whole structure: ring shape, membership, states and ids.
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        self.table.check_ring()?;

        let head = self.table.head();
        let mut seen = HashSet::new();
        let mut running = 0usize;

        for (slot, entry) in self.table.ready_iter() {
            if self.table.membership(slot) != Membership::Ready {
                return Err(format!("ready entry {} has no ring link", entry.id()));
            }
            let expected = if Some(slot) == head {
                ProcessState::Running
            } else {
                ProcessState::Ready
            };
            if entry.state() != expected {
                return Err(format!(
                    "ready entry {} is {}, expected {}",
                    entry.id(),
                    entry.state(),
                    expected
                ));
            }
            if entry.state() == ProcessState::Running {
                running += 1;
            }
            seen.insert(entry.id());
        }

        for slot in self.table.blocked_slots() {
            let entry = self.table.entry(slot);
            if self.table.membership(slot) != Membership::Blocked {
                return Err(format!("blocked entry {} is still on the ring", entry.id()));
            }
            if entry.state() != ProcessState::Blocked {
                return Err(format!("blocked entry {} is {}", entry.id(), entry.state()));
            }
            if !seen.insert(entry.id()) {
                return Err(format!("entry {} is in both collections", entry.id()));
            }
        }

        for (slot, entry) in self.table.stored() {
            if !seen.contains(&entry.id()) {
                return Err(format!("entry {} is in neither collection", entry.id()));
            }
            if self.table.lookup(entry.id()) != Some(slot) {
                return Err(format!("entry {} is not indexed at its slot", entry.id()));
            }
        }
        if seen.len() != self.table.len() {
            return Err(format!(
                "{} entries stored but {} reachable from the collections",
                self.table.len(),
                seen.len()
            ));
        }
        if seen.contains(&EntryId::IDLE) {
            return Err("idle id found in the table".to_string());
        }
        if let Some(id) = seen.iter().find(|id| id.0 >= self.next_id) {
            return Err(format!("entry {} was never handed out", id));
        }

        if self.idle.id() != EntryId::IDLE || self.idle.kind() != ProcessKind::Idle {
            return Err(format!("idle entry has id {} and kind {}", self.idle.id(), self.idle.kind()));
        }
        let idle_expected = if self.table.is_ready_empty() {
            ProcessState::Running
        } else {
            ProcessState::Ready
        };
        if self.idle.state() != idle_expected {
            return Err(format!("idle is {}, expected {}", self.idle.state(), idle_expected));
        }
        if self.idle.state() == ProcessState::Running {
            running += 1;
        }

        if running != 1 {
            return Err(format!("{} entries are running", running));
        }
        Ok(())
    }
}
