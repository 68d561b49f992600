//! Process table: every user entry lives in one arena slot and belongs to
//! exactly one of two memberships.
//!
//! - the **ready ring**, a circular doubly-linked list threaded through the
//!   slots with explicit `head`/`tail`; the head is the running entry
//! - the **blocked set**, unordered as far as scheduling is concerned
//!
//! Slot handles are plain indices, so relinking never invalidates anything
//! the scheduler holds.

mod arena;
mod ring;
#[cfg(test)]
mod tests;

use std::collections::HashMap;

use indexmap::IndexSet;

use rrsched_core::EntryId;

use crate::process::ProcessEntry;

pub use self::arena::Arena;
pub use self::ring::ReadyIter;

/// Handle to an occupied arena slot.
pub type SlotId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Ready,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) next: SlotId,
    pub(crate) prev: SlotId,
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) entry: ProcessEntry,
    /// `Some` while on the ready ring, `None` while blocked.
    pub(crate) link: Option<Link>,
}

#[derive(Debug, Default)]
pub struct ProcessTable {
    pub(crate) nodes: Arena<Node>,
    index: HashMap<EntryId, SlotId>,
    pub(crate) head: Option<SlotId>,
    pub(crate) tail: Option<SlotId>,
    pub(crate) ready_len: usize,
    blocked: IndexSet<SlotId>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, id: EntryId) -> Option<SlotId> {
        self.index.get(&id).copied()
    }

    pub fn entry(&self, slot: SlotId) -> &ProcessEntry {
        &self.nodes[slot].entry
    }

    pub fn entry_mut(&mut self, slot: SlotId) -> &mut ProcessEntry {
        &mut self.nodes[slot].entry
    }

    pub fn membership(&self, slot: SlotId) -> Membership {
        if self.nodes[slot].link.is_some() {
            Membership::Ready
        } else {
            Membership::Blocked
        }
    }

    pub fn head(&self) -> Option<SlotId> {
        self.head
    }

    pub fn tail(&self) -> Option<SlotId> {
        self.tail
    }

    pub fn ready_len(&self) -> usize {
        self.ready_len
    }

    pub fn blocked_len(&self) -> usize {
        self.blocked.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_ready_empty(&self) -> bool {
        self.ready_len == 0
    }

    /// Store a new entry and append it to the ready ring tail.
    pub fn insert_ready(&mut self, entry: ProcessEntry) -> SlotId {
        let id = entry.id();
        let slot = self.nodes.insert(Node { entry, link: None });
        self.index.insert(id, slot);
        self.link_tail(slot);
        slot
    }

    /// Move a ready entry into the blocked set. No-op if already blocked.
    pub fn move_to_blocked(&mut self, slot: SlotId) {
        if self.membership(slot) == Membership::Blocked {
            return;
        }
        self.unlink(slot);
        self.blocked.insert(slot);
    }

    /// Move a blocked entry to the ready ring tail. No-op if already ready.
    pub fn move_to_ready(&mut self, slot: SlotId) {
        if self.membership(slot) == Membership::Ready {
            return;
        }
        self.blocked.shift_remove(&slot);
        self.link_tail(slot);
    }

    /// Detach an entry from whichever membership holds it and hand it back.
    pub fn remove(&mut self, slot: SlotId) -> ProcessEntry {
        match self.membership(slot) {
            Membership::Ready => self.unlink(slot),
            Membership::Blocked => {
                self.blocked.shift_remove(&slot);
            }
        }
        let Some(node) = self.nodes.remove(slot) else {
            unreachable!("membership lookup already checked slot {}", slot);
        };
        self.index.remove(&node.entry.id());
        node.entry
    }

    /// Every stored entry in slot order, whatever its membership.
    pub fn stored(&self) -> impl Iterator<Item = (SlotId, &ProcessEntry)> + '_ {
        self.nodes.iter().map(|(slot, node)| (slot, &node.entry))
    }

    pub fn blocked_slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.blocked.iter().copied()
    }

    /// Empty the table, returning every entry.
    pub fn drain(&mut self) -> Vec<ProcessEntry> {
        self.index.clear();
        self.blocked.clear();
        self.head = None;
        self.tail = None;
        self.ready_len = 0;
        self.nodes.drain().into_iter().map(|node| node.entry).collect()
    }
}
