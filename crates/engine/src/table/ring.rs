//! Circular ready-ring maintenance on top of the slot arena.

use super::{Link, ProcessTable, SlotId};
use crate::process::ProcessEntry;

impl ProcessTable {
    /// Append `slot` after the current tail.
    pub(super) fn link_tail(&mut self, slot: SlotId) {
        match (self.head, self.tail) {
            (Some(head), Some(tail)) => {
                self.nodes[slot].link = Some(Link { next: head, prev: tail });
                self.set_next(tail, slot);
                self.set_prev(head, slot);
                self.tail = Some(slot);
            }
            _ => {
                self.nodes[slot].link = Some(Link { next: slot, prev: slot });
                self.head = Some(slot);
                self.tail = Some(slot);
            }
        }
        self.ready_len += 1;
    }

    /// Take `slot` off the ring, keeping `tail.next == head` and
    /// `head.prev == tail` for whatever remains.
    pub(super) fn unlink(&mut self, slot: SlotId) {
        let Some(link) = self.nodes[slot].link.take() else {
            return;
        };
        self.ready_len -= 1;

        if self.ready_len == 0 {
            self.head = None;
            self.tail = None;
            return;
        }

        self.set_next(link.prev, link.next);
        self.set_prev(link.next, link.prev);
        if self.head == Some(slot) {
            self.head = Some(link.next);
        }
        if self.tail == Some(slot) {
            self.tail = Some(link.prev);
        }
    }

    /// Advance the ring by one: the old head becomes the tail. Returns the
    /// new head, or `None` on an empty ring.
    pub fn rotate(&mut self) -> Option<SlotId> {
        let head = self.head?;
        let next = self.link_of(head).next;
        self.tail = Some(head);
        self.head = Some(next);
        Some(next)
    }

    /// Walk the ready ring from head to tail.
    pub fn ready_iter(&self) -> ReadyIter<'_> {
        ReadyIter {
            table: self,
            cursor: self.head,
            remaining: self.ready_len,
        }
    }

    /// Verify ring shape: head/tail agree with the length, both ends close
    /// the circle, and `len` steps forwards and backwards come back around.
    pub fn check_ring(&self) -> Result<(), String> {
        let (head, tail) = match (self.head, self.tail) {
            (None, None) if self.ready_len == 0 => return Ok(()),
            (Some(head), Some(tail)) if self.ready_len > 0 => (head, tail),
            (head, tail) => {
                return Err(format!(
                    "head {:?} / tail {:?} inconsistent with ready_len {}",
                    head, tail, self.ready_len
                ));
            }
        };

        let link = |slot: SlotId| -> Result<Link, String> {
            self.nodes
                .get(slot)
                .and_then(|node| node.link)
                .ok_or_else(|| format!("slot {} is on the ring but has no link", slot))
        };

        if link(tail)?.next != head {
            return Err(format!("tail {} does not point forward to head {}", tail, head));
        }
        if link(head)?.prev != tail {
            return Err(format!("head {} does not point back to tail {}", head, tail));
        }

        let mut cursor = head;
        for step in 0..self.ready_len {
            let next = link(cursor)?.next;
            if link(next)?.prev != cursor {
                return Err(format!("slot {} and {} disagree at step {}", cursor, next, step));
            }
            if step + 1 < self.ready_len && next == head {
                return Err(format!("forward walk closed early after {} steps", step + 1));
            }
            cursor = next;
        }
        if cursor != head {
            return Err(format!("forward walk of {} steps ended at {}", self.ready_len, cursor));
        }

        let mut cursor = tail;
        for _ in 0..self.ready_len {
            cursor = link(cursor)?.prev;
        }
        if cursor != tail {
            return Err(format!("backward walk of {} steps ended at {}", self.ready_len, cursor));
        }

        Ok(())
    }

    fn link_of(&self, slot: SlotId) -> Link {
        match self.nodes[slot].link {
            Some(link) => link,
            None => panic!("slot {} is not on the ready ring", slot),
        }
    }

    fn set_next(&mut self, slot: SlotId, next: SlotId) {
        if let Some(link) = self.nodes[slot].link.as_mut() {
            link.next = next;
        }
    }

    fn set_prev(&mut self, slot: SlotId, prev: SlotId) {
        if let Some(link) = self.nodes[slot].link.as_mut() {
            link.prev = prev;
        }
    }
}

/// Iterator over ready entries, head first.
pub struct ReadyIter<'a> {
    table: &'a ProcessTable,
    cursor: Option<SlotId>,
    remaining: usize,
}

impl<'a> Iterator for ReadyIter<'a> {
    type Item = (SlotId, &'a ProcessEntry);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.cursor?;
        let node = self.table.nodes.get(slot)?;
        self.remaining -= 1;
        self.cursor = node.link.map(|link| link.next);
        Some((slot, &node.entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
