use rrsched_core::{EntryId, ProcessKind};

use super::{Membership, ProcessTable, SlotId};
use crate::process::ProcessEntry;
use crate::worker::{WorkerError, WorkerHandle};

struct NullWorker;

impl WorkerHandle for NullWorker {
    fn pause(&mut self) -> Result<(), WorkerError> {
        Ok(())
    }
    fn resume(&mut self) -> Result<(), WorkerError> {
        Ok(())
    }
    fn terminate(&mut self) -> Result<(), WorkerError> {
        Ok(())
    }
    fn is_alive(&mut self) -> bool {
        true
    }
    fn os_pid(&self) -> Option<u32> {
        None
    }
}

fn entry(id: u32) -> ProcessEntry {
    ProcessEntry::new(
        EntryId(id),
        format!("p{}", id),
        ProcessKind::Spawned,
        Box::new(NullWorker),
    )
}

/// Table with ready entries 1..=n, returning their slots in order.
fn table_with(n: u32) -> (ProcessTable, Vec<SlotId>) {
    let mut table = ProcessTable::new();
    let slots = (1..=n).map(|id| table.insert_ready(entry(id))).collect();
    (table, slots)
}

fn ready_ids(table: &ProcessTable) -> Vec<u32> {
    table.ready_iter().map(|(_, e)| e.id().0).collect()
}

fn assert_ring(table: &ProcessTable) {
    if let Err(e) = table.check_ring() {
        panic!("ring broken: {}", e);
    }
}

// -- shape -----------------------------------------------------------------

#[test]
fn empty_table_is_a_valid_ring() {
    let table = ProcessTable::new();
    assert_ring(&table);
    assert!(table.is_ready_empty());
    assert_eq!(table.head(), None);
    assert_eq!(table.tail(), None);
    assert_eq!(table.ready_iter().count(), 0);
}

#[test]
fn single_entry_points_at_itself() {
    let (table, slots) = table_with(1);
    assert_ring(&table);
    assert_eq!(table.head(), Some(slots[0]));
    assert_eq!(table.tail(), Some(slots[0]));
}

#[test]
fn insert_appends_in_fifo_order() {
    let (table, slots) = table_with(4);
    assert_ring(&table);
    assert_eq!(ready_ids(&table), vec![1, 2, 3, 4]);
    assert_eq!(table.head(), Some(slots[0]));
    assert_eq!(table.tail(), Some(slots[3]));
}

// -- removal ---------------------------------------------------------------

#[test]
fn remove_only_entry_empties_ring() {
    let (mut table, slots) = table_with(1);
    let removed = table.remove(slots[0]);
    assert_eq!(removed.id(), EntryId(1));
    assert_ring(&table);
    assert!(table.is_ready_empty());
    assert!(table.is_empty());
    assert_eq!(table.lookup(EntryId(1)), None);
}

#[test]
fn remove_head_of_two_leaves_self_loop() {
    let (mut table, slots) = table_with(2);
    table.remove(slots[0]);
    assert_ring(&table);
    assert_eq!(table.head(), Some(slots[1]));
    assert_eq!(table.tail(), Some(slots[1]));
    assert_eq!(ready_ids(&table), vec![2]);
}

#[test]
fn remove_tail_of_two_leaves_self_loop() {
    let (mut table, slots) = table_with(2);
    table.remove(slots[1]);
    assert_ring(&table);
    assert_eq!(table.head(), Some(slots[0]));
    assert_eq!(table.tail(), Some(slots[0]));
    assert_eq!(ready_ids(&table), vec![1]);
}

#[test]
fn remove_head_of_many() {
    let (mut table, slots) = table_with(4);
    table.remove(slots[0]);
    assert_ring(&table);
    assert_eq!(table.head(), Some(slots[1]));
    assert_eq!(table.tail(), Some(slots[3]));
    assert_eq!(ready_ids(&table), vec![2, 3, 4]);
}

#[test]
fn remove_tail_of_many() {
    let (mut table, slots) = table_with(4);
    table.remove(slots[3]);
    assert_ring(&table);
    assert_eq!(table.head(), Some(slots[0]));
    assert_eq!(table.tail(), Some(slots[2]));
    assert_eq!(ready_ids(&table), vec![1, 2, 3]);
}

#[test]
fn remove_interior_splices_neighbours() {
    let (mut table, slots) = table_with(4);
    table.remove(slots[2]);
    assert_ring(&table);
    assert_eq!(table.head(), Some(slots[0]));
    assert_eq!(table.tail(), Some(slots[3]));
    assert_eq!(ready_ids(&table), vec![1, 2, 4]);

    table.remove(slots[1]);
    assert_ring(&table);
    assert_eq!(ready_ids(&table), vec![1, 4]);
}

#[test]
fn remove_all_in_every_order_of_three() {
    let orders = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for order in orders {
        let (mut table, slots) = table_with(3);
        for (n, &i) in order.iter().enumerate() {
            table.remove(slots[i]);
            assert_ring(&table);
            assert_eq!(table.ready_len(), 2 - n);
        }
        assert!(table.is_empty());
    }
}

// -- rotation --------------------------------------------------------------

#[test]
fn rotate_moves_head_to_tail() {
    let (mut table, slots) = table_with(3);
    assert_eq!(table.rotate(), Some(slots[1]));
    assert_ring(&table);
    assert_eq!(table.tail(), Some(slots[0]));
    assert_eq!(ready_ids(&table), vec![2, 3, 1]);
}

#[test]
fn rotate_full_cycle_restores_order() {
    let (mut table, _) = table_with(3);
    for _ in 0..3 {
        table.rotate();
        assert_ring(&table);
    }
    assert_eq!(ready_ids(&table), vec![1, 2, 3]);
}

#[test]
fn rotate_single_and_empty() {
    let (mut table, slots) = table_with(1);
    assert_eq!(table.rotate(), Some(slots[0]));
    assert_ring(&table);

    let mut empty = ProcessTable::new();
    assert_eq!(empty.rotate(), None);
}

// -- blocked membership ----------------------------------------------------

#[test]
fn blocking_moves_between_memberships() {
    let (mut table, slots) = table_with(3);
    table.move_to_blocked(slots[0]);
    assert_ring(&table);
    assert_eq!(table.membership(slots[0]), Membership::Blocked);
    assert_eq!(table.blocked_len(), 1);
    assert_eq!(ready_ids(&table), vec![2, 3]);

    table.move_to_ready(slots[0]);
    assert_ring(&table);
    assert_eq!(table.membership(slots[0]), Membership::Ready);
    assert_eq!(table.blocked_len(), 0);
    assert_eq!(ready_ids(&table), vec![2, 3, 1]);
}

#[test]
fn block_everything_then_release() {
    let (mut table, slots) = table_with(2);
    table.move_to_blocked(slots[1]);
    table.move_to_blocked(slots[0]);
    assert_ring(&table);
    assert!(table.is_ready_empty());
    assert_eq!(table.blocked_slots().collect::<Vec<_>>(), vec![slots[1], slots[0]]);

    table.move_to_ready(slots[0]);
    assert_eq!(table.head(), Some(slots[0]));
    assert_ring(&table);
}

#[test]
fn repeated_moves_are_noops() {
    let (mut table, slots) = table_with(2);
    table.move_to_ready(slots[0]);
    assert_eq!(table.ready_len(), 2);
    table.move_to_blocked(slots[0]);
    table.move_to_blocked(slots[0]);
    assert_eq!(table.blocked_len(), 1);
    assert_eq!(table.ready_len(), 1);
    assert_ring(&table);
}

#[test]
fn remove_blocked_entry() {
    let (mut table, slots) = table_with(2);
    table.move_to_blocked(slots[1]);
    let removed = table.remove(slots[1]);
    assert_eq!(removed.id(), EntryId(2));
    assert_eq!(table.blocked_len(), 0);
    assert_eq!(ready_ids(&table), vec![1]);
    assert_ring(&table);
}

#[test]
fn slots_are_reused_after_removal() {
    let (mut table, slots) = table_with(2);
    table.remove(slots[0]);
    let slot = table.insert_ready(entry(3));
    assert_eq!(slot, slots[0]);
    assert_eq!(table.lookup(EntryId(3)), Some(slot));
    assert_eq!(ready_ids(&table), vec![2, 3]);
    assert_ring(&table);
}

#[test]
fn drain_returns_everything() {
    let (mut table, slots) = table_with(3);
    table.move_to_blocked(slots[1]);
    let drained = table.drain();
    assert_eq!(drained.len(), 3);
    assert!(table.is_empty());
    assert!(table.is_ready_empty());
    assert_eq!(table.blocked_len(), 0);
    assert_ring(&table);
}

#[test]
fn stored_skips_freed_slots_and_spans_memberships() {
    let (mut table, slots) = table_with(4);
    table.move_to_blocked(slots[3]);
    table.remove(slots[1]);
    let stored: Vec<(SlotId, u32)> = table.stored().map(|(slot, e)| (slot, e.id().0)).collect();
    assert_eq!(stored, vec![(slots[0], 1), (slots[2], 3), (slots[3], 4)]);
}
