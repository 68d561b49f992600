//! Round-robin scheduler engine.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, accessors, idle fallback and shutdown
//! - `transitions`: spawn/exec/block/run/kill
//! - `preempt`: the quantum tick
//! - `invariants`: whole-structure consistency check

mod core;
mod invariants;
mod preempt;
mod transitions;

pub use self::core::Scheduler;
