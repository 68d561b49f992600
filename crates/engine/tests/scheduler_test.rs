/// Integration tests driving the scheduler through long operation sequences
/// against the simulated worker backend, checking the whole structure after
/// every step.

use std::collections::BTreeSet;
use std::path::Path;

use rrsched_core::config::SchedulerSettings;
use rrsched_engine::sim::{SimLauncher, SimState};
use rrsched_engine::{EntryId, ProcessState, SchedError, Scheduler};

// ============================================================================
// Test Helpers
// ============================================================================

/// Small deterministic xorshift generator so sequences are reproducible.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn make_scheduler() -> (Scheduler, SimLauncher) {
    let launcher = SimLauncher::new();
    let settings = SchedulerSettings {
        quantum_ms: 50,
        name_limit: 8,
    };
    let scheduler = Scheduler::new(settings, Box::new(launcher.clone())).unwrap();
    (scheduler, launcher)
}

/// Structural invariants plus agreement with the simulated workers: exactly
/// one worker is resumed and it is the one the scheduler says is running.
fn verify(scheduler: &Scheduler, launcher: &SimLauncher, step: usize) {
    if let Err(e) = scheduler.check_invariants() {
        panic!("step {}: {}", step, e);
    }
    let snapshot = scheduler.snapshot();
    let running = snapshot
        .find(snapshot.running)
        .and_then(|view| view.os_pid)
        .unwrap();
    assert_eq!(launcher.running_pids(), vec![running], "step {}", step);

    let running_rows = snapshot
        .rows()
        .filter(|view| view.state == ProcessState::Running)
        .count();
    assert_eq!(running_rows, 1, "step {}", step);
}

/// Pick an id that is usually live, sometimes stale or idle.
fn pick_id(rng: &mut XorShift, live: &BTreeSet<EntryId>, next_unissued: u32) -> EntryId {
    if live.is_empty() || rng.below(5) == 0 {
        return EntryId(rng.below(u64::from(next_unissued) + 1) as u32);
    }
    let index = rng.below(live.len() as u64) as usize;
    *live.iter().nth(index).unwrap()
}

// ============================================================================
// Randomized sequences
// ============================================================================

#[test]
fn random_sequences_preserve_invariants() {
    for seed in 1..=20u64 {
        let (mut scheduler, launcher) = make_scheduler();
        launcher.fail_path("./broken");
        let mut rng = XorShift(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let mut live: BTreeSet<EntryId> = BTreeSet::new();
        let mut issued = 0u32;

        for step in 0..400 {
            match rng.below(7) {
                0 | 1 => {
                    let id = scheduler.spawn(&format!("p{}", step % 100)).unwrap();
                    issued += 1;
                    assert_eq!(id, EntryId(issued));
                    live.insert(id);
                }
                2 => {
                    if rng.below(3) == 0 {
                        let err = scheduler.exec(Path::new("./broken")).unwrap_err();
                        assert!(matches!(err, SchedError::LaunchFailed { .. }));
                    } else {
                        let id = scheduler.exec(Path::new("./job")).unwrap();
                        issued += 1;
                        live.insert(id);
                    }
                }
                3 => {
                    let id = pick_id(&mut rng, &live, issued);
                    match scheduler.block(id) {
                        Ok(()) => assert_eq!(scheduler.state_of(id), Some(ProcessState::Blocked)),
                        Err(SchedError::AlreadyBlocked(_)) => {
                            assert_eq!(scheduler.state_of(id), Some(ProcessState::Blocked))
                        }
                        Err(SchedError::NotFound(_)) => assert!(!live.contains(&id)),
                        Err(e) => panic!("step {}: unexpected {}", step, e),
                    }
                }
                4 => {
                    let id = pick_id(&mut rng, &live, issued);
                    match scheduler.run(id) {
                        Ok(()) => assert_ne!(scheduler.state_of(id), Some(ProcessState::Blocked)),
                        Err(SchedError::AlreadyReady(_)) => {}
                        Err(SchedError::NotFound(_)) => assert!(!live.contains(&id)),
                        Err(e) => panic!("step {}: unexpected {}", step, e),
                    }
                }
                5 => {
                    let id = pick_id(&mut rng, &live, issued);
                    match scheduler.kill(id) {
                        Ok(()) => assert!(live.remove(&id)),
                        Err(SchedError::NotFound(_)) => assert!(!live.contains(&id)),
                        Err(e) => panic!("step {}: unexpected {}", step, e),
                    }
                }
                _ => {
                    scheduler.tick().unwrap();
                }
            }
            verify(&scheduler, &launcher, step);
            assert_eq!(scheduler.len(), live.len());
        }

        scheduler.shutdown();
        assert!(launcher.running_pids().is_empty());
    }
}

#[test]
fn ticking_cycles_ready_queue_fairly() {
    let (mut scheduler, launcher) = make_scheduler();
    let ids: Vec<EntryId> = ["a", "b", "c", "d"]
        .iter()
        .map(|name| scheduler.spawn(name).unwrap())
        .collect();
    scheduler.block(ids[2]).unwrap();

    let mut visits = std::collections::HashMap::new();
    for step in 0..30 {
        let running = scheduler.tick().unwrap();
        *visits.entry(running).or_insert(0) += 1;
        verify(&scheduler, &launcher, step);
    }
    assert_eq!(visits.get(&ids[0]), Some(&10));
    assert_eq!(visits.get(&ids[1]), Some(&10));
    assert_eq!(visits.get(&ids[3]), Some(&10));
    assert_eq!(visits.get(&ids[2]), None);
}

#[test]
fn draining_the_queue_returns_to_idle_each_time() {
    let (mut scheduler, launcher) = make_scheduler();
    for round in 0..5 {
        let a = scheduler.spawn("a").unwrap();
        let b = scheduler.spawn("b").unwrap();
        scheduler.block(a).unwrap();
        scheduler.kill(b).unwrap();
        assert_eq!(scheduler.running(), EntryId::IDLE, "round {}", round);
        verify(&scheduler, &launcher, round);

        scheduler.run(a).unwrap();
        assert_eq!(scheduler.running(), a);
        scheduler.kill(a).unwrap();
        verify(&scheduler, &launcher, round);
    }
    assert!(scheduler.is_empty());
    assert_eq!(launcher.state_of(launcher.idle_pid().unwrap()), Some(SimState::Running));
}

#[test]
fn killing_idle_externally_poisons_on_next_fallback() {
    let (mut scheduler, launcher) = make_scheduler();
    let a = scheduler.spawn("a").unwrap();
    let b = scheduler.spawn("b").unwrap();
    launcher.kill_externally(launcher.idle_pid().unwrap());

    scheduler.tick().unwrap();
    scheduler.kill(b).unwrap();
    assert_eq!(scheduler.running(), a);

    let err = scheduler.block(a).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(scheduler.state_of(a), Some(ProcessState::Running));
    assert_eq!(scheduler.run(a), Err(SchedError::IdleLost));
}
