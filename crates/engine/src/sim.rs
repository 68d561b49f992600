//! In-memory worker backend.
//!
//! Every simulated worker is a record of state flags in a registry shared by
//! the launcher and all handles it creates, so tests can observe exactly
//! which worker the engine paused, resumed or killed. Used by the test
//! suites and by the binary's `--backend sim` mode.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::worker::{WorkerError, WorkerHandle, WorkerLauncher, WorkerSpec};

/// First pid handed out by a [`SimLauncher`].
pub const SIM_PID_BASE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Paused,
    Running,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct SimRecord {
    pub pid: u32,
    pub spec: WorkerSpec,
    pub state: SimState,
    pub pauses: u32,
    pub resumes: u32,
}

#[derive(Debug, Default)]
struct Registry {
    workers: Vec<SimRecord>,
    failing: HashSet<PathBuf>,
}

impl Registry {
    fn record_mut(&mut self, pid: u32) -> Option<&mut SimRecord> {
        let index = pid.checked_sub(SIM_PID_BASE)? as usize;
        self.workers.get_mut(index)
    }
}

/// Launcher whose workers are pure state flags.
#[derive(Debug, Clone, Default)]
pub struct SimLauncher {
    registry: Arc<Mutex<Registry>>,
}

impl SimLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every later `exec` of `path` fail to launch.
    pub fn fail_path(&self, path: impl Into<PathBuf>) {
        self.lock().failing.insert(path.into());
    }

    pub fn record(&self, pid: u32) -> Option<SimRecord> {
        self.lock().record_mut(pid).map(|r| r.clone())
    }

    pub fn state_of(&self, pid: u32) -> Option<SimState> {
        self.record(pid).map(|r| r.state)
    }

    /// Pids of workers currently resumed.
    pub fn running_pids(&self) -> Vec<u32> {
        self.lock()
            .workers
            .iter()
            .filter(|r| r.state == SimState::Running)
            .map(|r| r.pid)
            .collect()
    }

    pub fn idle_pid(&self) -> Option<u32> {
        self.lock()
            .workers
            .iter()
            .find(|r| r.spec == WorkerSpec::Idle)
            .map(|r| r.pid)
    }

    pub fn launched(&self) -> usize {
        self.lock().workers.len()
    }

    /// Kill a worker behind the scheduler's back.
    pub fn kill_externally(&self, pid: u32) {
        if let Some(record) = self.lock().record_mut(pid) {
            record.state = SimState::Terminated;
        }
    }
}

impl WorkerLauncher for SimLauncher {
    fn start(&mut self, spec: &WorkerSpec) -> Result<Box<dyn WorkerHandle>, WorkerError> {
        let mut registry = self.lock();
        if let WorkerSpec::Executable { path } = spec {
            if registry.failing.contains(path) {
                return Err(WorkerError::Launch(format!(
                    "{}: no such file or directory",
                    path.display()
                )));
            }
        }
        let pid = SIM_PID_BASE + registry.workers.len() as u32;
        registry.workers.push(SimRecord {
            pid,
            spec: spec.clone(),
            state: SimState::Paused,
            pauses: 0,
            resumes: 0,
        });
        Ok(Box::new(SimWorker {
            pid,
            registry: Arc::clone(&self.registry),
        }))
    }
}

/// Handle to one simulated worker.
#[derive(Debug)]
pub struct SimWorker {
    pid: u32,
    registry: Arc<Mutex<Registry>>,
}

impl SimWorker {
    fn transition(&self, action: &'static str, to: SimState) -> Result<(), WorkerError> {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let record = registry.record_mut(self.pid).ok_or(WorkerError::Signal {
            action,
            reason: format!("unknown simulated pid {}", self.pid),
        })?;
        if record.state == SimState::Terminated {
            return Err(WorkerError::Exited);
        }
        match to {
            SimState::Paused => record.pauses += 1,
            SimState::Running => record.resumes += 1,
            SimState::Terminated => {}
        }
        record.state = to;
        Ok(())
    }
}

impl WorkerHandle for SimWorker {
    fn pause(&mut self) -> Result<(), WorkerError> {
        self.transition("pause", SimState::Paused)
    }

    fn resume(&mut self) -> Result<(), WorkerError> {
        self.transition("resume", SimState::Running)
    }

    fn terminate(&mut self) -> Result<(), WorkerError> {
        self.transition("terminate", SimState::Terminated)
    }

    fn is_alive(&mut self) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry
            .record_mut(self.pid)
            .is_some_and(|r| r.state != SimState::Terminated)
    }

    fn os_pid(&self) -> Option<u32> {
        Some(self.pid)
    }
}
