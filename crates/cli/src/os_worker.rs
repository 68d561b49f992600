//! Worker backend built on real child processes.
//!
//! Synthetic and idle workers are small shell loops that print their label
//! every output interval; executables are started directly. Output readers
//! are attached first, then the child is stopped with `SIGSTOP` and is
//! resumed, stopped and killed by the scheduler from then on. A program that
//! finishes before the stop lands still counts as launched.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use rrsched_core::config::WorkerSettings;
use rrsched_engine::{WorkerError, WorkerHandle, WorkerLauncher, WorkerSpec};

use crate::output_log::ObservedLine;

/// Prints `$1` every `$2` seconds, forever.
const LOOP_SCRIPT: &str = r#"while :; do printf '%s\n' "$1"; sleep "$2"; done"#;

pub struct OsLauncher {
    settings: WorkerSettings,
    observer: UnboundedSender<ObservedLine>,
}

impl OsLauncher {
    pub fn new(settings: WorkerSettings, observer: UnboundedSender<ObservedLine>) -> Self {
        Self { settings, observer }
    }

    /// Resolve an executable path against the configured exec directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        resolve_exec_path(&self.settings.exec_dir, path)
    }

    fn loop_command(&self, label: &str) -> Command {
        let secs = format!("{:.3}", self.settings.output_interval().as_secs_f64());
        let mut cmd = Command::new(&self.settings.shell);
        cmd.arg("-c")
            .arg(LOOP_SCRIPT)
            .arg("rrsched-worker")
            .arg(label)
            .arg(secs);
        cmd
    }
}

/// Relative paths are taken relative to `exec_dir`; absolute paths are kept.
pub fn resolve_exec_path(exec_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        exec_dir.join(path)
    }
}

impl WorkerLauncher for OsLauncher {
    fn start(&mut self, spec: &WorkerSpec) -> Result<Box<dyn WorkerHandle>, WorkerError> {
        let (mut cmd, label) = match spec {
            WorkerSpec::Idle => {
                let label = self.settings.idle_label.clone();
                (self.loop_command(&label), label)
            }
            WorkerSpec::Synthetic { label } => (self.loop_command(label), label.clone()),
            WorkerSpec::Executable { path } => {
                let resolved = self.resolve(path);
                if !resolved.is_file() {
                    return Err(WorkerError::Launch(format!(
                        "{}: no such file",
                        resolved.display()
                    )));
                }
                (Command::new(&resolved), path.display().to_string())
            }
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| WorkerError::Launch(e.to_string()))?;
        let pid = child
            .id()
            .ok_or_else(|| WorkerError::Launch("child exited during startup".to_string()))?;

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, pid, label.clone(), self.observer.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, pid, label.clone(), self.observer.clone());
        }

        let mut worker = OsWorker { child, pid, label };
        match worker.pause() {
            Ok(()) => debug!(pid, label = %worker.label, "worker started"),
            // Short-lived programs can finish before the stop lands; they
            // still ran, and their output is already being forwarded.
            Err(WorkerError::Exited) => {
                debug!(pid, label = %worker.label, "worker exited during startup")
            }
            Err(e) => return Err(e),
        }
        Ok(Box::new(worker))
    }
}

fn forward_lines<R>(stream: R, pid: u32, label: String, observer: UnboundedSender<ObservedLine>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if observer.send(ObservedLine::new(pid, label.clone(), line)).is_err() {
                break;
            }
        }
    });
}

/// One child process under scheduler control.
pub struct OsWorker {
    child: Child,
    pid: u32,
    label: String,
}

impl OsWorker {
    fn signal(&mut self, action: &'static str, signal: &str) -> Result<(), WorkerError> {
        if !self.is_alive() {
            return Err(WorkerError::Exited);
        }
        let status = std::process::Command::new("kill")
            .args([signal, &self.pid.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| WorkerError::Signal {
                action,
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(WorkerError::Signal {
                action,
                reason: format!("kill {} {} exited with {}", signal, self.pid, status),
            });
        }
        Ok(())
    }
}

impl WorkerHandle for OsWorker {
    fn pause(&mut self) -> Result<(), WorkerError> {
        self.signal("pause", "-STOP")
    }

    fn resume(&mut self) -> Result<(), WorkerError> {
        self.signal("resume", "-CONT")
    }

    fn terminate(&mut self) -> Result<(), WorkerError> {
        if !self.is_alive() {
            return Err(WorkerError::Exited);
        }
        self.child.start_kill().map_err(|e| WorkerError::Signal {
            action: "terminate",
            reason: e.to_string(),
        })
    }

    fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) => false,
            Err(e) => {
                warn!(pid = self.pid, error = %e, "could not poll worker");
                false
            }
        }
    }

    fn os_pid(&self) -> Option<u32> {
        Some(self.pid)
    }
}
