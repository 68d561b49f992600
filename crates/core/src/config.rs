use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub scheduler: SchedulerSettings,
    pub worker: WorkerSettings,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `RRSCHED_PROFILE`. When set (e.g. `DEMO`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("RRSCHED_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            scheduler: SchedulerSettings::from_env_profiled(p),
            worker: WorkerSettings::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  scheduler:   quantum={}ms, name_limit={}",
            self.scheduler.quantum_ms,
            self.scheduler.name_limit
        );
        tracing::info!(
            "  worker:      output_interval={}ms, exec_dir={}, shell={}",
            self.worker.output_interval_ms,
            self.worker.exec_dir.display(),
            self.worker.shell
        );
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Length of one preemption quantum in milliseconds.
    pub quantum_ms: u64,
    /// Maximum display length of a spawned process name.
    pub name_limit: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            quantum_ms: 3000,
            name_limit: 8,
        }
    }
}

impl SchedulerSettings {
    fn from_env_profiled(p: &str) -> Self {
        let defaults = Self::default();
        Self {
            quantum_ms: profiled_env_u64(p, "RRSCHED_QUANTUM_MS", defaults.quantum_ms).max(1),
            name_limit: profiled_env_usize(p, "RRSCHED_NAME_LIMIT", defaults.name_limit),
        }
    }

    pub fn quantum(&self) -> Duration {
        Duration::from_millis(self.quantum_ms.max(1))
    }
}

// ── Worker processes ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// How often synthetic workers print their label.
    pub output_interval_ms: u64,
    /// Directory relative executables are resolved against.
    pub exec_dir: PathBuf,
    /// Label printed by the idle worker.
    pub idle_label: String,
    /// Shell used to run synthetic worker loops.
    pub shell: String,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            output_interval_ms: 1000,
            exec_dir: PathBuf::from("."),
            idle_label: "Idle.".to_string(),
            shell: "sh".to_string(),
        }
    }
}

impl WorkerSettings {
    fn from_env_profiled(p: &str) -> Self {
        let defaults = Self::default();
        Self {
            output_interval_ms: profiled_env_u64(
                p,
                "RRSCHED_OUTPUT_INTERVAL_MS",
                defaults.output_interval_ms,
            ),
            exec_dir: PathBuf::from(profiled_env_or(p, "RRSCHED_EXEC_DIR", ".")),
            idle_label: profiled_env_or(p, "RRSCHED_IDLE_LABEL", &defaults.idle_label),
            shell: profiled_env_or(p, "RRSCHED_SHELL", &defaults.shell),
        }
    }

    pub fn output_interval(&self) -> Duration {
        Duration::from_millis(self.output_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_simulator() {
        let config = Config::default();
        assert_eq!(config.scheduler.quantum_ms, 3000);
        assert_eq!(config.scheduler.name_limit, 8);
        assert_eq!(config.worker.output_interval_ms, 1000);
        assert_eq!(config.profile_label(), "default");
    }

    #[test]
    fn quantum_is_never_zero() {
        let settings = SchedulerSettings { quantum_ms: 0, name_limit: 8 };
        assert_eq!(settings.quantum(), Duration::from_millis(1));
    }

    #[test]
    fn profiled_lookup_prefers_prefixed_key() {
        // Only this test reads the environment.
        env::set_var("RRTEST_RRSCHED_NAME_LIMIT", "12");
        env::set_var("RRSCHED_OUTPUT_INTERVAL_MS", "250");
        let config = Config::for_profile("rrtest");
        assert_eq!(config.profile, "RRTEST");
        assert_eq!(config.scheduler.name_limit, 12);
        assert_eq!(config.worker.output_interval_ms, 250);
        env::remove_var("RRTEST_RRSCHED_NAME_LIMIT");
        env::remove_var("RRSCHED_OUTPUT_INTERVAL_MS");
    }
}
