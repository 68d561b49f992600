use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use rrsched_core::config::SchedulerSettings;

use crate::cli::Backend;

/// CLI configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Worker backend: "os" or "sim"
    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// Number of commands kept for `history` and `!<n>`
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Number of worker output lines kept for `log`
    #[serde(default = "default_log_lines")]
    pub log_lines: usize,

    /// Print worker output as it arrives
    #[serde(default)]
    pub echo_output: bool,

    /// Processes spawned at startup
    #[serde(default = "default_startup")]
    pub startup: Vec<String>,

    /// Quantum override (takes precedence over RRSCHED_QUANTUM_MS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantum_ms: Option<u64>,

    /// Name length override (takes precedence over RRSCHED_NAME_LIMIT)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_limit: Option<usize>,
}

fn default_backend() -> Backend {
    Backend::Os
}

fn default_history_size() -> usize {
    10
}

fn default_log_lines() -> usize {
    200
}

fn default_startup() -> Vec<String> {
    vec!["proc_a".to_string(), "proc_b".to_string(), "proc_c".to_string()]
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            history_size: default_history_size(),
            log_lines: default_log_lines(),
            echo_output: false,
            startup: default_startup(),
            quantum_ms: None,
            name_limit: None,
        }
    }
}

impl CliConfig {
    /// Return the default config directory path: ~/.config/rrsched/
    pub fn default_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("rrsched");
        Ok(config_dir)
    }

    /// Return the default config file path.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load config from the given path, or the default path.
    /// Writes and returns the default config if the file does not exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            debug!(?config_path, "Loading config");
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read config: {}", config_path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("failed to parse config: {}", config_path.display()))?;
            Ok(config)
        } else {
            debug!(?config_path, "Config file not found, using defaults");
            let config = Self::default();
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let toml_str = toml::to_string_pretty(&config)
                .context("failed to serialize default config")?;
            std::fs::write(&config_path, toml_str).ok();
            Ok(config)
        }
    }

    /// Resolve scheduler settings.
    /// Priority: cli_override > config file > environment.
    pub fn resolve_scheduler(
        &self,
        env: &SchedulerSettings,
        quantum_override: Option<u64>,
        name_limit_override: Option<usize>,
    ) -> SchedulerSettings {
        SchedulerSettings {
            quantum_ms: quantum_override
                .or(self.quantum_ms)
                .unwrap_or(env.quantum_ms)
                .max(1),
            name_limit: name_limit_override
                .or(self.name_limit)
                .unwrap_or(env.name_limit),
        }
    }

    /// Resolve the backend. Priority: cli_override > config file.
    pub fn resolve_backend(&self, cli_override: Option<Backend>) -> Backend {
        cli_override.unwrap_or(self.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.backend, Backend::Os);
        assert_eq!(config.history_size, 10);
        assert_eq!(config.startup, vec!["proc_a", "proc_b", "proc_c"]);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = CliConfig::load(path.to_str()).unwrap();
        assert_eq!(config.log_lines, 200);
        assert!(path.exists());

        let reloaded = CliConfig::load(path.to_str()).unwrap();
        assert_eq!(reloaded.startup, config.startup);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = \"sim\"\nstartup = []\nquantum_ms = 500\n").unwrap();

        let config = CliConfig::load(path.to_str()).unwrap();
        assert_eq!(config.backend, Backend::Sim);
        assert!(config.startup.is_empty());
        assert_eq!(config.quantum_ms, Some(500));
        assert_eq!(config.history_size, 10);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = \"vm\"\n").unwrap();
        assert!(CliConfig::load(path.to_str()).is_err());
    }

    #[test]
    fn test_resolve_scheduler_precedence() {
        let env = SchedulerSettings {
            quantum_ms: 3000,
            name_limit: 8,
        };
        let mut config = CliConfig::default();
        assert_eq!(config.resolve_scheduler(&env, None, None).quantum_ms, 3000);

        config.quantum_ms = Some(1000);
        config.name_limit = Some(12);
        let resolved = config.resolve_scheduler(&env, None, None);
        assert_eq!(resolved.quantum_ms, 1000);
        assert_eq!(resolved.name_limit, 12);

        let resolved = config.resolve_scheduler(&env, Some(250), Some(4));
        assert_eq!(resolved.quantum_ms, 250);
        assert_eq!(resolved.name_limit, 4);
    }

    #[test]
    fn test_resolve_backend_override() {
        let config = CliConfig::default();
        assert_eq!(config.resolve_backend(None), Backend::Os);
        assert_eq!(config.resolve_backend(Some(Backend::Sim)), Backend::Sim);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = CliConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.backend, config.backend);
        assert_eq!(parsed.startup, config.startup);
    }
}
