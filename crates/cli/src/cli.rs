use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// Which worker implementation backs scheduled processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Real child processes controlled with SIGSTOP/SIGCONT
    Os,
    /// In-memory workers, no processes are started
    Sim,
}

/// Interactive round-robin process scheduler.
///
/// Starts an idle worker, optionally spawns the configured startup
/// processes, and then reads scheduler commands from stdin.
#[derive(Parser, Debug)]
#[command(name = "rrsched", version, about = "Round-robin process scheduler simulator")]
pub struct CliArgs {
    /// Path to config file (default: ~/.config/rrsched/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Worker backend (overrides config file)
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Preemption quantum in milliseconds (overrides config file and env)
    #[arg(long)]
    pub quantum_ms: Option<u64>,

    /// Maximum length of a spawned process name
    #[arg(long)]
    pub name_limit: Option<usize>,

    /// Do not spawn the configured startup processes
    #[arg(long)]
    pub no_startup: bool,

    /// Echo worker output to the terminal as it arrives
    #[arg(long)]
    pub echo: bool,
}
