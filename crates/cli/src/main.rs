mod actor;
mod cli;
mod command;
mod config;
mod history;
mod os_worker;
mod output_log;
mod repl;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};

use rrsched_core::config::{load_dotenv, Config};
use rrsched_engine::sim::SimLauncher;
use rrsched_engine::{Scheduler, WorkerLauncher};

use crate::actor::SchedulerActor;
use crate::cli::{Backend, CliArgs};
use crate::command::Limits;
use crate::config::CliConfig;
use crate::os_worker::OsLauncher;
use crate::repl::{Flow, Repl};
use crate::terminal::Terminal;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let args = CliArgs::parse();
    let terminal = Terminal::new();

    // Load config: CLI flags > config file > environment
    let cli_config = CliConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;
    let mut config = Config::from_env();
    config.scheduler =
        cli_config.resolve_scheduler(&config.scheduler, args.quantum_ms, args.name_limit);
    config.log_summary();

    let backend = cli_config.resolve_backend(args.backend);
    let (observed_tx, mut observed_rx) = mpsc::unbounded_channel();
    let launcher: Box<dyn WorkerLauncher> = match backend {
        Backend::Os => Box::new(OsLauncher::new(config.worker.clone(), observed_tx)),
        Backend::Sim => Box::new(SimLauncher::new()),
    };
    info!(?backend, "Starting scheduler");

    let scheduler = Scheduler::new(config.scheduler.clone(), launcher)
        .context("failed to start the idle worker")?;
    let (actor, handle) = SchedulerActor::new(scheduler);
    let actor_task = tokio::spawn(async move {
        if actor.run().await.is_err() {
            // Workers are already terminated; nothing left to schedule on.
            std::process::exit(1);
        }
    });

    let limits = Limits {
        name_limit: config.scheduler.name_limit,
        exec_dir: config.worker.exec_dir.clone(),
    };
    let mut repl = Repl::new(
        handle,
        terminal,
        limits,
        cli_config.history_size,
        cli_config.log_lines,
        args.echo || cli_config.echo_output,
    );

    let backend_label = match backend {
        Backend::Os => "os",
        Backend::Sim => "sim",
    };
    repl.terminal()
        .print_banner(backend_label, config.scheduler.quantum_ms)?;

    let mut flow = Flow::Continue;
    if !args.no_startup {
        flow = repl.spawn_startup(&cli_config.startup).await?;
    }

    // REPL loop
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if flow == Flow::Continue {
        repl.terminal().prompt()?;
    }
    while flow == Flow::Continue {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("failed to read from stdin")? {
                    Some(line) => {
                        flow = repl.handle_line(&line).await?;
                        if flow == Flow::Continue {
                            repl.terminal().prompt()?;
                        }
                    }
                    None => flow = Flow::Quit,
                }
            }
            Some(observed) = observed_rx.recv() => {
                repl.observe(observed)?;
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                flow = Flow::Quit;
            }
        }
    }

    repl.shutdown().await;
    if let Err(e) = actor_task.await {
        error!(error = %e, "scheduler task failed");
    }
    repl.terminal().print_info("Goodbye.")?;
    Ok(())
}
