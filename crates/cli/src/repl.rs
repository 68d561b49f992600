use anyhow::Result;
use tracing::{info, warn};

use rrsched_engine::{SchedError, SchedResult};

use crate::actor::SchedulerHandle;
use crate::command::{Command, CommandError, Limits};
use crate::history::CommandHistory;
use crate::output_log::{ObservedLine, OutputLog};
use crate::terminal::Terminal;

/// Lines shown by `log`.
const LOG_TAIL: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One operator session: command history, recent worker output and the
/// scheduler handle every command goes through.
pub struct Repl {
    handle: SchedulerHandle,
    terminal: Terminal,
    limits: Limits,
    history: CommandHistory,
    log: OutputLog,
    echo: bool,
}

impl Repl {
    pub fn new(
        handle: SchedulerHandle,
        terminal: Terminal,
        limits: Limits,
        history_size: usize,
        log_lines: usize,
        echo: bool,
    ) -> Self {
        Self {
            handle,
            terminal,
            limits,
            history: CommandHistory::new(history_size),
            log: OutputLog::new(log_lines),
            echo,
        }
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    /// Record a line of worker output, echoing it when enabled.
    pub fn observe(&mut self, line: ObservedLine) -> Result<()> {
        if self.echo {
            self.terminal.print_observed(&line)?;
        }
        self.log.push(line);
        Ok(())
    }

    /// Spawn the startup processes, reporting but not stopping on failures.
    pub async fn spawn_startup(&mut self, names: &[String]) -> Result<Flow> {
        for name in names {
            let result = self
                .handle
                .spawn(name)
                .await
                .map(|id| format!("spawned '{}' as process {}", name, id));
            if self.report(result)? == Flow::Quit {
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Parse, validate and run one input line.
    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }

        let (text, command) = match self.resolve(line) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.terminal.print_error(&e.to_string())?;
                return Ok(Flow::Continue);
            }
        };
        if text != line {
            self.terminal.print_info(&text)?;
        }
        self.history.push(text);
        self.execute(command).await
    }

    /// Expand history references and run the early validation pass.
    fn resolve(&self, line: &str) -> Result<(String, Command), CommandError> {
        let command = Command::parse(line)?;
        let (text, command) = match command {
            Command::Recall(recall) => {
                let text = self.history.recall(recall)?.to_string();
                let command = Command::parse(&text)?;
                (text, command)
            }
            command => (line.to_string(), command),
        };
        if !command.is_recorded() {
            return Err(CommandError::BadRecall(text));
        }
        command.validate(&self.limits)?;
        Ok((text, command))
    }

    async fn execute(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Spawn(name) => {
                let result = self.handle.spawn(&name).await;
                self.report(result.map(|id| format!("spawned '{}' as process {}", name, id)))
            }
            Command::Exec(path) => {
                let shown = path.display().to_string();
                let result = self.handle.exec(path).await;
                self.report(result.map(|id| format!("started '{}' as process {}", shown, id)))
            }
            Command::Block(id) => {
                let result = self.handle.block(id).await;
                self.report(result.map(|_| format!("process {} blocked", id)))
            }
            Command::Run(id) => {
                let result = self.handle.run(id).await;
                self.report(result.map(|_| format!("process {} is ready", id)))
            }
            Command::Kill(id) => {
                let result = self.handle.kill(id).await;
                self.report(result.map(|_| format!("process {} killed", id)))
            }
            Command::Ps { json } => match self.handle.snapshot().await {
                Ok(snapshot) if json => {
                    self.terminal.print_json(&snapshot)?;
                    Ok(Flow::Continue)
                }
                Ok(snapshot) => {
                    self.terminal.print_table(&snapshot)?;
                    Ok(Flow::Continue)
                }
                Err(e) => self.report::<String>(Err(e)),
            },
            Command::Log if self.log.is_empty() => {
                self.terminal.print_info("No worker output yet.")?;
                Ok(Flow::Continue)
            }
            Command::Log => {
                self.terminal.print_log(&self.log.tail(LOG_TAIL))?;
                Ok(Flow::Continue)
            }
            Command::History if self.history.is_empty() => {
                self.terminal.print_info("No commands yet.")?;
                Ok(Flow::Continue)
            }
            Command::History => {
                self.terminal.print_history(self.history.iter())?;
                Ok(Flow::Continue)
            }
            Command::Help => {
                self.terminal.print_help()?;
                Ok(Flow::Continue)
            }
            Command::Quit => Ok(Flow::Quit),
            Command::Recall(_) => Ok(Flow::Continue),
        }
    }

    /// Print the outcome of a scheduler call. Losing the actor ends the
    /// session; every other error is shown and the session goes on.
    fn report<T: AsRef<str>>(&self, result: SchedResult<T>) -> Result<Flow> {
        match result {
            Ok(message) => {
                info!("{}", message.as_ref());
                self.terminal.print_info(message.as_ref())?;
                Ok(Flow::Continue)
            }
            Err(e @ (SchedError::ActorGone | SchedError::IdleLost)) => {
                warn!(error = %e, "scheduler unavailable");
                self.terminal.print_error(&e.to_string())?;
                Ok(Flow::Quit)
            }
            Err(e) => {
                self.terminal.print_error(&e.to_string())?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Ask the actor to terminate every worker.
    pub async fn shutdown(&self) {
        info!(
            commands = self.history.len(),
            output_lines = self.log.len(),
            "Closing session"
        );
        if let Err(e) = self.handle.shutdown().await {
            warn!(error = %e, "scheduler already stopped");
        }
    }
}
