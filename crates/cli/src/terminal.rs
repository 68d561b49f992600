use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};

use rrsched_engine::{EntryView, ProcessState, Snapshot};

use crate::output_log::ObservedLine;

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const PROMPT: Color = Color::Green;
    const RUNNING: Color = Color::Green;
    const BLOCKED: Color = Color::Yellow;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

/// Palette for worker output prefixes, picked by label.
const LABEL_COLORS: &[Color] = &[
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::Blue,
    Color::DarkCyan,
    Color::DarkYellow,
];

const HELP: &[(&str, &str)] = &[
    ("spawn <name>", "start a synthetic worker that prints its name"),
    ("exec <path>", "start an executable and capture its output"),
    ("block <id>", "move a process to the blocked set"),
    ("run <id>", "return a blocked process to the ready queue"),
    ("kill <id>", "terminate a process"),
    ("ps [--json]", "show the process table"),
    ("log", "show recent worker output"),
    ("history", "list recent commands"),
    ("!! | !<n>", "repeat the last command or command <n>"),
    ("help", "show this help"),
    ("quit | exit", "terminate all workers and leave"),
];

/// Manages terminal output for the interactive REPL.
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    /// Print the startup banner.
    pub fn print_banner(&self, backend: &str, quantum_ms: u64) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("rrsched"),
            ResetColor,
            Print(" - Round-robin process scheduler\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!("Backend: {} | Quantum: {}ms\n", backend, quantum_ms)),
            Print("Type 'help' for commands, 'quit' to exit.\n"),
            Print("---\n"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn prompt(&self) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::PROMPT),
            Print("rrsched> "),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print the process table: ready queue in order, blocked set, idle.
    pub fn print_table(&self, snapshot: &Snapshot) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!(
                "{:<6} {:<16} {:<6} {:<8} {:<8}\n",
                "ID", "NAME", "KIND", "STATE", "PID"
            )),
            Print(format!("{}\n", "-".repeat(48))),
            ResetColor,
        )?;

        for view in snapshot.rows() {
            let color = row_color(view);
            execute!(
                stdout,
                SetForegroundColor(color),
                Print(format_row(view)),
                ResetColor,
            )?;
        }

        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!(
                "{} ready, {} blocked, quantum {}ms\n",
                snapshot.ready.len(),
                snapshot.blocked.len(),
                snapshot.quantum_ms
            )),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_json(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        let mut stdout = io::stdout();
        execute!(stdout, Print(json), Print("\n"))?;
        stdout.flush()?;
        Ok(())
    }

    /// Echo one line of worker output with a colored label prefix.
    pub fn print_observed(&self, line: &ObservedLine) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(label_color(&line.label)),
            Print(format!("{:>8}", truncate(&line.label, 8))),
            ResetColor,
            Print(format!(" | {}\n", line.text)),
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_log(&self, lines: &[&ObservedLine]) -> Result<()> {
        let mut stdout = io::stdout();
        for line in lines {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print(format!("{} {:>6} ", line.at.format("%H:%M:%S"), line.pid)),
                SetForegroundColor(label_color(&line.label)),
                Print(format!("{:>8}", truncate(&line.label, 8))),
                ResetColor,
                Print(format!(" | {}\n", line.text)),
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_history<'a>(&self, entries: impl Iterator<Item = (usize, &'a str)>) -> Result<()> {
        let mut stdout = io::stdout();
        for (number, line) in entries {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print(format!("{:>4}  ", number)),
                ResetColor,
                Print(format!("{}\n", line)),
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_help(&self) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("Commands:\n"),
            ResetColor,
        )?;
        for (usage, description) in HELP {
            execute!(
                stdout,
                Print(format!("  {:<14}", usage)),
                SetForegroundColor(Colors::DIM),
                Print(format!("{}\n", description)),
                ResetColor,
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Print an error message.
    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print an info message.
    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}

fn row_color(view: &EntryView) -> Color {
    match view.state {
        ProcessState::Running => Colors::RUNNING,
        ProcessState::Blocked => Colors::BLOCKED,
        ProcessState::Ready if view.id.is_idle() => Colors::DIM,
        ProcessState::Ready => Color::Reset,
    }
}

fn format_row(view: &EntryView) -> String {
    let pid = view
        .os_pid
        .map(|pid| pid.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<6} {:<16} {:<6} {:<8} {:<8}\n",
        view.id.to_string(),
        view.name,
        view.kind.to_string(),
        view.state.to_string(),
        pid
    )
}

fn label_color(label: &str) -> Color {
    let sum: usize = label.bytes().map(usize::from).sum();
    LABEL_COLORS[sum % LABEL_COLORS.len()]
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let skip = text.chars().count() + 1 - max;
        format!("…{}", text.chars().skip(skip).collect::<String>())
    }
}
