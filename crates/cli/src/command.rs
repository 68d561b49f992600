//! Operator command parsing and early validation.
//!
//! Everything here is checked again by the scheduler; the point of the
//! early pass is a friendly message without a round trip to the actor.

use std::path::PathBuf;

use thiserror::Error;

use rrsched_engine::EntryId;

use crate::os_worker::resolve_exec_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Spawn(String),
    Exec(PathBuf),
    Block(EntryId),
    Run(EntryId),
    Kill(EntryId),
    Ps { json: bool },
    Log,
    History,
    Recall(Recall),
    Help,
    Quit,
}

/// History reference: `!!` or `!<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recall {
    Last,
    Number(usize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("'{0}' takes a single argument")]
    TooManyArguments(&'static str),

    #[error("invalid process id '{0}'")]
    InvalidId(String),

    #[error("process name '{name}' is longer than {limit} characters")]
    NameTooLong { name: String, limit: usize },

    #[error("executable '{0}' not found")]
    ExecutableNotFound(String),

    #[error("invalid history reference '{0}'")]
    BadRecall(String),

    #[error("no command number {0} in history")]
    NoSuchHistory(usize),

    #[error("history is empty")]
    EmptyHistory,
}

/// Limits the early validation pass checks against.
#[derive(Debug, Clone)]
pub struct Limits {
    pub name_limit: usize,
    pub exec_dir: PathBuf,
}

impl Command {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Empty);
        };

        if let Some(reference) = verb.strip_prefix('!') {
            if words.next().is_some() {
                return Err(CommandError::BadRecall(line.trim().to_string()));
            }
            return parse_recall(reference).map(Command::Recall);
        }

        let args: Vec<&str> = words.collect();
        match verb.to_ascii_lowercase().as_str() {
            "spawn" => single("spawn", &args).map(|name| Command::Spawn(name.to_string())),
            "exec" => single("exec", &args).map(|path| Command::Exec(PathBuf::from(path))),
            "block" => single("block", &args).and_then(parse_id).map(Command::Block),
            "run" => single("run", &args).and_then(parse_id).map(Command::Run),
            "kill" => single("kill", &args).and_then(parse_id).map(Command::Kill),
            "ps" => match args.as_slice() {
                [] => Ok(Command::Ps { json: false }),
                ["--json"] => Ok(Command::Ps { json: true }),
                _ => Err(CommandError::TooManyArguments("ps")),
            },
            "log" => none("log", &args).map(|_| Command::Log),
            "history" => none("history", &args).map(|_| Command::History),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    /// Check names and executable paths before anything is sent.
    pub fn validate(&self, limits: &Limits) -> Result<(), CommandError> {
        match self {
            Command::Spawn(name) if name.chars().count() > limits.name_limit => {
                Err(CommandError::NameTooLong {
                    name: name.clone(),
                    limit: limits.name_limit,
                })
            }
            Command::Exec(path) => {
                if resolve_exec_path(&limits.exec_dir, path).is_file() {
                    Ok(())
                } else {
                    Err(CommandError::ExecutableNotFound(path.display().to_string()))
                }
            }
            _ => Ok(()),
        }
    }

    /// Whether the line belongs in command history.
    pub fn is_recorded(&self) -> bool {
        !matches!(self, Command::Recall(_))
    }
}

fn single<'a>(verb: &'static str, args: &[&'a str]) -> Result<&'a str, CommandError> {
    match args {
        [] => Err(CommandError::MissingArgument(verb)),
        [arg] => Ok(arg),
        _ => Err(CommandError::TooManyArguments(verb)),
    }
}

fn none(verb: &'static str, args: &[&str]) -> Result<(), CommandError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandError::TooManyArguments(verb))
    }
}

fn parse_id(raw: &str) -> Result<EntryId, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidId(raw.to_string()))
}

fn parse_recall(reference: &str) -> Result<Recall, CommandError> {
    if reference == "!" {
        return Ok(Recall::Last);
    }
    reference
        .parse::<usize>()
        .map(Recall::Number)
        .map_err(|_| CommandError::BadRecall(format!("!{}", reference)))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn limits(dir: &Path) -> Limits {
        Limits {
            name_limit: 8,
            exec_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn parses_every_verb() {
        assert_eq!(Command::parse("spawn proc_a"), Ok(Command::Spawn("proc_a".into())));
        assert_eq!(Command::parse("exec ./job"), Ok(Command::Exec("./job".into())));
        assert_eq!(Command::parse("block 2"), Ok(Command::Block(EntryId(2))));
        assert_eq!(Command::parse("run 0x10"), Ok(Command::Run(EntryId(16))));
        assert_eq!(Command::parse("kill 3"), Ok(Command::Kill(EntryId(3))));
        assert_eq!(Command::parse("ps"), Ok(Command::Ps { json: false }));
        assert_eq!(Command::parse("ps --json"), Ok(Command::Ps { json: true }));
        assert_eq!(Command::parse("log"), Ok(Command::Log));
        assert_eq!(Command::parse("history"), Ok(Command::History));
        assert_eq!(Command::parse("help"), Ok(Command::Help));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
    }

    #[test]
    fn verbs_are_case_insensitive_and_whitespace_tolerant() {
        assert_eq!(Command::parse("  SPAWN   a  "), Ok(Command::Spawn("a".into())));
        assert_eq!(Command::parse("Kill\t7"), Ok(Command::Kill(EntryId(7))));
    }

    #[test]
    fn argument_count_is_checked() {
        assert_eq!(Command::parse("spawn"), Err(CommandError::MissingArgument("spawn")));
        assert_eq!(Command::parse("kill 1 2"), Err(CommandError::TooManyArguments("kill")));
        assert_eq!(Command::parse("log now"), Err(CommandError::TooManyArguments("log")));
    }

    #[test]
    fn bad_ids_and_verbs_are_rejected() {
        assert_eq!(Command::parse("block abc"), Err(CommandError::InvalidId("abc".into())));
        assert_eq!(Command::parse("kill -1"), Err(CommandError::InvalidId("-1".into())));
        assert_eq!(Command::parse("launch x"), Err(CommandError::Unknown("launch".into())));
        assert_eq!(Command::parse("   "), Err(CommandError::Empty));
    }

    #[test]
    fn history_references() {
        assert_eq!(Command::parse("!!"), Ok(Command::Recall(Recall::Last)));
        assert_eq!(Command::parse("!4"), Ok(Command::Recall(Recall::Number(4))));
        assert!(matches!(Command::parse("!x"), Err(CommandError::BadRecall(_))));
        assert!(!Command::Recall(Recall::Last).is_recorded());
        assert!(Command::Help.is_recorded());
    }

    #[test]
    fn name_limit_checked_before_sending() {
        let dir = tempfile::tempdir().unwrap();
        let limits = limits(dir.path());
        assert!(Command::Spawn("abcdefgh".into()).validate(&limits).is_ok());
        assert_eq!(
            Command::Spawn("abcdefghi".into()).validate(&limits),
            Err(CommandError::NameTooLong {
                name: "abcdefghi".into(),
                limit: 8
            })
        );
    }

    #[test]
    fn exec_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("job"), "#!/bin/sh\n").unwrap();
        let limits = limits(dir.path());

        assert!(Command::Exec("job".into()).validate(&limits).is_ok());
        assert_eq!(
            Command::Exec("nope".into()).validate(&limits),
            Err(CommandError::ExecutableNotFound("nope".into()))
        );
    }
}
