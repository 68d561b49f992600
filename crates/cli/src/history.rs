use std::collections::VecDeque;

use crate::command::{CommandError, Recall};

/// Bounded command history with absolute numbering: the first command ever
/// entered is number 1, and numbers stay valid until the entry is evicted.
#[derive(Debug)]
pub struct CommandHistory {
    entries: VecDeque<String>,
    capacity: usize,
    /// Total commands ever recorded.
    recorded: usize,
}

impl CommandHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            recorded: 0,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.into());
        self.recorded += 1;
    }

    /// Number of the oldest retained entry.
    fn first_number(&self) -> usize {
        self.recorded - self.entries.len() + 1
    }

    pub fn recall(&self, recall: Recall) -> Result<&str, CommandError> {
        match recall {
            Recall::Last => self
                .entries
                .back()
                .map(String::as_str)
                .ok_or(CommandError::EmptyHistory),
            Recall::Number(n) => n
                .checked_sub(self.first_number())
                .and_then(|index| self.entries.get(index))
                .map(String::as_str)
                .ok_or(CommandError::NoSuchHistory(n)),
        }
    }

    /// Retained entries with their numbers, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        let first = self.first_number();
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, line)| (first + i, line.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
