use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One line of worker output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedLine {
    pub pid: u32,
    pub label: String,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ObservedLine {
    pub fn new(pid: u32, label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            pid,
            label: label.into(),
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Bounded ring of the most recent worker output.
#[derive(Debug)]
pub struct OutputLog {
    lines: VecDeque<ObservedLine>,
    capacity: usize,
}

impl OutputLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a line, evicting the oldest when full.
    pub fn push(&mut self, line: ObservedLine) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// The last `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<&ObservedLine> {
        let skip = self.lines.len().saturating_sub(n);
        self.lines.iter().skip(skip).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
