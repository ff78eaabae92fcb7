//! Bounded job log

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;

/// Maximum number of lines kept for a job
pub const LOG_CAPACITY: usize = 600;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B\[[0-9;?]*[ -/]*[@-~]").expect("valid ANSI escape regex"));

/// Strip terminal escape sequences, carriage returns and trailing whitespace.
pub fn sanitize_line(line: &str) -> String {
    let without_cr = line.replace('\r', "");
    ANSI_ESCAPE
        .replace_all(&without_cr, "")
        .trim_end()
        .to_string()
}

/// Ordered log that evicts its oldest line once full
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `line`, evicting the oldest lines beyond capacity
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    /// Replace the contents with `seed`
    pub fn reset<I, S>(&mut self, seed: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.clear();
        for line in seed {
            self.push(line);
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// All lines joined with `\n`
    pub fn joined(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }
}
