//! Scrapes the client transcript for per-node outcomes.
//!
//! Lines are matched by substring, so timestamps, check marks or other
//! decorations around a marker do not matter. Every occurrence counts.

use crate::NODE_COUNT;
use log::warn;

/// Printed by the client once per upload it saw completed.
pub const SUCCESS_MARKER: &str = "✓ Success!";

pub fn processed_marker(node: usize) -> String {
    format!("Server {} processed request", node)
}

pub fn declined_marker(node: usize) -> String {
    format!("Server {} declined:", node)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogRecord {
    /// Indexed by node id - 1.
    pub processed: [u64; NODE_COUNT],
    pub declined: [u64; NODE_COUNT],
    pub successes: u64,
    /// `attempted - successes`, never read from the transcript.
    pub failures: u64,
    pub attempted: u64,
}

impl LogRecord {
    pub fn total_processed(&self) -> u64 {
        self.processed.iter().sum()
    }

    pub fn total_declined(&self) -> u64 {
        self.declined.iter().sum()
    }
}

/// Builds a [`LogRecord`] from the captured client output.
pub fn analyze(output: &str, attempted: u64) -> LogRecord {
    let mut record = LogRecord {
        attempted,
        ..LogRecord::default()
    };

    for node in 1..=NODE_COUNT {
        record.processed[node - 1] = count(output, &processed_marker(node));
        record.declined[node - 1] = count(output, &declined_marker(node));
    }
    record.successes = count(output, SUCCESS_MARKER);

    if record.successes > attempted {
        warn!(
            "Transcript reports {} successes for {} uploads, clamping failures to 0",
            record.successes, attempted
        );
    }
    record.failures = attempted.saturating_sub(record.successes);
    record
}

fn count(haystack: &str, needle: &str) -> u64 {
    haystack.matches(needle).count() as u64
}
