//! Terminal output
//!
//! Sink that prints job output as-is, plus colored status helpers.

use std::io::Write;

use colored::*;
use tether_client::{JobHandle, JobStatus, OutputSink};

/// Prints job output to stdout verbatim
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSink;

impl OutputSink for TerminalSink {
    fn emit(&self, _handle: &JobHandle, text: &str) {
        let mut stdout = std::io::stdout().lock();
        // A closed stdout must not abort the follow
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Colorize job status for display
pub fn colorize_status(status: &JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Succeeded => status_str.green(),
        JobStatus::Failed => status_str.red(),
        JobStatus::Stopped => status_str.dimmed(),
        JobStatus::Unknown => status_str.normal(),
    }
}
