//! Output sinks
//!
//! Progress text tailed from a running job is handed to an `OutputSink`.
//! The follower does not interpret the text.

use std::sync::{Arc, Mutex};

use tether_core::domain::job::JobHandle;
use tracing::info;

/// Destination for progress output of a followed job
pub trait OutputSink: Send + Sync {
    /// Emits a chunk of new output
    ///
    /// Chunks are the text appended to the remote log since the previous
    /// chunk; they may contain several lines or end mid-line.
    fn emit(&self, handle: &JobHandle, text: &str);
}

/// Sink that logs every line as a tracing event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn emit(&self, handle: &JobHandle, text: &str) {
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            info!(
                job = %handle.name,
                submission_id = %handle.submission_id,
                "{}",
                line
            );
        }
    }
}

/// Sink that collects output in memory
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl OutputSink for MemorySink {
    fn emit(&self, _handle: &JobHandle, text: &str) {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_str(text);
    }
}
