//! Diagnostic filter log.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Default byte budget of a [`FilterLog`].
pub const DEFAULT_LOG_MAX_BYTES: usize = 512 * 1024;

/// Receives human-readable evaluation diagnostics.
///
/// Supplying a sink in the evaluation context also turns on the per-rule
/// trace in the evaluation result.
pub trait LogSink {
    /// Records one line.
    fn log(&self, entry: &str);
}

/// Bounded in-memory log, shared between evaluations.
///
/// When the total size of the entries exceeds the byte budget the oldest
/// entries are discarded. The newest entry is always kept.
#[derive(Debug)]
pub struct FilterLog {
    max_bytes: usize,
    state: Mutex<LogState>,
}

#[derive(Debug, Default)]
struct LogState {
    entries: VecDeque<String>,
    bytes: usize,
}

impl LogState {
    fn trim(&mut self, max_bytes: usize) {
        while self.bytes > max_bytes && self.entries.len() > 1 {
            if let Some(oldest) = self.entries.pop_front() {
                self.bytes -= oldest.len();
            }
        }
    }
}

impl FilterLog {
    /// Creates a log with the given byte budget.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            state: Mutex::new(LogState::default()),
        }
    }

    /// The byte budget.
    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Changes the byte budget, discarding old entries if needed.
    pub fn set_max_bytes(&mut self, max_bytes: usize) {
        self.max_bytes = max_bytes;
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .trim(max_bytes);
    }

    /// Returns a copy of the entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Total size of the entries in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.lock().bytes
    }

    /// Discards all entries.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.bytes = 0;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LogState> {
        // The state stays consistent even if a writer panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FilterLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_MAX_BYTES)
    }
}

impl LogSink for FilterLog {
    fn log(&self, entry: &str) {
        let mut state = self.lock();
        state.bytes += entry.len();
        state.entries.push_back(entry.to_string());
        state.trim(self.max_bytes);
    }
}
