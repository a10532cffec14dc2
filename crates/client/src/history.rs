//! Browser-history boundary.

use std::sync::Arc;

use parking_lot::Mutex;

/// Where the filter state is mirrored. Implementations replace the current
/// entry; they never push a new one.
pub trait HistoryPort: Send {
    fn replace(&mut self, query: &str);
}

/// In-memory history that keeps every replaced query.
///
/// Clones share the same log, so a caller can keep a handle while the
/// controller owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    entries: Arc<Mutex<Vec<String>>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The query currently in the address bar, if any was written.
    pub fn current(&self) -> Option<String> {
        self.entries.lock().last().cloned()
    }

    /// Every query written, oldest first.
    pub fn replacements(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

impl HistoryPort for MemoryHistory {
    fn replace(&mut self, query: &str) {
        self.entries.lock().push(query.to_string());
    }
}
