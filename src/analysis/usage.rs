//! Per-run usage accounting.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Accumulates consumed usage units and distinct model identifiers
/// across every completion call in one pipeline run.
///
/// Thread-safe because stages within a wave record concurrently. Each
/// run owns a fresh tracker; sharing one across runs corrupts the
/// accounting.
#[derive(Debug, Default)]
pub struct UsageTracker {
    tokens: AtomicU64,
    models: Mutex<BTreeSet<String>>,
}

/// Point-in-time view of a tracker's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub tokens_used: u64,
    /// Deduplicated, sorted model identifiers.
    pub models: Vec<String>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completion call's consumption.
    pub fn record(&self, tokens: u64, model: &str) {
        self.tokens.fetch_add(tokens, Ordering::Relaxed);
        if !model.is_empty() {
            self.models
                .lock()
                .expect("usage tracker lock")
                .insert(model.to_string());
        }
    }

    /// Clear all counters.
    pub fn reset(&self) {
        self.tokens.store(0, Ordering::Relaxed);
        self.models.lock().expect("usage tracker lock").clear();
    }

    /// Current totals.
    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            tokens_used: self.tokens.load(Ordering::Relaxed),
            models: self
                .models
                .lock()
                .expect("usage tracker lock")
                .iter()
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_tokens_and_dedupes_models() {
        let tracker = UsageTracker::new();
        tracker.record(100, "llama3.2:3b");
        tracker.record(250, "llama3.2:3b");
        tracker.record(50, "mistral:7b");

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.tokens_used, 400);
        assert_eq!(snapshot.models, vec!["llama3.2:3b", "mistral:7b"]);
    }

    #[test]
    fn test_empty_model_ignored() {
        let tracker = UsageTracker::new();
        tracker.record(10, "");
        assert!(tracker.snapshot().models.is_empty());
        assert_eq!(tracker.snapshot().tokens_used, 10);
    }

    #[test]
    fn test_reset_clears_counters() {
        let tracker = UsageTracker::new();
        tracker.record(42, "m");
        tracker.reset();

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.tokens_used, 0);
        assert!(snapshot.models.is_empty());
    }
}
