//! Accumulation of configuration warnings.
//!
//! Recoverable issues (missing secrets, stale proxy references, dropped
//! services) surface as free-text warnings. The sink is a cheap cloneable
//! handle shared by everything involved in one configuration generation run;
//! writes are fire-and-forget and never a reason to abort.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

/// Maximum number of warnings reported before the rest is summarized.
const MAX_REPORTED: usize = 10;

/// Shared warning sink.
#[derive(Debug, Clone, Default)]
pub struct WarningSink {
    inner: Arc<Mutex<Vec<String>>>,
}

impl WarningSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning. Also emitted through `tracing`.
    pub fn warn(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!("{text}");
        if let Ok(mut sink) = self.inner.lock() {
            sink.push(text);
        }
    }

    /// The recorded warnings, deduplicated in first-occurrence order and
    /// capped at [`MAX_REPORTED`] entries plus a summary trailer.
    #[must_use]
    pub fn collect(&self) -> Vec<String> {
        let Ok(sink) = self.inner.lock() else {
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        let mut unique = Vec::new();
        for text in sink.iter() {
            if seen.insert(text.as_str()) {
                unique.push(text.clone());
            }
        }
        if unique.len() > MAX_REPORTED {
            let omitted = unique.len() - MAX_REPORTED;
            unique.truncate(MAX_REPORTED);
            unique.push(format!("{omitted} further warnings have been omitted"));
        }
        unique
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().map_or(true, |sink| sink.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_deduplicated_in_order() {
        let sink = WarningSink::new();
        sink.warn("b");
        sink.warn("a");
        sink.warn("b");
        assert_eq!(sink.collect(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn overflow_is_summarized() {
        let sink = WarningSink::new();
        for i in 0..13 {
            sink.warn(format!("warning {i}"));
        }
        let collected = sink.collect();
        assert_eq!(collected.len(), MAX_REPORTED + 1);
        assert_eq!(collected.last().unwrap(), "3 further warnings have been omitted");
    }

    #[test]
    fn clones_share_state() {
        let sink = WarningSink::new();
        let clone = sink.clone();
        clone.warn("shared");
        assert_eq!(sink.collect(), vec!["shared".to_string()]);
        assert!(!sink.is_empty());
    }
}
