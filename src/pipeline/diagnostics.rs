//! Non-fatal diagnostics emitted while fitting and transforming.
//!
//! Warnings never alter returned data. Each one is logged through `tracing`
//! and delivered to every subscriber of the [`Diagnostics`] channel it was
//! published on.

use std::fmt;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// A structured warning raised by a pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A configured feature has no declared type and is kept as-is.
    UnknownFeature { feature: String },

    /// The most frequent value alone exceeds the threshold budget, so
    /// almost every other value collapses into "Other".
    DegenerateAggregation {
        column: String,
        top_value: String,
        top_count: usize,
        threshold_value: usize,
    },

    /// A value not seen at fit time was absorbed into "Other".
    UnseenCategory { column: String, value: String },

    /// An aggregated category had no recorded frequency and was encoded as 0.0.
    UnknownFrequency { column: String, category: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownFeature { feature } => {
                write!(f, "Feature '{}' has no declared type, keeping original representation", feature)
            }
            Diagnostic::DegenerateAggregation {
                column,
                top_value,
                top_count,
                threshold_value,
            } => write!(
                f,
                "Max frequency in {} ({}: {}) is greater than threshold ({}). Nearly all values will be set to Other",
                column, top_value, top_count, threshold_value
            ),
            Diagnostic::UnseenCategory { column, value } => {
                write!(f, "Unseen value '{}' in column '{}' mapped to Other", value, column)
            }
            Diagnostic::UnknownFrequency { column, category } => write!(
                f,
                "No frequency recorded for '{}' in column '{}', encoded as 0.0",
                category, column
            ),
        }
    }
}

/// Fan-out channel for [`Diagnostic`] values.
///
/// Cloning shares the subscriber list, so a stage and its caller can hold the
/// same channel. Subscribers whose receiver was dropped are pruned on the next
/// publish.
#[derive(Clone, Default)]
pub struct Diagnostics {
    subscribers: Arc<Mutex<Vec<Sender<Diagnostic>>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. Only diagnostics published after this call
    /// are delivered.
    pub fn subscribe(&self) -> Receiver<Diagnostic> {
        let (tx, rx) = channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    /// Log a diagnostic and deliver it to all live subscribers.
    pub fn publish(&self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.send(diagnostic.clone()).is_ok());
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.subscribers.lock().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("Diagnostics")
            .field("subscribers", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let diagnostics = Diagnostics::new();
        let a = diagnostics.subscribe();
        let b = diagnostics.clone().subscribe();

        diagnostics.publish(Diagnostic::UnknownFeature {
            feature: "Mystery".to_string(),
        });

        assert_eq!(a.try_iter().count(), 1);
        assert_eq!(b.try_iter().count(), 1);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let diagnostics = Diagnostics::new();
        let rx = diagnostics.subscribe();
        drop(rx);

        diagnostics.publish(Diagnostic::UnknownFeature {
            feature: "Mystery".to_string(),
        });

        assert_eq!(diagnostics.subscribers.lock().unwrap().len(), 0);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let diagnostics = Diagnostics::new();
        diagnostics.publish(Diagnostic::UnseenCategory {
            column: "Color".to_string(),
            value: "teal".to_string(),
        });
        let rx = diagnostics.subscribe();
        assert!(rx.try_recv().is_err());
    }
}
