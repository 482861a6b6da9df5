//! Per-node outcomes of one polling tick.

use std::fmt;

use crate::{Error, Result};

/// A recoverable probe failure: a query against the node did not succeed.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{context}: {source}")]
pub struct ProbeError {
    /// What the probe was doing.
    pub context: &'static str,

    /// The client error.
    #[source]
    pub source: proven_beacon_client::Error,
}

impl ProbeError {
    /// Creates a new probe error.
    #[must_use]
    pub const fn new(context: &'static str, source: proven_beacon_client::Error) -> Self {
        Self { context, source }
    }
}

/// What one probe observed on one node during one tick.
#[derive(Clone, Debug)]
pub enum ProbeOutcome<T> {
    /// The node answered but has not reached the target yet.
    Reported {
        /// Status line.
        message: String,
        /// Value observed so far, if the strategy collects one.
        value: Option<T>,
    },

    /// The node reached the target.
    Done {
        /// Status line.
        message: String,
        /// The value the node converged on.
        value: T,
    },

    /// A query failed; counts against the node's error budget.
    Failed(ProbeError),

    /// The node is in a state that must abort the whole wait.
    Fatal(Error),
}

impl<T> ProbeOutcome<T> {
    /// Reported without a value.
    pub fn reported(message: impl Into<String>) -> Self {
        Self::Reported {
            message: message.into(),
            value: None,
        }
    }

    /// Reached the target with `value`.
    pub fn done(message: impl Into<String>, value: T) -> Self {
        Self::Done {
            message: message.into(),
            value,
        }
    }

    /// Recoverable failure.
    #[must_use]
    pub const fn failed(context: &'static str, source: proven_beacon_client::Error) -> Self {
        Self::Failed(ProbeError::new(context, source))
    }

    /// Whether the node reached the target.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// The value carried by the outcome.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Reported { value, .. } => value.as_ref(),
            Self::Done { value, .. } => Some(value),
            Self::Failed(_) | Self::Fatal(_) => None,
        }
    }
}

impl<T> fmt::Display for ProbeOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reported { message, .. } | Self::Done { message, .. } => f.write_str(message),
            Self::Failed(e) => write!(f, "error: {e}"),
            Self::Fatal(e) => write!(f, "fatal: {e}"),
        }
    }
}

#[derive(Debug)]
struct Entry<T> {
    outcome: Option<ProbeOutcome<T>>,
    consecutive_errors: u32,
}

/// Outcomes of the current tick, one slot per node, plus each node's count
/// of consecutive failed ticks.
///
/// Slots are indexed by the node's position in the running-node list taken
/// when the wait started.
#[derive(Debug)]
pub struct ProbeResultSet<T> {
    entries: Vec<Entry<T>>,
    max_consecutive_errors: u32,
}

impl<T> ProbeResultSet<T> {
    /// Creates a set for `nodes` nodes, counters at zero.
    #[must_use]
    pub fn new(nodes: usize, max_consecutive_errors: u32) -> Self {
        let entries = (0..nodes)
            .map(|_| Entry {
                outcome: None,
                consecutive_errors: 0,
            })
            .collect();
        Self {
            entries,
            max_consecutive_errors,
        }
    }

    /// Number of node slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no node slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets the outcomes of the previous tick. Error counters persist.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.outcome = None;
        }
    }

    /// Stores node `index`'s outcome for this tick and updates its error
    /// counter.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn record(&mut self, index: usize, outcome: ProbeOutcome<T>) {
        let entry = &mut self.entries[index];
        if matches!(outcome, ProbeOutcome::Failed(_)) {
            entry.consecutive_errors = entry.consecutive_errors.saturating_add(1);
        } else {
            entry.consecutive_errors = 0;
        }
        entry.outcome = Some(outcome);
    }

    /// Returns the error that must end the wait, if any.
    ///
    /// A fatal outcome on any node wins over everything else. Otherwise a
    /// node whose consecutive failures reached the budget is reported as
    /// unresponsive.
    ///
    /// # Errors
    ///
    /// Returns the first fatal outcome, or [`Error::NodeUnresponsive`].
    pub fn check_error(&self) -> Result<()> {
        for entry in &self.entries {
            if let Some(ProbeOutcome::Fatal(e)) = &entry.outcome {
                return Err(e.clone());
            }
        }

        for (node, entry) in self.entries.iter().enumerate() {
            if entry.consecutive_errors > 0 && entry.consecutive_errors >= self.max_consecutive_errors
            {
                let last = match &entry.outcome {
                    Some(ProbeOutcome::Failed(e)) => e.to_string(),
                    _ => String::new(),
                };
                return Err(Error::NodeUnresponsive {
                    node,
                    errors: entry.consecutive_errors,
                    last,
                });
            }
        }

        Ok(())
    }

    /// Emits one line per node that reported this tick, in node order.
    pub fn print_messages(&self, mut log: impl FnMut(&str)) {
        for (node, entry) in self.entries.iter().enumerate() {
            if let Some(outcome) = &entry.outcome {
                log(&format!("node {node}: {outcome}"));
            }
        }
    }

    /// Whether every node reached the target. Never true for an empty set.
    #[must_use]
    pub fn all_done(&self) -> bool {
        !self.entries.is_empty()
            && self
                .entries
                .iter()
                .all(|e| e.outcome.as_ref().is_some_and(ProbeOutcome::is_done))
    }

    /// Outcome of node `index` this tick.
    #[must_use]
    pub fn outcome(&self, index: usize) -> Option<&ProbeOutcome<T>> {
        self.entries.get(index).and_then(|e| e.outcome.as_ref())
    }

    /// Value reported by node `index` this tick.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&T> {
        self.outcome(index).and_then(ProbeOutcome::value)
    }

    /// Values of every node this tick, `None` where a node has none.
    pub fn values(&self) -> impl Iterator<Item = Option<&T>> {
        self.entries
            .iter()
            .map(|e| e.outcome.as_ref().and_then(ProbeOutcome::value))
    }

    /// Consecutive failed ticks of node `index`.
    #[must_use]
    pub fn consecutive_errors(&self, index: usize) -> u32 {
        self.entries.get(index).map_or(0, |e| e.consecutive_errors)
    }
}

#[cfg(test)]
mod tests {
    use proven_beacon_client::Error as ClientError;

    use super::*;

    fn failed() -> ProbeOutcome<u32> {
        ProbeOutcome::failed("head block", ClientError::request("connection refused"))
    }

    #[test]
    fn test_all_done_requires_every_node() {
        let mut set = ProbeResultSet::new(3, 3);
        set.record(0, ProbeOutcome::done("ok", 1));
        set.record(1, ProbeOutcome::done("ok", 1));
        assert!(!set.all_done());

        set.record(2, ProbeOutcome::reported("waiting"));
        assert!(!set.all_done());

        set.record(2, ProbeOutcome::done("ok", 1));
        assert!(set.all_done());
    }

    #[test]
    fn test_empty_set_is_never_done() {
        let set = ProbeResultSet::<u32>::new(0, 3);
        assert!(!set.all_done());
        assert!(set.check_error().is_ok());
    }

    #[test]
    fn test_fatal_wins_over_done() {
        let mut set = ProbeResultSet::new(3, 3);
        set.record(0, ProbeOutcome::done("ok", 1));
        set.record(1, failed());
        set.record(
            2,
            ProbeOutcome::Fatal(Error::EpochNotSynced {
                node: 2,
                clock_slot: 40,
                slot: 3,
            }),
        );

        let err = set.check_error().unwrap_err();
        assert!(matches!(err, Error::EpochNotSynced { node: 2, .. }));
    }

    #[test]
    fn test_error_budget_escalates_on_threshold() {
        let mut set = ProbeResultSet::new(2, 3);
        for _ in 0..2 {
            set.clear();
            set.record(0, failed());
            set.record(1, ProbeOutcome::done("ok", 1));
            assert!(set.check_error().is_ok());
        }

        set.clear();
        set.record(0, failed());
        set.record(1, ProbeOutcome::done("ok", 1));
        let err = set.check_error().unwrap_err();
        match err {
            Error::NodeUnresponsive { node, errors, last } => {
                assert_eq!(node, 0);
                assert_eq!(errors, 3);
                assert!(last.contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_success_resets_counter() {
        let mut set = ProbeResultSet::new(1, 3);
        set.record(0, failed());
        set.record(0, failed());
        assert_eq!(set.consecutive_errors(0), 2);

        set.record(0, ProbeOutcome::reported("back"));
        assert_eq!(set.consecutive_errors(0), 0);

        set.record(0, failed());
        set.record(0, failed());
        assert!(set.check_error().is_ok());
    }

    #[test]
    fn test_clear_keeps_counters() {
        let mut set = ProbeResultSet::new(1, 5);
        set.record(0, failed());
        set.clear();
        assert!(set.outcome(0).is_none());
        assert_eq!(set.consecutive_errors(0), 1);
    }

    #[test]
    fn test_zero_budget_escalates_immediately() {
        let mut set = ProbeResultSet::new(1, 0);
        set.record(0, ProbeOutcome::reported("fine"));
        assert!(set.check_error().is_ok());

        set.record(0, failed());
        assert!(matches!(
            set.check_error(),
            Err(Error::NodeUnresponsive { errors: 1, .. })
        ));
    }

    #[test]
    fn test_print_messages_in_node_order() {
        let mut set = ProbeResultSet::new(3, 3);
        set.record(2, ProbeOutcome::reported("third"));
        set.record(0, ProbeOutcome::reported("first"));
        set.record(1, failed());

        let mut lines = Vec::new();
        set.print_messages(|l| lines.push(l.to_string()));
        assert_eq!(
            lines,
            vec![
                "node 0: first".to_string(),
                "node 1: error: head block: request failed: connection refused".to_string(),
                "node 2: third".to_string(),
            ]
        );
    }

    #[test]
    fn test_values_follow_outcomes() {
        let mut set = ProbeResultSet::new(3, 3);
        set.record(
            0,
            ProbeOutcome::Reported {
                message: String::new(),
                value: Some(7),
            },
        );
        set.record(1, ProbeOutcome::done("", 8));
        set.record(2, failed());

        let values: Vec<_> = set.values().collect();
        assert_eq!(values, vec![Some(&7), Some(&8), None]);
        assert_eq!(set.value(1), Some(&8));
        assert_eq!(set.value(9), None);
    }
}
