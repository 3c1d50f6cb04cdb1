//! Decision model: what happens to a task after one reconciliation pass.
//!
//! Computing the decision and applying it are kept apart: the transition
//! table only returns a `Decision`, the daemon loop turns it into a queue
//! operation.

use std::fmt;

/// The next action for a dequeued task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Put an equivalent task back on the queue.
    Requeue { reason: String },

    /// Done with this payment; drop it from the queue.
    Retire { reason: String },

    /// The stored row can no longer be trusted to drive the loop (e.g.
    /// `COMPLETE` without a transfer). Drop the task and leave it to an
    /// operator; requeueing would retire it as already settled.
    Park { reason: String },
}

impl Decision {
    pub fn requeue(reason: impl Into<String>) -> Self {
        Decision::Requeue {
            reason: reason.into(),
        }
    }

    pub fn retire(reason: impl Into<String>) -> Self {
        Decision::Retire {
            reason: reason.into(),
        }
    }

    pub fn park(reason: impl Into<String>) -> Self {
        Decision::Park {
            reason: reason.into(),
        }
    }

    pub fn is_requeue(&self) -> bool {
        matches!(self, Decision::Requeue { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            Decision::Requeue { reason }
            | Decision::Retire { reason }
            | Decision::Park { reason } => reason,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Requeue { reason } => write!(f, "requeue ({reason})"),
            Decision::Retire { reason } => write!(f, "retire ({reason})"),
            Decision::Park { reason } => write!(f, "park ({reason})"),
        }
    }
}
