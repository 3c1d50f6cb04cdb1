//! Retry policy: decides whether a task goes back on the queue.

/// Retry policy for tasks that did not reach a terminal outcome.
///
/// The default never gives up: money that arrived at the gateway has to reach
/// the receiver eventually, so a payment is re-enqueued for as long as the
/// process lives. A bound can be configured for deployments that would rather
/// park a stuck payment than poll a dead gateway forever. Parking only drops
/// the in-memory task; the stored row stays non-terminal and is picked up
/// again by `PaymentService::restore_unsettled` on the next start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of passes per task, `None` for unbounded.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    /// May a task that has completed `attempts` passes (the current one
    /// included) be enqueued again?
    pub fn allows_another(&self, attempts: u32) -> bool {
        match self.max_attempts {
            None => true,
            Some(max) => attempts < max,
        }
    }
}
