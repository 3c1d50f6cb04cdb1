//! PaymentStore port - the persisted source of truth for payments.
//!
//! Production implementations sit on a SQL database (plus cache); the crate
//! ships `InMemoryPaymentStore` for development and tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{NewPayment, Payment, PaymentId, PaymentStatus, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("payment {0} not found")]
    NotFound(PaymentId),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of a guarded status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    /// The new status was written.
    Applied { previous: PaymentStatus },

    /// Nothing was written: the payment is terminal or already in that status.
    Unchanged { current: PaymentStatus },

    /// Nothing was written: the lifecycle does not allow `current -> status`
    /// (e.g. `SUCCESS -> PENDING`).
    Rejected { current: PaymentStatus },
}

impl StatusUpdate {
    pub fn is_applied(self) -> bool {
        matches!(self, StatusUpdate::Applied { .. })
    }
}

/// PaymentStore は支払いレコードの正本
///
/// # 設計原則
/// - lifecycle changes are single atomic read-modify-writes per payment id
///   (the daemon and the synchronous status query race on the same row)
/// - a failed or timed-out call writes nothing
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persist a new `PENDING` payment and return its id.
    async fn insert(&self, request: NewPayment) -> Result<PaymentId, StoreError>;

    async fn get(&self, id: &PaymentId) -> Result<Payment, StoreError>;

    async fn get_status(&self, id: &PaymentId) -> Result<PaymentStatus, StoreError>;

    /// Unconditional write. Only used for compensating reverts.
    async fn set_status(&self, id: &PaymentId, status: PaymentStatus) -> Result<(), StoreError>;

    /// Move the payment to `status` if `PaymentStatus::can_transition_to`
    /// allows it from the current status. Check and write happen atomically;
    /// terminal or same-status payments report `Unchanged`, any other
    /// disallowed move reports `Rejected`.
    async fn advance_status(
        &self,
        id: &PaymentId,
        status: PaymentStatus,
    ) -> Result<StatusUpdate, StoreError>;

    /// Payments sent by `user`, newest first. `page` is 1-based.
    async fn history(&self, user: &UserId, page: u32, limit: u32)
    -> Result<Vec<Payment>, StoreError>;

    /// Non-terminal payments where `user` is sender or receiver.
    async fn active_for_user(&self, user: &UserId) -> Result<Vec<Payment>, StoreError>;

    /// Every payment not yet in a terminal status, oldest first.
    async fn list_unsettled(&self) -> Result<Vec<Payment>, StoreError>;
}
