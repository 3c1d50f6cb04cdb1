//! PaymentTask - the reconciliation queue's payload.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::ids::{PaymentId, UserId};
use super::state::PaymentStatus;

/// Value snapshot of a payment awaiting reconciliation.
///
/// Tasks are moved into the queue by value and moved back out on dequeue;
/// nothing keeps a reference to an enqueued task. `status` is whatever was
/// known at enqueue time and is informational only: the store is
/// authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTask {
    pub id: PaymentId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,

    /// How many times the daemon has already processed this payment.
    #[serde(default)]
    pub attempts: u32,
}

impl PaymentTask {
    /// Reject tasks that could never settle. Called before enqueueing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_blank() {
            return Err(ValidationError::MissingField("payment id"));
        }
        validate_terms(&self.from_user_id, &self.to_user_id, self.amount, &self.currency)
    }

    /// The equivalent task to put back on the queue after a non-terminal pass.
    pub fn retry(&self) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
            ..self.clone()
        }
    }
}

/// Shared checks for anything that moves money between two users.
pub(crate) fn validate_terms(
    from: &UserId,
    to: &UserId,
    amount: Decimal,
    currency: &str,
) -> Result<(), ValidationError> {
    if from.is_blank() {
        return Err(ValidationError::MissingField("sender"));
    }
    if to.is_blank() {
        return Err(ValidationError::MissingField("receiver"));
    }
    if from == to {
        return Err(ValidationError::SelfTransfer(from.to_string()));
    }
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount(amount));
    }
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidCurrency(currency.to_string()));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use rust_decimal_macros::dec;

    /// `{id: "p1", amount: 100.00, currency: "RUB", status: PENDING}`
    pub fn task(id: &str) -> PaymentTask {
        PaymentTask {
            id: PaymentId::new(id),
            from_user_id: UserId::new("alice"),
            to_user_id: UserId::new("bob"),
            amount: dec!(100.00),
            currency: "RUB".to_string(),
            status: PaymentStatus::Pending,
            attempts: 0,
        }
    }
}
