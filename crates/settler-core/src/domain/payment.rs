//! Payment record as persisted by the store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::ids::{PaymentId, UserId};
use super::state::PaymentStatus;
use super::task::{PaymentTask, validate_terms};

/// Request to create a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
}

impl NewPayment {
    pub fn new(
        from_user_id: impl Into<UserId>,
        to_user_id: impl Into<UserId>,
        amount: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            from_user_id: from_user_id.into(),
            to_user_id: to_user_id.into(),
            amount,
            currency: currency.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_terms(
            &self.from_user_id,
            &self.to_user_id,
            self.amount,
            &self.currency,
        )
    }

    /// The payment that undoes this one.
    pub fn reversed(&self) -> Self {
        Self {
            from_user_id: self.to_user_id.clone(),
            to_user_id: self.from_user_id.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
        }
    }
}

/// The single source of truth for a payment's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// A freshly created payment starts out `PENDING`.
    pub fn new(id: PaymentId, request: NewPayment, now: DateTime<Utc>) -> Self {
        Self {
            id,
            from_user_id: request.from_user_id,
            to_user_id: request.to_user_id,
            amount: request.amount,
            currency: request.currency,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn terms(&self) -> NewPayment {
        NewPayment {
            from_user_id: self.from_user_id.clone(),
            to_user_id: self.to_user_id.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
        }
    }

    /// Snapshot for the reconciliation queue.
    pub fn to_task(&self) -> PaymentTask {
        PaymentTask {
            id: self.id.clone(),
            from_user_id: self.from_user_id.clone(),
            to_user_id: self.to_user_id.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            status: self.status,
            attempts: 0,
        }
    }

    /// Does this payment involve `user` on either side?
    pub fn involves(&self, user: &UserId) -> bool {
        &self.from_user_id == user || &self.to_user_id == user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_payment_starts_pending() {
        let p = Payment::new(
            PaymentId::new("p1"),
            NewPayment::new("alice", "bob", dec!(10), "RUB"),
            at_noon(),
        );
        assert_eq!(p.status, PaymentStatus::Pending);
        assert_eq!(p.created_at, p.updated_at);
        assert!(p.involves(&UserId::new("bob")));
        assert!(!p.involves(&UserId::new("carol")));
    }

    #[test]
    fn task_snapshot_copies_terms() {
        let p = Payment::new(
            PaymentId::new("p1"),
            NewPayment::new("alice", "bob", dec!(99.90), "EUR"),
            at_noon(),
        );
        let t = p.to_task();
        assert_eq!(t.id, p.id);
        assert_eq!(t.amount, dec!(99.90));
        assert_eq!(t.currency, "EUR");
        assert_eq!(t.attempts, 0);
    }

    #[test]
    fn reversed_swaps_parties() {
        let req = NewPayment::new("alice", "bob", dec!(5), "USD");
        let rev = req.reversed();
        assert_eq!(rev.from_user_id, UserId::new("bob"));
        assert_eq!(rev.to_user_id, UserId::new("alice"));
        assert_eq!(rev.amount, req.amount);
    }
}
