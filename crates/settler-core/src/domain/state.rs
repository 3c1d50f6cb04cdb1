//! Payment lifecycle states and the classification reported by a status check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::ValidationError;

/// Lifecycle state of a payment as persisted in the store.
///
/// State transitions:
/// - Pending -> Success | Failed
/// - Success -> Complete
/// - Failed -> Pending (payer retries)
/// - Pending | Success | Failed -> Refunded
/// - Complete, Refunded: terminal
///
/// Once a payment is `Complete` the receiver has been paid; nothing may
/// trigger another transfer for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Complete,
    Refunded,
}

impl PaymentStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Complete | PaymentStatus::Refunded)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Writing the current status again is always allowed for non-terminal
    /// states; the store treats it as a no-op.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;

        if self.is_terminal() {
            return false;
        }
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Success)
                | (Pending, Failed)
                | (Success, Complete)
                | (Failed, Pending)
                | (_, Refunded)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Complete => "COMPLETE",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            "COMPLETE" => Ok(PaymentStatus::Complete),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// What a status check concluded about a payment.
///
/// Produced by the synchronous query path and consumed by the daemon's
/// transition table. `Complete` and `Refunded` come from the local store's
/// terminal guard; the other variants mirror the gateway's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "raw")]
pub enum ExternalStatus {
    Success,
    Pending,
    Failed,
    Complete,
    Refunded,
    /// Anything the gateway reported that we do not understand.
    Unrecognized(String),
}

impl ExternalStatus {
    /// Terminal classifications end reconciliation for the payment.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExternalStatus::Complete | ExternalStatus::Refunded)
    }

    pub fn label(&self) -> &str {
        match self {
            ExternalStatus::Success => "success",
            ExternalStatus::Pending => "pending",
            ExternalStatus::Failed => "failed",
            ExternalStatus::Complete => "complete",
            ExternalStatus::Refunded => "refunded",
            ExternalStatus::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for ExternalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
