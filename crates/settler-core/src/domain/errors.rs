//! Errors - エラー分類
//!
//! `ErrorKind` is the operational classification every error in the crate
//! reduces to; the daemon decides what to do with a failed task from the kind
//! alone.

use rust_decimal::Decimal;
use thiserror::Error;

/// ErrorKind は実行エラーの分類
///
/// - Transient: gateway/store timeout or network failure. Retry.
/// - Validation: malformed input. Never enters the queue, never retried.
/// - NotFound: unknown payment id or gateway label.
/// - Conflict: the payment is already terminal. Callers treat it as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Validation,
    NotFound,
    Conflict,
}

impl ErrorKind {
    /// Whether a queued task hitting this error should be re-enqueued.
    ///
    /// NotFound is retried on purpose: inside the reconciliation loop an
    /// unknown label usually means the gateway has not indexed the payment yet.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient | ErrorKind::NotFound)
    }
}

/// Rejections of malformed payments and tasks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("invalid currency code {0:?}")]
    InvalidCurrency(String),

    #[error("sender and receiver are the same user ({0})")]
    SelfTransfer(String),

    #[error("unknown payment status {0:?}")]
    UnknownStatus(String),

    #[error("page and limit must be positive (page={page}, limit={limit})")]
    InvalidPage { page: u32, limit: u32 },
}
