//! GatewayClient port - the external payment provider.
//!
//! The gateway is authoritative for whether money arrived and for executing
//! the downstream transfer, but it is eventually consistent and every call is
//! a network call that may fail transiently.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{ExternalAccountId, PaymentTask};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The gateway has no operation with this label (yet).
    #[error("no transaction found for label {0}")]
    UnknownLabel(String),

    #[error("gateway request failed: {0}")]
    Transport(String),

    #[error("gateway API error: {0}")]
    Api(String),

    #[error("invalid gateway request: {0}")]
    InvalidRequest(String),
}

/// Status of an incoming payment at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    Success,
    Pending,
    /// Refused by the gateway. Treated as transient: the payer may retry.
    Failed,
    Unrecognized(String),
}

/// Outcome of a downstream transfer request that reached the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Success,
    Refused(String),
}

#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Latest status of the incoming payment labelled `label`.
    async fn check_status(&self, label: &str) -> Result<GatewayStatus, GatewayError>;

    /// Pay `task.amount` out to the receiver's external account.
    async fn initiate_transfer(
        &self,
        task: &PaymentTask,
        receiver: &ExternalAccountId,
    ) -> Result<TransferStatus, GatewayError>;

    /// Link the payer follows to pay `amount` into `receiver`, labelled `label`.
    async fn quick_pay_url(
        &self,
        receiver: &str,
        label: &str,
        amount: Decimal,
    ) -> Result<String, GatewayError>;
}
