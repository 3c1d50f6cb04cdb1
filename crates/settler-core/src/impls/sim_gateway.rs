//! SimulatedGateway - 開発用の決済ゲートウェイ
//!
//! Behaves like an eventually consistent provider: a payment link registers
//! its label, the label reports `pending` for a configurable number of status
//! checks and `success` afterwards. Transfers can be made to fail to exercise
//! the daemon's revert path.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::domain::{ExternalAccountId, PaymentId, PaymentTask};
use crate::ports::{GatewayClient, GatewayError, GatewayStatus, TransferStatus};

/// A transfer the gateway accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub payment_id: PaymentId,
    pub receiver: ExternalAccountId,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Default)]
struct SimState {
    /// label -> remaining `pending` answers before `success`
    labels: HashMap<String, u32>,
    /// labels the payer's bank refused
    refused: HashMap<String, bool>,
    refuse_next_transfers: u32,
    transfers: Vec<TransferRecord>,
    status_checks: u64,
}

pub struct SimulatedGateway {
    base_url: String,
    pending_polls: u32,
    state: Mutex<SimState>,
}

impl SimulatedGateway {
    /// `pending_polls`: how many status checks a new label answers `pending`.
    pub fn new(base_url: impl Into<String>, pending_polls: u32) -> Self {
        Self {
            base_url: base_url.into(),
            pending_polls,
            state: Mutex::new(SimState::default()),
        }
    }

    /// Make a label known, as if the payer had opened the link.
    pub async fn register(&self, label: impl Into<String>, pending_polls: u32) {
        self.state.lock().await.labels.insert(label.into(), pending_polls);
    }

    /// The payer's bank refuses (`true`) or accepts again (`false`).
    pub async fn set_refused(&self, label: impl Into<String>, refused: bool) {
        self.state.lock().await.refused.insert(label.into(), refused);
    }

    /// Refuse the next `n` transfer requests.
    pub async fn refuse_next_transfers(&self, n: u32) {
        self.state.lock().await.refuse_next_transfers = n;
    }

    pub async fn transfers(&self) -> Vec<TransferRecord> {
        self.state.lock().await.transfers.clone()
    }

    pub async fn status_checks(&self) -> u64 {
        self.state.lock().await.status_checks
    }
}

#[async_trait]
impl GatewayClient for SimulatedGateway {
    async fn check_status(&self, label: &str) -> Result<GatewayStatus, GatewayError> {
        let mut state = self.state.lock().await;
        state.status_checks += 1;

        if state.refused.get(label).copied().unwrap_or(false) {
            return Ok(GatewayStatus::Failed);
        }
        let Some(remaining) = state.labels.get_mut(label) else {
            return Err(GatewayError::UnknownLabel(label.to_string()));
        };
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(GatewayStatus::Pending);
        }
        Ok(GatewayStatus::Success)
    }

    async fn initiate_transfer(
        &self,
        task: &PaymentTask,
        receiver: &ExternalAccountId,
    ) -> Result<TransferStatus, GatewayError> {
        if task.amount <= Decimal::ZERO || task.currency.is_empty() {
            return Err(GatewayError::InvalidRequest(format!(
                "invalid payment fields for {}",
                task.id
            )));
        }

        let mut state = self.state.lock().await;
        if state.refuse_next_transfers > 0 {
            state.refuse_next_transfers -= 1;
            return Ok(TransferStatus::Refused("limit exceeded".to_string()));
        }
        state.transfers.push(TransferRecord {
            payment_id: task.id.clone(),
            receiver: receiver.clone(),
            amount: task.amount,
            currency: task.currency.clone(),
        });
        Ok(TransferStatus::Success)
    }

    async fn quick_pay_url(
        &self,
        receiver: &str,
        label: &str,
        amount: Decimal,
    ) -> Result<String, GatewayError> {
        if receiver.is_empty() || amount <= Decimal::ZERO {
            return Err(GatewayError::InvalidRequest(
                "receiver and amount must be valid".to_string(),
            ));
        }
        self.register(label, self.pending_polls).await;
        Ok(format!(
            "{}?receiver={}&quickpay-form=shop&paymentType=AC&sum={}&label={}",
            self.base_url,
            receiver,
            amount.round_dp(2),
            label
        ))
    }
}
