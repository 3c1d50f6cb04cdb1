//! PaymentService - 同期パス（synchronous request path）
//!
//! Everything a request handler does with payments: create them, hand out
//! payment links, answer status queries, refund. `query_status` is the
//! shared classification step: the daemon calls it for every dequeued task,
//! so a user polling status and the daemon apply the same transitions.
//!
//! Every port call runs under `call_timeout`. Nothing here retries; a
//! failure is returned to the caller as a typed `SettleError`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::app::deadline::with_deadline;
use crate::domain::{
    ExternalStatus, NewPayment, Payment, PaymentId, PaymentStatus, PaymentTask, UserId,
    ValidationError,
};
use crate::error::SettleError;
use crate::ports::{GatewayClient, GatewayStatus, PaymentStore, StatusUpdate};
use crate::queue::TaskQueue;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_PAGE_SIZE: u32 = 100;

pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
    gateway: Arc<dyn GatewayClient>,
    queue: Arc<dyn TaskQueue<PaymentTask>>,
    call_timeout: Duration,
    /// Account incoming payments are collected into.
    core_account: String,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        gateway: Arc<dyn GatewayClient>,
        queue: Arc<dyn TaskQueue<PaymentTask>>,
        core_account: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            queue,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            core_account: core_account.into(),
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Validate and persist a new `PENDING` payment.
    pub async fn create_payment(&self, request: NewPayment) -> Result<PaymentId, SettleError> {
        request.validate()?;
        let id = with_deadline(self.call_timeout, "store.insert", self.store.insert(request))
            .await?;
        info!(payment_id = %id, "payment created");
        Ok(id)
    }

    /// Build the link the payer follows and start reconciling the payment.
    ///
    /// Only `PENDING` and `FAILED` payments get a link; a `FAILED` payment
    /// goes back to `PENDING` (the payer tries again). A `SUCCESS` payment has
    /// already been paid and terminal payments are closed: both are a
    /// `Conflict`.
    pub async fn payment_link(&self, id: &PaymentId) -> Result<String, SettleError> {
        let payment = self.get_payment(id).await?;
        if !matches!(payment.status, PaymentStatus::Pending | PaymentStatus::Failed) {
            return Err(SettleError::Conflict {
                id: id.clone(),
                status: payment.status,
            });
        }

        let update = with_deadline(
            self.call_timeout,
            "store.advance_status",
            self.store.advance_status(id, PaymentStatus::Pending),
        )
        .await?;
        match update {
            StatusUpdate::Applied { .. } => {}
            StatusUpdate::Unchanged { current } if current == PaymentStatus::Pending => {}
            StatusUpdate::Unchanged { current } | StatusUpdate::Rejected { current } => {
                // 別経路で先に進んだ
                return Err(SettleError::Conflict {
                    id: id.clone(),
                    status: current,
                });
            }
        }

        let url = with_deadline(
            self.call_timeout,
            "gateway.quick_pay_url",
            self.gateway
                .quick_pay_url(&self.core_account, id.as_str(), payment.amount),
        )
        .await?;

        let mut task = payment.to_task();
        task.status = PaymentStatus::Pending;
        self.queue.enqueue(task);
        info!(payment_id = %id, amount = %payment.amount, currency = %payment.currency, "payment link issued");
        Ok(url)
    }

    /// Put a task on the reconciliation queue. Malformed tasks never enter it.
    pub fn track(&self, task: PaymentTask) -> Result<(), SettleError> {
        task.validate()?;
        debug!(payment_id = %task.id, "task enqueued");
        self.queue.enqueue(task);
        Ok(())
    }

    /// Validate every task, then enqueue them in order. One bad task rejects
    /// the whole batch.
    pub fn track_batch(&self, tasks: Vec<PaymentTask>) -> Result<(), SettleError> {
        for task in &tasks {
            task.validate()?;
        }
        debug!(count = tasks.len(), "task batch enqueued");
        self.queue.enqueue_batch(tasks);
        Ok(())
    }

    /// Classify a payment and align the stored status with the gateway.
    ///
    /// 1. A `COMPLETE` or `REFUNDED` payment is reported as such without
    ///    asking the gateway or writing anything.
    /// 2. Otherwise the gateway is asked, and `success` / `pending` /
    ///    `failed` are written through `advance_status`, so only moves the
    ///    lifecycle allows are stored. A lagging gateway that still says
    ///    `pending` for a `SUCCESS` payment leaves the row alone.
    /// 3. If the write finds the payment terminal (a concurrent settle won
    ///    the race), the terminal status is reported instead.
    /// 4. An unrecognized gateway answer is reported and not written.
    pub async fn query_status(&self, id: &PaymentId) -> Result<ExternalStatus, SettleError> {
        let stored = with_deadline(
            self.call_timeout,
            "store.get_status",
            self.store.get_status(id),
        )
        .await?;
        if let Some(terminal) = terminal_classification(stored) {
            debug!(payment_id = %id, status = %stored, "terminal payment, gateway not queried");
            return Ok(terminal);
        }

        let observed = with_deadline(
            self.call_timeout,
            "gateway.check_status",
            self.gateway.check_status(id.as_str()),
        )
        .await?;

        let (classification, target) = match observed {
            GatewayStatus::Success => (ExternalStatus::Success, PaymentStatus::Success),
            GatewayStatus::Pending => (ExternalStatus::Pending, PaymentStatus::Pending),
            GatewayStatus::Failed => (ExternalStatus::Failed, PaymentStatus::Failed),
            GatewayStatus::Unrecognized(raw) => {
                warn!(payment_id = %id, raw = %raw, "unrecognized gateway status");
                return Ok(ExternalStatus::Unrecognized(raw));
            }
        };

        let update = with_deadline(
            self.call_timeout,
            "store.advance_status",
            self.store.advance_status(id, target),
        )
        .await?;
        match update {
            StatusUpdate::Applied { previous } => {
                info!(payment_id = %id, from = %previous, to = %target, "payment status updated");
                Ok(classification)
            }
            StatusUpdate::Unchanged { current } => {
                Ok(terminal_classification(current).unwrap_or(classification))
            }
            StatusUpdate::Rejected { current } => {
                warn!(payment_id = %id, from = %current, to = %target, "gateway reports an out-of-order transition, not stored");
                Ok(classification)
            }
        }
    }

    pub async fn get_payment(&self, id: &PaymentId) -> Result<Payment, SettleError> {
        with_deadline(self.call_timeout, "store.get", self.store.get(id)).await
    }

    /// Payments sent by `user`, newest first. `page` is 1-based.
    pub async fn payment_history(
        &self,
        user: &UserId,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Payment>, SettleError> {
        if user.is_blank() {
            return Err(ValidationError::MissingField("user").into());
        }
        if page == 0 || limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(ValidationError::InvalidPage { page, limit }.into());
        }
        with_deadline(
            self.call_timeout,
            "store.history",
            self.store.history(user, page, limit),
        )
        .await
    }

    /// Payments involving `user` that have not settled yet.
    pub async fn active_payments(&self, user: &UserId) -> Result<Vec<Payment>, SettleError> {
        if user.is_blank() {
            return Err(ValidationError::MissingField("user").into());
        }
        with_deadline(
            self.call_timeout,
            "store.active_for_user",
            self.store.active_for_user(user),
        )
        .await
    }

    /// Refund an unsettled payment: mark it `REFUNDED` and create the
    /// reverse payment (receiver pays the sender back). Returns the id of
    /// the reverse payment.
    pub async fn refund(&self, id: &PaymentId) -> Result<PaymentId, SettleError> {
        let payment = self.get_payment(id).await?;
        if payment.status.is_terminal() {
            return Err(SettleError::Conflict {
                id: id.clone(),
                status: payment.status,
            });
        }

        let update = with_deadline(
            self.call_timeout,
            "store.advance_status",
            self.store.advance_status(id, PaymentStatus::Refunded),
        )
        .await?;
        match update {
            StatusUpdate::Applied { .. } => {}
            StatusUpdate::Unchanged { current } | StatusUpdate::Rejected { current } => {
                return Err(SettleError::Conflict {
                    id: id.clone(),
                    status: current,
                });
            }
        }

        let reverse = with_deadline(
            self.call_timeout,
            "store.insert",
            self.store.insert(payment.terms().reversed()),
        )
        .await?;
        info!(payment_id = %id, reverse_id = %reverse, "payment refunded");
        Ok(reverse)
    }

    /// Rebuild the queue from every stored payment that has not reached a
    /// terminal status. Returns how many tasks were enqueued.
    pub async fn restore_unsettled(&self) -> Result<usize, SettleError> {
        let unsettled = with_deadline(
            self.call_timeout,
            "store.list_unsettled",
            self.store.list_unsettled(),
        )
        .await?;
        let tasks: Vec<PaymentTask> = unsettled.iter().map(Payment::to_task).collect();
        let count = tasks.len();
        self.queue.enqueue_batch(tasks);
        info!(count, "unsettled payments restored to the queue");
        Ok(count)
    }
}

fn terminal_classification(status: PaymentStatus) -> Option<ExternalStatus> {
    match status {
        PaymentStatus::Complete => Some(ExternalStatus::Complete),
        PaymentStatus::Refunded => Some(ExternalStatus::Refunded),
        _ => None,
    }
}
