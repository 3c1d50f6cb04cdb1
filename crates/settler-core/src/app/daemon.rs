//! ReconciliationDaemon - 照合ループ
//!
//! # フロー
//! 1. shutdown が来ていたら抜ける
//! 2. TaskQueue::dequeue()。空なら poll_interval 待つ（shutdown でも起きる）
//! 3. PaymentService::query_status() で分類
//! 4. 遷移表を適用して Decision を得る
//! 5. Decision を queue に反映（Requeue → enqueue, Retire / Park → drop）
//!
//! The loop never exits on a per-task failure: errors become a
//! `Decision::Requeue`, except a payment stranded at `COMPLETE` by a failed
//! revert, which is parked. A task already dequeued when shutdown is
//! requested runs to completion first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::app::deadline::with_deadline;
use crate::app::service::PaymentService;
use crate::app::stats::{DaemonCounts, DaemonStats};
use crate::domain::{Decision, ExternalStatus, PaymentStatus, PaymentTask};
use crate::ports::{GatewayClient, IdentityResolver, PaymentStore, StatusUpdate, TransferStatus};
use crate::queue::{RetryPolicy, TaskQueue};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Writes tried when undoing the `COMPLETE` mark after a failed transfer.
const REVERT_ATTEMPTS: u32 = 3;

pub struct ReconciliationDaemon {
    queue: Arc<dyn TaskQueue<PaymentTask>>,
    service: Arc<PaymentService>,
    store: Arc<dyn PaymentStore>,
    gateway: Arc<dyn GatewayClient>,
    identity: Arc<dyn IdentityResolver>,
    poll_interval: Duration,
    retry: RetryPolicy,
    stats: DaemonStats,
}

impl ReconciliationDaemon {
    pub fn new(
        queue: Arc<dyn TaskQueue<PaymentTask>>,
        service: Arc<PaymentService>,
        store: Arc<dyn PaymentStore>,
        gateway: Arc<dyn GatewayClient>,
        identity: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            queue,
            service,
            store,
            gateway,
            identity,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::default(),
            stats: DaemonStats::new(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn counts(&self) -> DaemonCounts {
        self.stats.snapshot(self.queue.len())
    }

    /// Start the loop on the tokio runtime.
    pub fn spawn(self: Arc<Self>) -> DaemonHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let daemon = Arc::clone(&self);
        let join = tokio::spawn(async move {
            daemon.run(shutdown_rx).await;
        });
        DaemonHandle {
            shutdown_tx,
            join,
            daemon: self,
        }
    }

    /// Run until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(poll_interval = ?self.poll_interval, "reconciliation daemon started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            if self.run_once().await.is_some() {
                // 連続処理中でも他タスクに譲る
                tokio::task::yield_now().await;
                continue;
            }

            self.stats.record_idle_poll();
            debug!("queue empty");
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        info!(counts = ?self.counts(), "reconciliation daemon stopped");
    }

    /// Dequeue and fully handle one task. `None` when the queue was empty.
    pub async fn run_once(&self) -> Option<Decision> {
        let task = self.queue.dequeue()?;
        let decision = self.process(&task).await;
        self.apply(task, &decision);
        Some(decision)
    }

    /// One reconciliation pass: classify the payment and run the transition
    /// table. Does not touch the queue.
    pub async fn process(&self, task: &PaymentTask) -> Decision {
        self.stats.record_processed();

        let status = match self.service.query_status(&task.id).await {
            Ok(status) => status,
            Err(err) => {
                warn!(payment_id = %task.id, error = %err, kind = ?err.kind(), "status check failed");
                return Decision::requeue(format!("status check failed: {err}"));
            }
        };

        match status {
            ExternalStatus::Success => self.settle(task).await,
            ExternalStatus::Pending => Decision::requeue("awaiting payment"),
            ExternalStatus::Failed => Decision::requeue("gateway reported failure"),
            ExternalStatus::Complete => Decision::retire("already complete"),
            ExternalStatus::Refunded => Decision::retire("refunded"),
            ExternalStatus::Unrecognized(raw) => {
                Decision::requeue(format!("unrecognized gateway status {raw:?}"))
            }
        }
    }

    /// Money arrived: mark the payment complete, then pay the receiver.
    async fn settle(&self, task: &PaymentTask) -> Decision {
        let limit = self.service.call_timeout();

        let receiver = match with_deadline(
            limit,
            "identity.resolve_external_account",
            self.identity.resolve_external_account(&task.to_user_id),
        )
        .await
        {
            Ok(account) => account,
            Err(err) => {
                warn!(payment_id = %task.id, receiver = %task.to_user_id, error = %err, "receiver account unresolved");
                return Decision::requeue(format!("receiver unresolved: {err}"));
            }
        };

        match with_deadline(
            limit,
            "store.advance_status",
            self.store.advance_status(&task.id, PaymentStatus::Complete),
        )
        .await
        {
            Ok(StatusUpdate::Applied { previous }) => {
                info!(payment_id = %task.id, from = %previous, "payment marked complete");
            }
            Ok(StatusUpdate::Unchanged { current }) => {
                // 二重処理: 既に COMPLETE なら送金しない
                info!(payment_id = %task.id, status = %current, "payment already settled, transfer skipped");
                return Decision::retire(format!("already {current}"));
            }
            Ok(StatusUpdate::Rejected { current }) => {
                // query と settle の間に別経路で状態が変わった
                warn!(payment_id = %task.id, status = %current, "payment no longer SUCCESS, transfer skipped");
                return Decision::requeue(format!("payment is {current}, cannot complete"));
            }
            Err(err) => {
                warn!(payment_id = %task.id, error = %err, "could not mark payment complete");
                return Decision::requeue(format!("complete write failed: {err}"));
            }
        }

        let failure = match with_deadline(
            limit,
            "gateway.initiate_transfer",
            self.gateway.initiate_transfer(task, &receiver),
        )
        .await
        {
            Ok(TransferStatus::Success) => {
                self.stats.record_settled();
                info!(
                    payment_id = %task.id,
                    receiver = %receiver,
                    amount = %task.amount,
                    currency = %task.currency,
                    "transfer complete"
                );
                return Decision::retire("transfer complete");
            }
            Ok(TransferStatus::Refused(reason)) => format!("transfer refused: {reason}"),
            Err(err) => format!("transfer failed: {err}"),
        };

        if self.revert(task, &failure).await {
            Decision::requeue(failure)
        } else {
            Decision::park(format!("{failure}; revert to SUCCESS failed"))
        }
    }

    /// Undo the `COMPLETE` mark after a failed transfer, trying the write up
    /// to `REVERT_ATTEMPTS` times. `false` when the payment is still
    /// `COMPLETE`.
    async fn revert(&self, task: &PaymentTask, failure: &str) -> bool {
        self.stats.record_reverted();
        let limit = self.service.call_timeout();
        for attempt in 1..=REVERT_ATTEMPTS {
            match with_deadline(
                limit,
                "store.set_status",
                self.store.set_status(&task.id, PaymentStatus::Success),
            )
            .await
            {
                Ok(()) => {
                    warn!(payment_id = %task.id, failure, "transfer did not go through, reverted to SUCCESS");
                    return true;
                }
                Err(err) => {
                    warn!(payment_id = %task.id, attempt, error = %err, "revert to SUCCESS failed");
                }
            }
        }
        false
    }

    /// Turn a decision into a queue operation.
    pub fn apply(&self, task: PaymentTask, decision: &Decision) {
        match decision {
            Decision::Retire { reason } => {
                self.stats.record_retired();
                info!(payment_id = %task.id, attempts = task.attempts + 1, reason = %reason, "task retired");
            }
            Decision::Requeue { reason } => {
                let next = task.retry();
                if self.retry.allows_another(next.attempts) {
                    self.stats.record_requeued();
                    debug!(payment_id = %next.id, attempts = next.attempts, reason = %reason, "task requeued");
                    self.queue.enqueue(next);
                } else {
                    self.stats.record_parked();
                    error!(
                        payment_id = %next.id,
                        attempts = next.attempts,
                        reason = %reason,
                        "retry limit reached, task parked until the next restore"
                    );
                }
            }
            Decision::Park { reason } => {
                self.stats.record_stranded();
                error!(
                    payment_id = %task.id,
                    attempts = task.attempts + 1,
                    reason = %reason,
                    "payment is COMPLETE without a transfer, needs manual repair"
                );
            }
        }
    }
}

/// Handle to a spawned daemon.
/// - `request_shutdown()` はループを止めるだけで、処理中のタスクは最後まで走る
/// - dropping the handle drops the sender, which also stops the loop
pub struct DaemonHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
    daemon: Arc<ReconciliationDaemon>,
}

impl DaemonHandle {
    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub fn counts(&self) -> DaemonCounts {
        self.daemon.counts()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Shutdown and wait for the loop to stop. Returns the final counters.
    pub async fn shutdown_and_join(self) -> DaemonCounts {
        self.request_shutdown();
        if let Err(err) = self.join.await {
            error!(error = %err, "reconciliation daemon task failed");
        }
        self.daemon.counts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::fixtures::task;
    use crate::domain::{NewPayment, PaymentId};
    use crate::impls::{InMemoryPaymentStore, SimulatedGateway, StaticIdentityResolver};
    use crate::queue::LockFreeQueue;
    use rust_decimal_macros::dec;

    struct Fixture {
        daemon: ReconciliationDaemon,
        store: Arc<InMemoryPaymentStore>,
        gateway: Arc<SimulatedGateway>,
        queue: Arc<LockFreeQueue<PaymentTask>>,
    }

    fn fixture(identity: StaticIdentityResolver) -> Fixture {
        let store = Arc::new(InMemoryPaymentStore::new());
        let gateway = Arc::new(SimulatedGateway::new("https://pay.test/quickpay", 0));
        let queue = Arc::new(LockFreeQueue::new());
        let service = Arc::new(PaymentService::new(
            store.clone(),
            gateway.clone(),
            queue.clone(),
            "core-acc",
        ));
        let daemon = ReconciliationDaemon::new(
            queue.clone(),
            service,
            store.clone(),
            gateway.clone(),
            Arc::new(identity),
        );
        Fixture {
            daemon,
            store,
            gateway,
            queue,
        }
    }

    fn linked() -> StaticIdentityResolver {
        StaticIdentityResolver::new().link("bob", "acc-bob")
    }

    async fn stored_payment(f: &Fixture) -> PaymentTask {
        let id = f
            .store
            .insert(NewPayment::new("alice", "bob", dec!(100.00), "RUB"))
            .await
            .unwrap();
        f.store.get(&id).await.unwrap().to_task()
    }

    #[tokio::test]
    async fn pending_payment_is_requeued() {
        let f = fixture(linked());
        let t = stored_payment(&f).await;
        f.gateway.register(t.id.as_str(), 1).await;

        let decision = f.daemon.process(&t).await;
        assert_eq!(decision, Decision::requeue("awaiting payment"));
        assert!(f.gateway.transfers().await.is_empty());
    }

    #[tokio::test]
    async fn unresolved_receiver_leaves_store_untouched() {
        let f = fixture(StaticIdentityResolver::new());
        let t = stored_payment(&f).await;
        f.gateway.register(t.id.as_str(), 0).await;

        let decision = f.daemon.process(&t).await;
        assert!(decision.is_requeue());
        // the status query itself records SUCCESS; nothing past that
        assert_eq!(f.store.get_status(&t.id).await.unwrap(), PaymentStatus::Success);
        assert!(f.gateway.transfers().await.is_empty());
    }

    #[tokio::test]
    async fn refused_transfer_reverts_and_requeues() {
        let f = fixture(linked());
        let t = stored_payment(&f).await;
        f.gateway.register(t.id.as_str(), 0).await;
        f.gateway.refuse_next_transfers(1).await;

        let decision = f.daemon.process(&t).await;
        assert!(decision.is_requeue());
        assert_eq!(f.store.get_status(&t.id).await.unwrap(), PaymentStatus::Success);
        assert_eq!(f.daemon.counts().reverted, 1);
    }

    #[tokio::test]
    async fn failed_payment_is_not_paid_out_without_a_new_link() {
        let f = fixture(linked());
        let t = stored_payment(&f).await;
        f.store.set_status(&t.id, PaymentStatus::Failed).await.unwrap();
        f.gateway.register(t.id.as_str(), 0).await;

        let decision = f.daemon.process(&t).await;
        assert_eq!(decision, Decision::requeue("payment is FAILED, cannot complete"));
        assert_eq!(f.store.get_status(&t.id).await.unwrap(), PaymentStatus::Failed);
        assert!(f.gateway.transfers().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_payment_is_requeued_not_dropped() {
        let f = fixture(linked());
        let decision = f.daemon.process(&task("ghost")).await;
        assert!(decision.is_requeue());
    }

    #[tokio::test]
    async fn refunded_payment_is_retired() {
        let f = fixture(linked());
        let t = stored_payment(&f).await;
        f.store.set_status(&t.id, PaymentStatus::Refunded).await.unwrap();

        assert_eq!(f.daemon.process(&t).await, Decision::retire("refunded"));
    }

    #[tokio::test]
    async fn apply_requeues_with_attempt_count() {
        let f = fixture(linked());
        f.daemon.apply(task("p1"), &Decision::requeue("awaiting payment"));

        let again = f.queue.dequeue().unwrap();
        assert_eq!(again.id, PaymentId::new("p1"));
        assert_eq!(again.attempts, 1);

        f.daemon.apply(again, &Decision::retire("done"));
        assert!(f.queue.dequeue().is_none());
    }

    #[tokio::test]
    async fn bounded_policy_parks_exhausted_tasks() {
        let f = fixture(linked());
        let daemon = f.daemon.with_retry_policy(RetryPolicy::bounded(2));

        let mut t = task("p1");
        daemon.apply(t.clone(), &Decision::requeue("pending"));
        t = f.queue.dequeue().unwrap();
        daemon.apply(t, &Decision::requeue("pending"));

        assert!(f.queue.dequeue().is_none());
        let counts = daemon.counts();
        assert_eq!(counts.requeued, 1);
        assert_eq!(counts.parked, 1);
    }

    #[tokio::test]
    async fn run_once_on_empty_queue_returns_none() {
        let f = fixture(linked());
        assert!(f.daemon.run_once().await.is_none());
    }
}
