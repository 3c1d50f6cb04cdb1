//! SettlerBuilder - ports と queue のワイヤリング
//!
//! Wires the store, gateway and identity adapters to one queue, a
//! `PaymentService` and a `ReconciliationDaemon` sharing it. `build()`
//! fails fast on missing ports or unusable settings instead of letting the
//! daemon discover them at the first task.

use std::sync::Arc;
use std::time::Duration;

use crate::app::daemon::{DEFAULT_POLL_INTERVAL, ReconciliationDaemon};
use crate::app::service::{DEFAULT_CALL_TIMEOUT, PaymentService};
use crate::config::Settings;
use crate::domain::PaymentTask;
use crate::ports::{GatewayClient, IdentityResolver, PaymentStore};
use crate::queue::{LockFreeQueue, RetryPolicy, TaskQueue};

/// # 使用例
/// ```ignore
/// let app = SettlerBuilder::new()
///     .store(store)
///     .gateway(gateway)
///     .identity(identity)
///     .settings(&settings)
///     .build()?;
/// let handle = app.daemon.clone().spawn();
/// ```
pub struct SettlerBuilder {
    store: Option<Arc<dyn PaymentStore>>,
    gateway: Option<Arc<dyn GatewayClient>>,
    identity: Option<Arc<dyn IdentityResolver>>,
    queue: Option<Arc<dyn TaskQueue<PaymentTask>>>,
    core_account: Option<String>,
    poll_interval: Duration,
    call_timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("missing port: {0}. Every port must be provided before build().")]
    MissingPort(&'static str),

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting {
        name: &'static str,
        reason: &'static str,
    },
}

/// The wired application: the request-side service and the daemon, both
/// holding the same queue.
pub struct Settler {
    pub service: Arc<PaymentService>,
    pub daemon: Arc<ReconciliationDaemon>,
    pub queue: Arc<dyn TaskQueue<PaymentTask>>,
}

impl SettlerBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            gateway: None,
            identity: None,
            queue: None,
            core_account: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn store(mut self, store: Arc<dyn PaymentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn GatewayClient>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentityResolver>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Use a specific queue. Defaults to a fresh `LockFreeQueue`.
    pub fn queue(mut self, queue: Arc<dyn TaskQueue<PaymentTask>>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn core_account(mut self, account: impl Into<String>) -> Self {
        self.core_account = Some(account.into());
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Take timings, retry policy and the core account from `settings`.
    pub fn settings(self, settings: &Settings) -> Self {
        self.poll_interval(settings.daemon.poll_interval())
            .call_timeout(settings.daemon.call_timeout())
            .retry_policy(settings.daemon.retry_policy())
            .core_account(settings.gateway.core_account.clone())
    }

    pub fn build(self) -> Result<Settler, BuildError> {
        let store = self.store.ok_or(BuildError::MissingPort("PaymentStore"))?;
        let gateway = self.gateway.ok_or(BuildError::MissingPort("GatewayClient"))?;
        let identity = self
            .identity
            .ok_or(BuildError::MissingPort("IdentityResolver"))?;

        let core_account = self.core_account.unwrap_or_default();
        if core_account.trim().is_empty() {
            return Err(BuildError::InvalidSetting {
                name: "gateway.core_account",
                reason: "must not be empty",
            });
        }
        if self.call_timeout.is_zero() {
            return Err(BuildError::InvalidSetting {
                name: "daemon.call_timeout_ms",
                reason: "must be positive",
            });
        }
        if self.poll_interval.is_zero() {
            return Err(BuildError::InvalidSetting {
                name: "daemon.poll_interval_ms",
                reason: "must be positive",
            });
        }
        if self.retry.max_attempts == Some(0) {
            return Err(BuildError::InvalidSetting {
                name: "daemon.max_attempts",
                reason: "must be at least 1 when set",
            });
        }

        let queue: Arc<dyn TaskQueue<PaymentTask>> = match self.queue {
            Some(queue) => queue,
            None => Arc::new(LockFreeQueue::new()),
        };

        let service = Arc::new(
            PaymentService::new(store.clone(), gateway.clone(), queue.clone(), core_account)
                .with_call_timeout(self.call_timeout),
        );
        let daemon = Arc::new(
            ReconciliationDaemon::new(queue.clone(), service.clone(), store, gateway, identity)
                .with_poll_interval(self.poll_interval)
                .with_retry_policy(self.retry),
        );

        Ok(Settler {
            service,
            daemon,
            queue,
        })
    }
}

impl Default for SettlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
