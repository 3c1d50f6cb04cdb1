//! Daemon counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of the daemon's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonCounts {
    /// Approximate queue length when the snapshot was taken.
    pub queued: usize,
    pub processed: u64,
    pub requeued: u64,
    /// Transfers that went through.
    pub settled: u64,
    pub retired: u64,
    pub parked: u64,
    pub reverted: u64,
    /// Payments left `COMPLETE` without a transfer because every revert
    /// attempt failed.
    pub stranded: u64,
    pub idle_polls: u64,
}

/// Monotonic counters updated by the daemon loop.
///
/// Relaxed ordering throughout: these feed logs and the CLI summary and
/// never take part in a decision.
#[derive(Debug, Default)]
pub struct DaemonStats {
    processed: AtomicU64,
    requeued: AtomicU64,
    settled: AtomicU64,
    retired: AtomicU64,
    parked: AtomicU64,
    reverted: AtomicU64,
    stranded: AtomicU64,
    idle_polls: AtomicU64,
}

impl DaemonStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_requeued(&self) {
        self.requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_settled(&self) {
        self.settled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retired(&self) {
        self.retired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_parked(&self) {
        self.parked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reverted(&self) {
        self.reverted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stranded(&self) {
        self.stranded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_idle_poll(&self) {
        self.idle_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, queued: usize) -> DaemonCounts {
        DaemonCounts {
            queued,
            processed: self.processed.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            settled: self.settled.load(Ordering::Relaxed),
            retired: self.retired.load(Ordering::Relaxed),
            parked: self.parked.load(Ordering::Relaxed),
            reverted: self.reverted.load(Ordering::Relaxed),
            stranded: self.stranded.load(Ordering::Relaxed),
            idle_polls: self.idle_polls.load(Ordering::Relaxed),
        }
    }
}
