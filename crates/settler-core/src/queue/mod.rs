//! Queue module: the reconciliation work queue and its retry policy.

mod lock_free;
mod retry;

pub use lock_free::LockFreeQueue;
pub use retry::RetryPolicy;

/// Queue port (interface).
///
/// Contract shared by every implementation:
/// - `enqueue` inserts at the logical tail, never blocks, never fails.
/// - `dequeue` removes the logical head, or returns `None` immediately.
/// - FIFO among completed enqueues; any number of producers and consumers.
///
/// The trait is object-safe so the daemon can hold `Arc<dyn TaskQueue<T>>`
/// and the implementation can be swapped (lock-free vs. mutex-guarded).
pub trait TaskQueue<T>: Send + Sync {
    fn enqueue(&self, item: T);

    /// Enqueue each item in order. Other producers may interleave.
    fn enqueue_batch(&self, items: Vec<T>) {
        for item in items {
            self.enqueue(item);
        }
    }

    fn dequeue(&self) -> Option<T>;

    /// Approximate number of queued items (for observability only).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
