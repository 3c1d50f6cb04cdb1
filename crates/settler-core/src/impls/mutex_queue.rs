//! MutexQueue - mutex で守った VecDeque による TaskQueue 実装
//!
//! # 学習ポイント
//! - 同じ TaskQueue 契約を lock で満たす、より単純な実装
//! - lock は push/pop の一瞬だけ保持し、await を跨がない
//!
//! Weaker progress guarantee than `LockFreeQueue` (a producer can be delayed
//! by another producer holding the lock), same observable contract.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::queue::TaskQueue;

pub struct MutexQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> MutexQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    // A panic while holding the lock cannot leave the deque half-modified,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for MutexQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> TaskQueue<T> for MutexQueue<T> {
    fn enqueue(&self, item: T) {
        self.lock().push_back(item);
    }

    /// The whole batch goes in under one lock acquisition.
    fn enqueue_batch(&self, items: Vec<T>) {
        self.lock().extend(items);
    }

    fn dequeue(&self) -> Option<T> {
        self.lock().pop_front()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::fixtures::task;
    use std::sync::Arc;

    #[test]
    fn test_push_pop_roundtrip() {
        let queue = MutexQueue::new();
        queue.enqueue(task("p1"));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.dequeue().map(|t| t.id.to_string()), Some("p1".to_string()));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_empty() {
        let queue: MutexQueue<u8> = MutexQueue::new();
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_usable_as_trait_object() {
        let queue: Arc<dyn TaskQueue<u32>> = Arc::new(MutexQueue::new());
        queue.enqueue_batch(vec![1, 2, 3]);
        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.len(), 1);
    }
}
