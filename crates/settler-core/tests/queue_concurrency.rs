//! Cross-thread properties of the reconciliation queue.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use settler_core::impls::MutexQueue;
use settler_core::queue::{LockFreeQueue, TaskQueue};

const PRODUCERS: usize = 4;
const PER_PRODUCER: usize = 2_000;

fn produce(queue: Arc<dyn TaskQueue<(usize, usize)>>) {
    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    queue.enqueue((producer, seq));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

fn assert_fifo_and_complete(queue: Arc<dyn TaskQueue<(usize, usize)>>) {
    produce(Arc::clone(&queue));

    let mut next_expected = vec![0usize; PRODUCERS];
    let mut drained = 0;
    while let Some((producer, seq)) = queue.dequeue() {
        assert_eq!(
            seq, next_expected[producer],
            "producer {producer} items came out of order"
        );
        next_expected[producer] += 1;
        drained += 1;
    }

    assert_eq!(drained, PRODUCERS * PER_PRODUCER);
    assert!(next_expected.iter().all(|&n| n == PER_PRODUCER));
    assert!(queue.dequeue().is_none());
}

#[test]
fn lock_free_keeps_per_producer_order() {
    assert_fifo_and_complete(Arc::new(LockFreeQueue::new()));
}

#[test]
fn mutex_queue_has_the_same_contract() {
    assert_fifo_and_complete(Arc::new(MutexQueue::new()));
}

#[test]
fn concurrent_producers_and_consumers_lose_nothing() {
    let queue: Arc<LockFreeQueue<(usize, usize)>> = Arc::new(LockFreeQueue::new());

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut seen = Vec::new();
                let mut last = vec![None::<usize>; PRODUCERS];
                for _ in 0..PER_PRODUCER {
                    if let Some((producer, seq)) = queue.dequeue() {
                        // a single consumer still sees each producer in order
                        if let Some(prev) = last[producer] {
                            assert!(seq > prev);
                        }
                        last[producer] = Some(seq);
                        seen.push((producer, seq));
                    } else {
                        thread::yield_now();
                    }
                }
                seen
            })
        })
        .collect();

    produce(queue.clone());

    let mut all = HashSet::new();
    for consumer in consumers {
        for item in consumer.join().unwrap() {
            assert!(all.insert(item), "{item:?} dequeued twice");
        }
    }
    while let Some(item) = queue.dequeue() {
        assert!(all.insert(item), "{item:?} dequeued twice");
    }
    assert_eq!(all.len(), PRODUCERS * PER_PRODUCER);
}

#[test]
fn batch_enqueue_preserves_order() {
    let queue: LockFreeQueue<i32> = LockFreeQueue::new();
    queue.enqueue_batch((0..100).collect());
    let drained: Vec<i32> = std::iter::from_fn(|| queue.dequeue()).collect();
    assert_eq!(drained, (0..100).collect::<Vec<_>>());
}
