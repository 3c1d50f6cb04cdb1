//! Michael–Scott non-blocking FIFO queue.
//!
//! # 学習ポイント
//! - CAS ループによる lock-free な enqueue / dequeue
//! - 遅れている tail を他スレッドが「手伝って」進める
//! - epoch-based reclamation (crossbeam-epoch) による安全なノード解放
//!
//! The chain always starts at a sentinel node whose payload slot is empty
//! (already moved out, or never written). `head` points at the sentinel;
//! the first real item lives in `head.next`. Dequeue swings `head` forward,
//! which turns the old `head.next` into the new sentinel after its payload
//! has been read out.
//!
//! A thread may still hold a pointer to a node another thread has just
//! unlinked (it loaded `head` right before the CAS that retired it). Nodes are
//! therefore never freed directly: they go through `Guard::defer_destroy`,
//! which runs only after every thread pinned at retirement time has unpinned.

use std::mem::MaybeUninit;
use std::sync::atomic::AtomicIsize;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};

use super::TaskQueue;

struct Node<T> {
    /// Written once at construction (except for the initial sentinel), read
    /// out at most once by the dequeue that turns this node into the sentinel.
    payload: MaybeUninit<T>,
    next: Atomic<Node<T>>,
}

impl<T> Node<T> {
    fn sentinel() -> Self {
        Self {
            payload: MaybeUninit::uninit(),
            next: Atomic::null(),
        }
    }

    fn holding(item: T) -> Self {
        Self {
            payload: MaybeUninit::new(item),
            next: Atomic::null(),
        }
    }
}

/// Unbounded MPMC queue. `enqueue` and `dequeue` never block.
pub struct LockFreeQueue<T> {
    head: Atomic<Node<T>>,
    tail: Atomic<Node<T>>,
    /// Approximate length. May be briefly negative while a dequeue overtakes
    /// the matching enqueue's counter update.
    len: AtomicIsize,
}

// Items are moved between threads but never shared, so `T: Send` suffices.
unsafe impl<T: Send> Send for LockFreeQueue<T> {}
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}

impl<T> LockFreeQueue<T> {
    pub fn new() -> Self {
        let queue = Self {
            head: Atomic::null(),
            tail: Atomic::null(),
            len: AtomicIsize::new(0),
        };
        // SAFETY: no other thread can see the queue yet.
        let sentinel = Owned::new(Node::sentinel()).into_shared(unsafe { epoch::unprotected() });
        queue.head.store(sentinel, Relaxed);
        queue.tail.store(sentinel, Relaxed);
        queue
    }

    /// Link `item` after the last node.
    pub fn push(&self, item: T) {
        let guard = &epoch::pin();
        let new = Owned::new(Node::holding(item)).into_shared(guard);

        loop {
            let tail = self.tail.load(Acquire, guard);
            // SAFETY: tail is never null and cannot be reclaimed while we are pinned.
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Acquire, guard);

            if !next.is_null() {
                // 別の producer が link 済みだが tail をまだ進めていない。手伝う。
                let _ = self
                    .tail
                    .compare_exchange(tail, next, Release, Relaxed, guard);
                continue;
            }

            if tail_ref
                .next
                .compare_exchange(Shared::null(), new, Release, Relaxed, guard)
                .is_ok()
            {
                // Best effort: whoever sees the lag next finishes this step.
                let _ = self.tail.compare_exchange(tail, new, Release, Relaxed, guard);
                self.len.fetch_add(1, Relaxed);
                return;
            }
        }
    }

    /// Unlink and return the oldest item, or `None` right away if empty.
    pub fn pop(&self) -> Option<T> {
        let guard = &epoch::pin();
        let item = self.pop_in(guard);
        if item.is_some() {
            self.len.fetch_sub(1, Relaxed);
        }
        item
    }

    fn pop_in(&self, guard: &Guard) -> Option<T> {
        loop {
            let head = self.head.load(Acquire, guard);
            // SAFETY: head is never null and cannot be reclaimed while we are pinned.
            let next = unsafe { head.deref() }.next.load(Acquire, guard);
            // SAFETY: same as above for any node reachable from head.
            let next_ref = unsafe { next.as_ref() }?;

            if self
                .head
                .compare_exchange(head, next, Release, Relaxed, guard)
                .is_ok()
            {
                // tail must never point at a retired node.
                let tail = self.tail.load(Relaxed, guard);
                if head == tail {
                    let _ = self.tail.compare_exchange(tail, next, Release, Relaxed, guard);
                }
                // SAFETY: winning the head CAS gives this thread sole ownership
                // of next's payload; it is read exactly once and the node now
                // acts as the sentinel, whose payload is never read again.
                // The old head is unreachable for new readers and is destroyed
                // only after all currently pinned threads move on.
                unsafe {
                    guard.defer_destroy(head);
                    return Some(next_ref.payload.as_ptr().read());
                }
            }
        }
    }

    /// Approximate number of queued items.
    pub fn approx_len(&self) -> usize {
        self.len.load(Relaxed).max(0) as usize
    }

    /// Whether the queue was observed empty.
    pub fn observed_empty(&self) -> bool {
        let guard = &epoch::pin();
        let head = self.head.load(Acquire, guard);
        // SAFETY: head is never null and pinned.
        unsafe { head.deref() }.next.load(Acquire, guard).is_null()
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LockFreeQueue<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no other thread holds a reference, so
        // unprotected access is fine and deferred destruction runs immediately.
        unsafe {
            let guard = epoch::unprotected();
            while self.pop_in(guard).is_some() {}
            let sentinel = self.head.load(Relaxed, guard);
            drop(sentinel.into_owned());
        }
    }
}

impl<T: Send> TaskQueue<T> for LockFreeQueue<T> {
    fn enqueue(&self, item: T) {
        self.push(item);
    }

    fn dequeue(&self) -> Option<T> {
        self.pop()
    }

    fn len(&self) -> usize {
        self.approx_len()
    }

    fn is_empty(&self) -> bool {
        self.observed_empty()
    }
}
