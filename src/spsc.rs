//! Single-producer/single-consumer bounded lock-free ring buffer.
//!
//! This is the canonical Lamport queue: two indices, `head` (reader-owned)
//! and `tail` (writer-owned), each isolated on its own cache line so the
//! producer and consumer never fight over a cache line neither of them
//! actually wants to share. Capacity must be a power of two; wrap is a mask,
//! not a modulo. One slot is always sacrificed so `head == tail` can mean
//! "empty" unambiguously - effective capacity is `N - 1`.
//!
//! This type is deliberately hand-rolled rather than built on
//! `crossbeam_queue::ArrayQueue`: the head/tail acquire/release protocol
//! below *is* the thing this crate is about.

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Baseline capacity for the InQ/OutQ pipeline queues.
pub const DEFAULT_CAPACITY: usize = 16384;

pub struct SpscQueue<T> {
    buf: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: a `SpscQueue<T>` is sound to share between exactly one producer
// thread and one consumer thread - the acquire/release pair on head/tail
// is what makes that safe. It is not safe to call `push` from two threads
// concurrently, nor `pop` from two threads concurrently; callers are
// responsible for that discipline (enforced structurally in this crate by
// construction: `PipelineQueues` hands out a single producer handle and a
// single consumer handle).
unsafe impl<T: Send> Send for SpscQueue<T> {}
unsafe impl<T: Send> Sync for SpscQueue<T> {}

impl<T> SpscQueue<T> {
    /// Creates a queue with room for `capacity - 1` live elements.
    ///
    /// # Panics
    /// Panics if `capacity` is not a power of two, or is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two() && capacity > 0, "capacity must be a nonzero power of two");
        let mut buf = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            buf.push(UnsafeCell::new(MaybeUninit::uninit()));
        }
        Self {
            buf: buf.into_boxed_slice(),
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Writer-only. Non-blocking; returns `false` if the queue is full.
    pub fn push(&self, item: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        let next_tail = (tail + 1) & self.mask;
        if next_tail == head {
            return false; // full
        }
        // SAFETY: slot `tail` is owned by the writer until `tail` is
        // published below - the reader only ever touches indices strictly
        // before the published tail.
        unsafe {
            (*self.buf[tail].get()).write(item);
        }
        self.tail.store(next_tail, Ordering::Release);
        true
    }

    /// Reader-only. Non-blocking; returns `None` if the queue is empty.
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None; // empty
        }
        // SAFETY: slot `head` was published by the writer's Release store
        // of `tail` that we just observed with Acquire above.
        let item = unsafe { (*self.buf[head].get()).assume_init_read() };
        let next_head = (head + 1) & self.mask;
        self.head.store(next_head, Ordering::Release);
        Some(item)
    }

    /// Observational only - may be stale by the time the caller acts on it.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Observational only - may be stale by the time the caller acts on it.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head) & self.mask
    }

    pub fn capacity(&self) -> usize {
        self.mask
    }
}

impl<T> Drop for SpscQueue<T> {
    fn drop(&mut self) {
        // Drain any initialized-but-unconsumed slots so T's destructor runs.
        while self.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_pop_preserves_fifo_order() {
        let q: SpscQueue<u32> = SpscQueue::with_capacity(8);
        for i in 0..5 {
            assert!(q.push(i));
        }
        for i in 0..5 {
            assert_eq!(q.pop(), Some(i));
        }
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn full_queue_rejects_push() {
        let q: SpscQueue<u32> = SpscQueue::with_capacity(4);
        assert!(q.push(1));
        assert!(q.push(2));
        assert!(q.push(3));
        // capacity 4 => effective capacity 3
        assert!(!q.push(4));
        assert_eq!(q.pop(), Some(1));
        assert!(q.push(4));
    }

    #[test]
    fn empty_queue_pop_is_none() {
        let q: SpscQueue<u32> = SpscQueue::with_capacity(4);
        assert!(q.is_empty());
        assert_eq!(q.pop(), None);
    }

    #[test]
    #[should_panic]
    fn rejects_non_power_of_two_capacity() {
        let _: SpscQueue<u32> = SpscQueue::with_capacity(10);
    }

    #[test]
    fn concurrent_producer_consumer_preserves_order_and_count() {
        let q = Arc::new(SpscQueue::<u64>::with_capacity(256));
        let total = 200_000u64;

        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                let mut i = 0u64;
                while i < total {
                    if q.push(i) {
                        i += 1;
                    } else {
                        thread::yield_now();
                    }
                }
            })
        };

        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                let mut expected = 0u64;
                while expected < total {
                    if let Some(v) = q.pop() {
                        assert_eq!(v, expected);
                        expected += 1;
                    } else {
                        thread::yield_now();
                    }
                }
            })
        };

        producer.join().unwrap();
        consumer.join().unwrap();
    }

    #[test]
    fn drop_runs_destructors_on_remaining_items() {
        use std::sync::atomic::AtomicUsize as Counter;
        static DROPS: Counter = Counter::new(0);
        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }
        {
            let q: SpscQueue<Tracked> = SpscQueue::with_capacity(4);
            assert!(q.push(Tracked));
            assert!(q.push(Tracked));
            let _ = q.pop(); // one consumed and dropped normally
        }
        assert_eq!(DROPS.load(Ordering::SeqCst), 2);
    }
}
