//! Haul store: the FIFO buffer shared by the order generator and processor.

#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use haul_core::Order;
use metrics::{counter, gauge};
use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// Buffer carrying orders between pipeline stages.
pub type OrderBuffer = Buffer<Order>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferStats {
    pub len: usize,
    pub enqueued: u64,
    pub dequeued: u64,
}

/// Unbounded FIFO guarded by a single mutex.
///
/// Any number of threads may enqueue and dequeue. The lock is held only while
/// the deque is touched; `len`/`is_empty` are snapshots and may be stale by
/// the time the caller acts on them. A `None` from a dequeue is the
/// authoritative "nothing there".
pub struct Buffer<T> {
    inner: Mutex<Inner<T>>,
    ready: Condvar,
}

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
    enqueued: u64,
    dequeued: u64,
}

impl<T> Inner<T> {
    fn pop(&mut self) -> Option<T> {
        let item = self.items.pop_front()?;
        self.dequeued += 1;
        gauge!("haul_buffer_depth", self.items.len() as f64);
        Some(item)
    }
}

impl<T> Default for Buffer<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Buffer<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { items: VecDeque::new(), closed: false, enqueued: 0, dequeued: 0 }),
            ready: Condvar::new(),
        }
    }

    /// Append at the tail. Never blocks on capacity and never fails; items
    /// pushed after [`close`](Self::close) are still delivered.
    pub fn enqueue(&self, item: T) {
        {
            let mut inner = self.inner.lock();
            inner.items.push_back(item);
            inner.enqueued += 1;
            // Published under the lock so concurrent writers cannot reorder it.
            gauge!("haul_buffer_depth", inner.items.len() as f64);
        }
        self.ready.notify_one();
        counter!("haul_buffer_enqueued_total", 1u64);
    }

    /// Remove the head if there is one. Does not wait.
    pub fn dequeue(&self) -> Option<T> {
        let item = self.inner.lock().pop();
        if item.is_some() {
            counter!("haul_buffer_dequeued_total", 1u64);
        }
        item
    }

    /// Wait up to `timeout` for an item. A timeout too large to represent as a
    /// deadline (`Duration::MAX`) waits without one.
    ///
    /// Returns early with `None` once the buffer is closed and drained.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<T> {
        let mut inner = self.inner.lock();
        let mut deadline = None;
        let item = loop {
            if let Some(item) = inner.pop() {
                break Some(item);
            }
            if inner.closed {
                break None;
            }
            let until = *deadline.get_or_insert_with(|| Instant::now().checked_add(timeout));
            match until {
                Some(at) => {
                    if self.ready.wait_until(&mut inner, at).timed_out() {
                        break inner.pop();
                    }
                }
                None => self.ready.wait(&mut inner),
            }
        };
        drop(inner);
        if item.is_some() {
            counter!("haul_buffer_dequeued_total", 1u64);
        }
        item
    }

    /// Mark that nothing more will be produced and wake every waiter.
    pub fn close(&self) {
        let was_closed = std::mem::replace(&mut self.inner.lock().closed, true);
        if !was_closed {
            debug!("buffer closed");
        }
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool { self.inner.lock().closed }
    pub fn is_empty(&self) -> bool { self.inner.lock().items.is_empty() }
    pub fn len(&self) -> usize { self.inner.lock().items.len() }

    /// Depth and lifetime totals, read under one lock.
    pub fn stats(&self) -> BufferStats {
        let inner = self.inner.lock();
        BufferStats { len: inner.items.len(), enqueued: inner.enqueued, dequeued: inner.dequeued }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Buffer")
            .field("items", &inner.items)
            .field("closed", &inner.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dequeue_is_sentinel_not_error() {
        let b: Buffer<u32> = Buffer::new();
        assert!(b.is_empty());
        assert_eq!(b.dequeue(), None);
        assert_eq!(b.stats(), BufferStats::default());
    }

    #[test]
    fn dequeue_timeout_gives_up_on_empty() {
        let b: Buffer<u32> = Buffer::new();
        let started = Instant::now();
        assert_eq!(b.dequeue_timeout(Duration::from_millis(20)), None);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn closed_buffer_still_drains_then_returns_none_immediately() {
        let b = Buffer::new();
        b.enqueue(1);
        b.close();
        b.enqueue(2);
        assert!(b.is_closed());
        assert_eq!(b.dequeue_timeout(Duration::from_secs(5)), Some(1));
        assert_eq!(b.dequeue_timeout(Duration::from_secs(5)), Some(2));
        let started = Instant::now();
        assert_eq!(b.dequeue_timeout(Duration::from_secs(5)), None);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn unbounded_timeout_returns_queued_item() {
        let b = Buffer::new();
        b.enqueue(1u8);
        assert_eq!(b.dequeue_timeout(Duration::MAX), Some(1));
        b.close();
        assert_eq!(b.dequeue_timeout(Duration::MAX), None);
    }

    #[test]
    fn unbounded_timeout_waits_for_producer() {
        let b = std::sync::Arc::new(Buffer::new());
        let waiter = {
            let b = b.clone();
            std::thread::spawn(move || b.dequeue_timeout(Duration::MAX))
        };
        std::thread::sleep(Duration::from_millis(20));
        b.enqueue(9u32);
        assert_eq!(waiter.join().unwrap(), Some(9));
    }

    #[test]
    fn debug_lists_items_head_first() {
        let b = Buffer::new();
        b.enqueue("a");
        b.enqueue("b");
        assert_eq!(format!("{:?}", b), r#"Buffer { items: ["a", "b"], closed: false }"#);
    }
}
