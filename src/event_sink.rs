//! Bounded, oldest-drop event delivery to a peer connection's owner.
//!
//! `tokio::sync::mpsc` does not let a producer reach into a full channel
//! and evict the oldest item — only the single receiver can drain it. So
//! instead of forcing that shape onto `mpsc`, this is a small ring buffer
//! behind a mutex with a [`Notify`] to wake a waiting reader, which lets the
//! actor (the sole producer) enforce the drop policy itself.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

struct Inner<T> {
    queue: Mutex<VecDeque<T>>,
    capacity: usize,
    dropped: AtomicU64,
    notify: Notify,
}

/// Producer handle for an [`EventSink`]. Held by the peer connection actor.
pub struct EventSender<T> {
    inner: Arc<Inner<T>>,
}

/// Consumer handle for an [`EventSink`]. Held by the peer connection's
/// owner.
#[derive(Clone)]
pub struct EventReceiver<T> {
    inner: Arc<Inner<T>>,
}

/// Creates a bounded event channel of the given capacity (must be at least
/// 1).
#[must_use]
pub fn channel<T>(capacity: usize) -> (EventSender<T>, EventReceiver<T>) {
    let inner = Arc::new(Inner {
        queue: Mutex::new(VecDeque::with_capacity(capacity)),
        capacity: capacity.max(1),
        dropped: AtomicU64::new(0),
        notify: Notify::new(),
    });
    (
        EventSender { inner: inner.clone() },
        EventReceiver { inner },
    )
}

impl<T> EventSender<T> {
    /// Pushes an event, dropping the oldest queued event if the sink is at
    /// capacity.
    pub fn push(&self, event: T) {
        let mut queue = self.inner.queue.lock().unwrap();
        if queue.len() >= self.inner.capacity {
            queue.pop_front();
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(event);
        drop(queue);
        self.inner.notify.notify_waiters();
    }

    /// Count of events dropped for overflow since construction.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

impl<T> EventReceiver<T> {
    /// Waits for and returns the next event, in FIFO order.
    pub async fn recv(&self) -> T {
        loop {
            // Registering interest before the queue check (rather than
            // after) is what closes the race: a `push()` landing between
            // the check and the wait would otherwise call `notify_waiters`
            // with no waiter registered yet, and the wakeup would be lost.
            // `Notified` captures the current notification state at
            // creation, so a `notify_waiters` call anywhere after this line
            // is guaranteed to wake it even though it hasn't been polled
            // yet.
            let notified = self.inner.notify.notified();
            {
                let mut queue = self.inner.queue.lock().unwrap();
                if let Some(event) = queue.pop_front() {
                    return event;
                }
            }
            notified.await;
        }
    }

    /// Returns the next already-queued event without waiting, if any.
    pub fn try_recv(&self) -> Option<T> {
        self.inner.queue.lock().unwrap().pop_front()
    }

    /// Count of events dropped for overflow since construction.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready};

    #[tokio::test]
    async fn drops_oldest_when_over_capacity() {
        let (tx, rx) = channel(2);
        tx.push(1);
        tx.push(2);
        tx.push(3);
        assert_eq!(tx.dropped_events(), 1);
        assert_eq!(rx.recv().await, 2);
        assert_eq!(rx.recv().await, 3);
    }

    #[test]
    fn recv_waits_for_a_push() {
        let (tx, rx) = channel::<u32>(4);
        let mut recv = tokio_test::task::spawn(rx.recv());
        assert_pending!(recv.poll());
        tx.push(42);
        assert_eq!(assert_ready!(recv.poll()), 42);
    }
}
