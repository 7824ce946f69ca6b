//! Joinable bounded channels.
//!
//! Both the ingestion queue (console samples → dispatcher) and the outbound
//! queue (commands → console input) are one of these. Closing is native:
//! once every [`Producer`] is dropped the [`Consumer`] drains what is left
//! and then sees `None`. A [`Join`] handle waits until every item that was
//! put has been marked done by the consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{Notify, mpsc};

/// Returned by [`Producer::put`] when the consumer has gone away.
#[derive(Debug)]
pub struct Closed<T>(pub T);

#[derive(Debug, Default)]
struct Tracker {
    unfinished: AtomicUsize,
    drained: Notify,
    finished: AtomicBool,
}

impl Tracker {
    fn task_done(&self) {
        let prev = self.unfinished.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "task_done called more times than items were put");
        if prev == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Create a queue holding at most `capacity` undelivered items.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn channel<T>(capacity: usize) -> (Producer<T>, Consumer<T>, Join) {
    let (tx, rx) = mpsc::channel(capacity);
    let tracker = Arc::new(Tracker::default());
    (
        Producer {
            tx,
            tracker: Arc::clone(&tracker),
        },
        Consumer {
            rx,
            tracker: Arc::clone(&tracker),
        },
        Join { tracker },
    )
}

/// Sending half. Dropping the last clone closes the queue.
#[derive(Debug)]
pub struct Producer<T> {
    tx: mpsc::Sender<T>,
    tracker: Arc<Tracker>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<T> Producer<T> {
    /// Put an item, waiting for room if the queue is full.
    ///
    /// Cancel safe: if the future is dropped while waiting, nothing was
    /// enqueued and the item is dropped with it.
    pub async fn put(&self, item: T) -> Result<(), Closed<T>> {
        let Ok(permit) = self.tx.reserve().await else {
            return Err(Closed(item));
        };
        self.tracker.unfinished.fetch_add(1, Ordering::AcqRel);
        permit.send(item);
        Ok(())
    }

    /// Blocking variant of [`put`](Self::put) for plain threads.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    pub fn blocking_put(&self, item: T) -> Result<(), Closed<T>> {
        self.tracker.unfinished.fetch_add(1, Ordering::AcqRel);
        self.tx.blocking_send(item).map_err(|e| {
            self.tracker.task_done();
            Closed(e.0)
        })
    }
}

/// Receiving half.
#[derive(Debug)]
pub struct Consumer<T> {
    rx: mpsc::Receiver<T>,
    tracker: Arc<Tracker>,
}

impl<T> Consumer<T> {
    /// Take the next item, or `None` once the queue is closed and empty.
    ///
    /// Cancel safe. Every `Some` must be followed by a [`task_done`](Self::task_done).
    pub async fn get(&mut self) -> Option<T> {
        let item = self.rx.recv().await;
        if item.is_none() {
            self.tracker.finished.store(true, Ordering::Release);
        }
        item
    }

    /// Mark one previously received item as processed.
    pub fn task_done(&self) {
        self.tracker.task_done();
    }

    /// Stop accepting items. Already queued items can still be taken.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Observes completion of a queue.
#[derive(Debug, Clone)]
pub struct Join {
    tracker: Arc<Tracker>,
}

impl Join {
    /// Wait until every item put so far has been marked done.
    pub async fn join(&self) {
        loop {
            let notified = self.tracker.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Items put but not yet marked done.
    pub fn pending(&self) -> usize {
        self.tracker.unfinished.load(Ordering::Acquire)
    }

    /// Whether the consumer has observed the closed, empty queue.
    pub fn is_finished(&self) -> bool {
        self.tracker.finished.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[tokio::test]
    async fn items_arrive_in_order_then_close() {
        let (producer, mut consumer, join) = channel(4);
        for n in 1..=3 {
            producer.put(n).await.unwrap();
        }
        drop(producer);

        let mut seen = Vec::new();
        while let Some(n) = consumer.get().await {
            seen.push(n);
            consumer.task_done();
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(join.is_finished());
        assert_eq!(join.pending(), 0);
    }

    #[tokio::test]
    async fn join_waits_for_task_done() {
        let (producer, mut consumer, join) = channel(4);
        producer.put("a").await.unwrap();
        producer.put("b").await.unwrap();
        assert_eq!(join.pending(), 2);

        let waiter = tokio::spawn({
            let join = join.clone();
            async move { join.join().await }
        });

        consumer.get().await.unwrap();
        consumer.task_done();
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        consumer.get().await.unwrap();
        consumer.task_done();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn join_on_empty_queue_returns_immediately() {
        let (_producer, _consumer, join) = channel::<u8>(1);
        tokio::time::timeout(Duration::from_secs(1), join.join())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn put_fails_after_consumer_drops() {
        let (producer, consumer, join) = channel(1);
        drop(consumer);
        let err = producer.put(7).await.unwrap_err();
        assert_eq!(err.0, 7);
        assert_eq!(join.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_put_leaves_nothing_pending() {
        let (producer, mut consumer, join) = channel(1);
        producer.put(1).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), producer.put(2)).await;
        assert!(blocked.is_err());
        assert_eq!(join.pending(), 1);

        assert_eq!(consumer.get().await, Some(1));
        consumer.task_done();
        assert_eq!(join.pending(), 0);
    }

    #[test]
    fn blocking_put_from_a_plain_thread() {
        let (producer, mut consumer, join) = channel(2);
        std::thread::spawn(move || {
            producer.blocking_put("ping").unwrap();
        })
        .join()
        .unwrap();

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            assert_eq!(consumer.get().await, Some("ping"));
            consumer.task_done();
            assert_eq!(consumer.get().await, None);
        });
        assert!(join.is_finished());
        assert_eq!(join.pending(), 0);
    }

    #[tokio::test]
    async fn not_finished_while_producers_remain() {
        let (producer, mut consumer, join) = channel(2);
        producer.put(1).await.unwrap();
        assert_eq!(consumer.get().await, Some(1));
        consumer.task_done();
        assert!(!join.is_finished());
    }
}
