//! In-memory lock-based message queue.
//!
//! Emulates the receive-with-lock contract the worker relies on:
//! - a received message is locked and invisible to other receivers,
//! - `complete` removes it,
//! - `abandon` makes it visible again (or dead-letters it once
//!   `max_delivery_count` deliveries have been used up).
//!
//! Settled (completed / dead-lettered) messages stay inspectable through
//! `snapshot` until `settled_retention` newer ones have settled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use crate::domain::{LockToken, MessageId, QueueError};
use crate::observability::QueueCounts;
use crate::ports::{MessageLease, MessageQueue, MessageSender};

/// Default number of deliveries before a message is dead-lettered.
pub const DEFAULT_MAX_DELIVERY_COUNT: u32 = 10;

/// Default number of settled messages kept for inspection.
pub const DEFAULT_SETTLED_RETENTION: usize = 1024;

/// Message state inside the queue.
///
/// State transitions:
/// - Active -> Locked -> Completed
/// - Active -> Locked -> Active (abandon, deliveries left)
/// - Active -> Locked -> DeadLettered (abandon, deliveries used up)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageState {
    /// Visible to receivers.
    Active,

    /// Handed to a receiver; waiting for complete/abandon.
    Locked,

    /// Settled successfully.
    Completed,

    /// Parked after too many deliveries.
    DeadLettered,
}

/// Metadata + body for one message.
#[derive(Debug, Clone)]
struct MessageRecord {
    body: Vec<u8>,
    state: MessageState,

    /// Number of times this message has been received (including the current lock).
    delivery_count: u32,

    /// Current lock, if Locked.
    lock: Option<LockToken>,
}

impl MessageRecord {
    fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            state: MessageState::Active,
            delivery_count: 0,
            lock: None,
        }
    }

    fn lock(&mut self) -> LockToken {
        let token = LockToken::generate();
        self.state = MessageState::Locked;
        self.delivery_count += 1;
        self.lock = Some(token);
        token
    }

    fn holds(&self, token: LockToken) -> bool {
        self.state == MessageState::Locked && self.lock == Some(token)
    }

    fn settle(&mut self, state: MessageState) {
        self.state = state;
        self.lock = None;
    }
}

/// Point-in-time view of one message (for tests and the demo).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSnapshot {
    pub state: MessageState,
    pub delivery_count: u32,
    pub body: Vec<u8>,
}

struct QueueState {
    records: HashMap<MessageId, MessageRecord>,
    ready: VecDeque<MessageId>,
    /// Settled ids, oldest first.
    settled: VecDeque<MessageId>,
    settled_retention: usize,
    max_delivery_count: u32,
    receive_failures: u32,
    closed: bool,
}

impl QueueState {
    /// Remember a settled message, forgetting the oldest beyond the retention.
    fn retire(&mut self, id: MessageId) {
        self.settled.push_back(id);
        while self.settled.len() > self.settled_retention {
            if let Some(evicted) = self.settled.pop_front() {
                self.records.remove(&evicted);
            }
        }
    }

    fn counts_by_state(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in self.records.values() {
            match record.state {
                MessageState::Active => counts.active += 1,
                MessageState::Locked => counts.locked += 1,
                MessageState::Completed => counts.completed += 1,
                MessageState::DeadLettered => counts.dead_lettered += 1,
            }
        }
        counts
    }
}

/// In-memory queue implementation.
#[derive(Clone)]
pub struct InMemoryMessageQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::with_max_delivery_count(DEFAULT_MAX_DELIVERY_COUNT)
    }

    pub fn with_max_delivery_count(max_delivery_count: u32) -> Self {
        Self::with_limits(max_delivery_count, DEFAULT_SETTLED_RETENTION)
    }

    pub fn with_limits(max_delivery_count: u32, settled_retention: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                records: HashMap::new(),
                ready: VecDeque::new(),
                settled: VecDeque::new(),
                settled_retention,
                max_delivery_count: max_delivery_count.max(1),
                receive_failures: 0,
                closed: false,
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Make the next `n` receive calls fail with `QueueError::Receive`.
    pub async fn fail_next_receives(&self, n: u32) {
        self.state.lock().await.receive_failures = n;
    }

    /// Stop handing out messages; pending and future receives return `Closed`.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
    }

    pub async fn counts_by_state(&self) -> QueueCounts {
        self.state.lock().await.counts_by_state()
    }

    pub async fn snapshot(&self, id: MessageId) -> Option<MessageSnapshot> {
        let state = self.state.lock().await;
        state.records.get(&id).map(|record| MessageSnapshot {
            state: record.state,
            delivery_count: record.delivery_count,
            body: record.body.clone(),
        })
    }
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSender for InMemoryMessageQueue {
    async fn send(&self, body: Vec<u8>) -> Result<MessageId, QueueError> {
        let id = MessageId::generate();
        {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(QueueError::Closed);
            }
            state.records.insert(id, MessageRecord::new(body));
            state.ready.push_back(id);
        }
        self.notify.notify_one();
        Ok(id)
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn receive(&self) -> Result<Box<dyn MessageLease>, QueueError> {
        loop {
            // Register interest before checking so a close() in between is not missed.
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().await;
                if state.receive_failures > 0 {
                    state.receive_failures -= 1;
                    return Err(QueueError::Receive("injected receive failure".into()));
                }
                if state.closed {
                    return Err(QueueError::Closed);
                }

                while let Some(id) = state.ready.pop_front() {
                    let Some(record) = state.records.get_mut(&id) else {
                        continue;
                    };
                    if record.state != MessageState::Active {
                        continue;
                    }
                    let lock = record.lock();
                    return Ok(Box::new(InMemoryLease {
                        id,
                        lock,
                        body: record.body.clone(),
                        delivery_count: record.delivery_count,
                        queue: Arc::clone(&self.state),
                        notify: Arc::clone(&self.notify),
                    }));
                }
            }
            notified.await;
        }
    }
}

/// Lease implementation for InMemoryMessageQueue.
struct InMemoryLease {
    id: MessageId,
    lock: LockToken,
    body: Vec<u8>,
    delivery_count: u32,
    queue: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

#[async_trait]
impl MessageLease for InMemoryLease {
    fn message_id(&self) -> MessageId {
        self.id
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn delivery_count(&self) -> u32 {
        self.delivery_count
    }

    async fn complete(self: Box<Self>) -> Result<(), QueueError> {
        let mut state = self.queue.lock().await;
        let record = state
            .records
            .get_mut(&self.id)
            .filter(|record| record.holds(self.lock))
            .ok_or_else(|| QueueError::LockLost(self.lock.to_string()))?;
        record.settle(MessageState::Completed);
        state.retire(self.id);
        Ok(())
    }

    async fn abandon(self: Box<Self>) -> Result<(), QueueError> {
        let requeued = {
            let mut state = self.queue.lock().await;
            let max_delivery_count = state.max_delivery_count;
            let record = state
                .records
                .get_mut(&self.id)
                .filter(|record| record.holds(self.lock))
                .ok_or_else(|| QueueError::LockLost(self.lock.to_string()))?;

            if record.delivery_count >= max_delivery_count {
                record.settle(MessageState::DeadLettered);
                tracing::warn!(
                    message_id = %self.id,
                    delivery_count = record.delivery_count,
                    "message dead-lettered after max deliveries"
                );
                state.retire(self.id);
                false
            } else {
                record.settle(MessageState::Active);
                state.ready.push_back(self.id);
                true
            }
        };

        if requeued {
            self.notify.notify_one();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn send_receive_complete() {
        let queue = InMemoryMessageQueue::new();
        let id = queue.send(b"hello".to_vec()).await.unwrap();

        let lease = queue.receive().await.unwrap();
        assert_eq!(lease.message_id(), id);
        assert_eq!(lease.body(), b"hello");
        assert_eq!(lease.delivery_count(), 1);

        let counts = queue.counts_by_state().await;
        assert_eq!(counts.locked, 1);
        assert_eq!(counts.active, 0);

        lease.complete().await.unwrap();
        let snapshot = queue.snapshot(id).await.unwrap();
        assert_eq!(snapshot.state, MessageState::Completed);
    }

    #[tokio::test]
    async fn locked_message_is_invisible_to_other_receivers() {
        let queue = InMemoryMessageQueue::new();
        queue.send(b"one".to_vec()).await.unwrap();
        let _lease = queue.receive().await.unwrap();

        let second = tokio::time::timeout(Duration::from_millis(50), queue.receive()).await;
        assert!(second.is_err(), "second receive should still be waiting");
    }

    #[tokio::test]
    async fn abandon_redelivers_with_incremented_count() {
        let queue = InMemoryMessageQueue::new();
        let id = queue.send(b"retry me".to_vec()).await.unwrap();

        queue.receive().await.unwrap().abandon().await.unwrap();
        let lease = queue.receive().await.unwrap();

        assert_eq!(lease.message_id(), id);
        assert_eq!(lease.delivery_count(), 2);
    }

    #[tokio::test]
    async fn abandon_after_max_deliveries_dead_letters() {
        let queue = InMemoryMessageQueue::with_max_delivery_count(2);
        let id = queue.send(b"poison".to_vec()).await.unwrap();

        queue.receive().await.unwrap().abandon().await.unwrap();
        queue.receive().await.unwrap().abandon().await.unwrap();

        let snapshot = queue.snapshot(id).await.unwrap();
        assert_eq!(snapshot.state, MessageState::DeadLettered);
        assert_eq!(snapshot.delivery_count, 2);
        assert_eq!(queue.counts_by_state().await.dead_lettered, 1);
    }

    #[tokio::test]
    async fn settled_messages_beyond_retention_are_forgotten() {
        let queue = InMemoryMessageQueue::with_limits(1, 2);
        let mut ids = Vec::new();
        for body in [b"a", b"b", b"c"] {
            ids.push(queue.send(body.to_vec()).await.unwrap());
        }
        let pending = queue.send(b"d".to_vec()).await.unwrap();

        queue.receive().await.unwrap().complete().await.unwrap();
        queue.receive().await.unwrap().abandon().await.unwrap();
        queue.receive().await.unwrap().complete().await.unwrap();

        assert_eq!(queue.snapshot(ids[0]).await, None);
        assert_eq!(queue.snapshot(ids[1]).await.unwrap().state, MessageState::DeadLettered);
        assert_eq!(queue.snapshot(ids[2]).await.unwrap().state, MessageState::Completed);
        assert_eq!(queue.snapshot(pending).await.unwrap().state, MessageState::Active);

        let counts = queue.counts_by_state().await;
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.dead_lettered, 1);
        assert_eq!(counts.active, 1);
    }

    #[tokio::test]
    async fn send_wakes_waiting_receiver() {
        let queue = InMemoryMessageQueue::new();
        let waiter = tokio::spawn({
            let queue = queue.clone();
            async move { queue.receive().await.map(|lease| lease.delivery_count()) }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.send(b"late".to_vec()).await.unwrap();

        assert_eq!(waiter.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn injected_failures_then_recovers() {
        let queue = InMemoryMessageQueue::new();
        queue.send(b"x".to_vec()).await.unwrap();
        queue.fail_next_receives(2).await;

        assert!(matches!(queue.receive().await, Err(QueueError::Receive(_))));
        assert!(matches!(queue.receive().await, Err(QueueError::Receive(_))));
        assert!(queue.receive().await.is_ok());
    }

    #[tokio::test]
    async fn close_wakes_receivers_with_closed() {
        let queue = InMemoryMessageQueue::new();
        let waiter = tokio::spawn({
            let queue = queue.clone();
            async move { queue.receive().await.err() }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close().await;

        assert_eq!(waiter.await.unwrap(), Some(QueueError::Closed));
        assert_eq!(queue.send(b"x".to_vec()).await, Err(QueueError::Closed));
    }
}
