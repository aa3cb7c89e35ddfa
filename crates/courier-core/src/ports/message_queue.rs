//! Message queue ports: receive-with-lock for the worker, send for ingress.
//!
//! The transport itself (delivery, lock expiry, redelivery policy) is external.
//! `impls::InMemoryMessageQueue` emulates it for development and tests.

use async_trait::async_trait;

use crate::domain::{MessageId, QueueError};

/// A locked message. The holder must either `complete` or `abandon` it.
///
/// Design intent:
/// - The queue owns redelivery and dead-lettering.
/// - The worker only reports the outcome of its side effects.
/// - Both outcomes consume the lease so a message cannot be settled twice.
#[async_trait]
pub trait MessageLease: Send {
    fn message_id(&self) -> MessageId;

    /// Raw message body (JSON).
    fn body(&self) -> &[u8];

    /// How many times this message has been handed out, including this one.
    fn delivery_count(&self) -> u32;

    /// Remove the message from the queue.
    async fn complete(self: Box<Self>) -> Result<(), QueueError>;

    /// Release the lock so the queue may redeliver it.
    async fn abandon(self: Box<Self>) -> Result<(), QueueError>;
}

/// Consumer side of the queue.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Wait until a message is available and lock it.
    ///
    /// An `Err` means the transport itself failed; the caller backs off and retries.
    async fn receive(&self) -> Result<Box<dyn MessageLease>, QueueError>;
}

/// Producer side of the queue.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, body: Vec<u8>) -> Result<MessageId, QueueError>;
}
