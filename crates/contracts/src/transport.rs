//! Work queue transport interface
//!
//! The transport must support concurrent consumers with per-message
//! visibility/lease semantics: a popped message is invisible to other
//! handles until it is committed (removed) or rolled back (redelivered).
//!
//! Assumption (not enforced here): redelivered messages for the same source
//! key are not handed to two handles concurrently; single-flight per key is
//! the transport's responsibility.

use std::time::Duration;

use async_trait::async_trait;

use crate::{ContractError, SourceBlock};

/// One consumer handle onto the shared logical queue.
///
/// A handle carries at most one in-flight message: `pop` leases it,
/// `commit`/`rollback` resolve it. The pop → process → commit|rollback
/// transaction is the engine's unit of consistency.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Queue name (used for logging and error identity)
    fn name(&self) -> &str;

    /// Lease the next message, waiting up to `wait` for one to arrive.
    /// A zero wait returns immediately.
    ///
    /// # Errors
    /// `Queue` when this handle already holds an unresolved message.
    async fn pop(&self, wait: Duration) -> Result<Option<SourceBlock>, ContractError>;

    /// Enqueue a block (producer side, used for fan-out).
    async fn add(&self, block: SourceBlock) -> Result<(), ContractError>;

    /// Acknowledge the in-flight message; it will not be redelivered.
    async fn commit(&self) -> Result<(), ContractError>;

    /// Return the in-flight message to the queue for redelivery.
    async fn rollback(&self) -> Result<(), ContractError>;

    /// Release the handle; any in-flight message returns to the queue.
    async fn close(&self) -> Result<(), ContractError>;

    /// Current backlog (visible messages).
    async fn backlog(&self) -> usize;
}

/// Factory for per-worker queue handles.
pub trait QueueTransport: Send + Sync {
    /// Acquire a new consumer handle onto the shared queue.
    fn handle(&self) -> Box<dyn WorkQueue>;
}
