//! MemoryQueue - in-process work queue with lease semantics
//!
//! Models the transport contract the engine depends on: concurrent consumer
//! handles over one logical queue, one in-flight message per handle,
//! commit/rollback resolution, and redelivery on rollback or handle drop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use contracts::{ContractError, QueueTransport, SourceBlock, WorkQueue};

struct QueueInner {
    name: String,
    pending: Mutex<VecDeque<SourceBlock>>,
    notify: Notify,
}

/// Shared logical queue; hand out consumer handles with [`MemoryQueue::handle`].
#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<QueueInner>,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                name: name.into(),
                pending: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Enqueue without going through a consumer handle (seeding).
    pub fn push(&self, block: SourceBlock) {
        self.inner.pending.lock().unwrap().push_back(block);
        self.inner.notify.notify_one();
    }

    /// Visible messages.
    pub fn backlog(&self) -> usize {
        self.inner.pending.lock().unwrap().len()
    }
}

impl QueueTransport for MemoryQueue {
    fn handle(&self) -> Box<dyn WorkQueue> {
        Box::new(MemoryQueueHandle {
            inner: Arc::clone(&self.inner),
            in_flight: Mutex::new(None),
        })
    }
}

/// One consumer handle; at most one leased message at a time.
pub struct MemoryQueueHandle {
    inner: Arc<QueueInner>,
    in_flight: Mutex<Option<SourceBlock>>,
}

impl MemoryQueueHandle {
    fn take_pending(&self) -> Option<SourceBlock> {
        self.inner.pending.lock().unwrap().pop_front()
    }

    /// Return a leased message to the head of the queue for redelivery.
    fn release_lease(&self) {
        if let Some(block) = self.in_flight.lock().unwrap().take() {
            self.inner.pending.lock().unwrap().push_front(block);
            self.inner.notify.notify_one();
        }
    }
}

#[async_trait]
impl WorkQueue for MemoryQueueHandle {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn pop(&self, wait: Duration) -> Result<Option<SourceBlock>, ContractError> {
        if self.in_flight.lock().unwrap().is_some() {
            return Err(ContractError::queue(
                &self.inner.name,
                "previous message not committed or rolled back",
            ));
        }

        let deadline = Instant::now() + wait;
        loop {
            if let Some(block) = self.take_pending() {
                *self.in_flight.lock().unwrap() = Some(block.clone());
                return Ok(Some(block));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            // A push may slip in between the lock release and this await;
            // Notify keeps a stored permit for that case, so just re-check.
            if tokio::time::timeout(remaining, self.inner.notify.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn add(&self, block: SourceBlock) -> Result<(), ContractError> {
        self.inner.pending.lock().unwrap().push_back(block);
        self.inner.notify.notify_one();
        Ok(())
    }

    async fn commit(&self) -> Result<(), ContractError> {
        match self.in_flight.lock().unwrap().take() {
            Some(_) => Ok(()),
            None => Err(ContractError::queue(
                &self.inner.name,
                "no in-flight message to commit",
            )),
        }
    }

    async fn rollback(&self) -> Result<(), ContractError> {
        let block = self.in_flight.lock().unwrap().take();
        match block {
            Some(block) => {
                debug!(queue = %self.inner.name, key = ?block.key, "message rolled back");
                self.inner.pending.lock().unwrap().push_front(block);
                self.inner.notify.notify_one();
                Ok(())
            }
            None => Err(ContractError::queue(
                &self.inner.name,
                "no in-flight message to roll back",
            )),
        }
    }

    async fn close(&self) -> Result<(), ContractError> {
        self.release_lease();
        Ok(())
    }

    async fn backlog(&self) -> usize {
        self.inner.pending.lock().unwrap().len()
    }
}

impl Drop for MemoryQueueHandle {
    fn drop(&mut self) {
        // An unresolved lease must not be lost with the handle.
        self.release_lease();
    }
}
