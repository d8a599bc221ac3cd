//! In-memory Job Queue
//!
//! Mirrors the delivery contract of the broker:
//! - FIFO order, unacked deliveries tracked per delivery tag
//! - `nack(requeue = true)` puts the message back at the head, flagged redelivered
//! - `nack(requeue = false)` moves it to the dead letters
//! - [`MemoryJobQueue::sever`] drops every live connection and requeues what
//!   its consumers held, like a broker connection loss
//! - each consumer holds at most one unsettled delivery (prefetch of one)

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{Delivery, DeliveryAcker, JobConsumer, JobQueue, QueueConnector, QueueError};

#[derive(Debug, Clone)]
struct Message {
    body: Vec<u8>,
    redelivered: bool,
}

#[derive(Default)]
struct State {
    ready: VecDeque<Message>,
    unacked: HashMap<u64, Message>,
    dead_letters: Vec<Vec<u8>>,
    next_tag: u64,
    /// Bumped by `sever`; consumers and ackers of older generations are dead
    generation: u64,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    notify: Notify,
    unavailable: AtomicBool,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fails once a `sever` has outdated `generation`
    fn check_generation(state: &State, generation: u64) -> Result<(), QueueError> {
        if state.generation != generation {
            return Err(QueueError::ConnectionLost(
                "in-memory broker connection severed".to_string(),
            ));
        }
        Ok(())
    }

    fn check_available(&self) -> Result<(), QueueError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::Connection(
                "in-memory broker marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

/// Process-local implementation of [`JobQueue`]
///
/// The handle created by [`MemoryJobQueue::new`] stands for the broker itself
/// and survives `sever`. Handles returned by [`QueueConnector::connect`] stand
/// for one connection and fail with [`QueueError::ConnectionLost`] after it.
#[derive(Clone, Default)]
pub struct MemoryJobQueue {
    inner: Arc<Inner>,
    /// Connection generation, `None` for the broker handle
    generation: Option<u64>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, connecting and publishing fail with [`QueueError::Connection`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Simulates a lost broker connection
    ///
    /// Every live connection and consumer fails with
    /// [`QueueError::ConnectionLost`]; messages they had not settled return to
    /// the head of the queue.
    pub fn sever(&self) {
        {
            let mut state = self.inner.state();
            state.generation += 1;
            let mut unacked: Vec<(u64, Message)> = state.unacked.drain().collect();
            unacked.sort_by_key(|(tag, _)| std::cmp::Reverse(*tag));
            for (_, mut message) in unacked {
                message.redelivered = true;
                state.ready.push_front(message);
            }
        }
        self.inner.notify.notify_waiters();
    }

    /// Messages waiting to be delivered
    pub fn ready_len(&self) -> usize {
        self.inner.state().ready.len()
    }

    /// Messages delivered but not yet settled
    pub fn unacked_len(&self) -> usize {
        self.inner.state().unacked.len()
    }

    /// Bodies rejected without requeue
    pub fn dead_letters(&self) -> Vec<Vec<u8>> {
        self.inner.state().dead_letters.clone()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn publish(&self, body: &[u8]) -> Result<(), QueueError> {
        self.inner.check_available()?;
        {
            let mut state = self.inner.state();
            if let Some(generation) = self.generation {
                Inner::check_generation(&state, generation)?;
            }
            state.ready.push_back(Message {
                body: body.to_vec(),
                redelivered: false,
            });
        }
        self.inner.notify.notify_waiters();
        Ok(())
    }

    async fn consume(&self, _consumer_tag: &str) -> Result<Box<dyn JobConsumer>, QueueError> {
        self.inner.check_available()?;
        let state = self.inner.state();
        let generation = match self.generation {
            Some(generation) => {
                Inner::check_generation(&state, generation)?;
                generation
            }
            None => state.generation,
        };
        Ok(Box::new(MemoryConsumer {
            inner: Arc::clone(&self.inner),
            generation,
            in_flight: None,
        }))
    }
}

#[async_trait]
impl QueueConnector for MemoryJobQueue {
    fn target(&self) -> String {
        "in-memory broker".to_string()
    }

    async fn connect(&self) -> Result<Arc<dyn JobQueue>, QueueError> {
        self.inner.check_available()?;
        let generation = self.inner.state().generation;
        Ok(Arc::new(MemoryJobQueue {
            inner: Arc::clone(&self.inner),
            generation: Some(generation),
        }))
    }
}

struct MemoryConsumer {
    inner: Arc<Inner>,
    generation: u64,
    /// Tag of the last delivery handed out
    in_flight: Option<u64>,
}

impl MemoryConsumer {
    fn try_take(&mut self) -> Result<Option<Delivery>, QueueError> {
        let mut state = self.inner.state();
        Inner::check_generation(&state, self.generation)?;

        if let Some(tag) = self.in_flight {
            if state.unacked.contains_key(&tag) {
                return Ok(None);
            }
        }

        let Some(message) = state.ready.pop_front() else {
            return Ok(None);
        };

        state.next_tag += 1;
        let tag = state.next_tag;
        state.unacked.insert(tag, message.clone());
        self.in_flight = Some(tag);

        Ok(Some(Delivery::new(
            message.body,
            message.redelivered,
            MemoryAcker {
                inner: Arc::clone(&self.inner),
                tag,
                generation: self.generation,
            },
        )))
    }
}

#[async_trait]
impl JobConsumer for MemoryConsumer {
    async fn next_delivery(&mut self) -> Result<Delivery, QueueError> {
        let inner = Arc::clone(&self.inner);
        loop {
            let notified = inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(delivery) = self.try_take()? {
                return Ok(delivery);
            }

            notified.await;
        }
    }
}

struct MemoryAcker {
    inner: Arc<Inner>,
    tag: u64,
    generation: u64,
}

impl MemoryAcker {
    fn settle(&self) -> Result<Message, QueueError> {
        let mut state = self.inner.state();
        if state.generation != self.generation {
            return Err(QueueError::ConnectionLost(
                "delivery belongs to a severed connection".to_string(),
            ));
        }
        state
            .unacked
            .remove(&self.tag)
            .ok_or_else(|| QueueError::Broker(format!("unknown delivery tag {}", self.tag)))
    }
}

#[async_trait]
impl DeliveryAcker for MemoryAcker {
    async fn ack(&self) -> Result<(), QueueError> {
        self.settle()?;
        self.inner.notify.notify_waiters();
        Ok(())
    }

    async fn nack(&self, requeue: bool) -> Result<(), QueueError> {
        let mut message = self.settle()?;
        {
            let mut state = self.inner.state();
            if requeue {
                message.redelivered = true;
                state.ready.push_front(message);
            } else {
                state.dead_letters.push(message.body);
            }
        }
        self.inner.notify.notify_waiters();
        Ok(())
    }
}
