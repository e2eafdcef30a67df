use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::message::Message;
use super::message_queue::MessageQueue;
use super::waiters::{WaiterId, WaiterRegistry};
use crate::config::{DEFAULT_MAX_MESSAGES, DEFAULT_MAX_MESSAGE_BYTES};
use crate::error::{BrokerError, Result};

/// Where a successfully published message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed straight to the oldest waiting consumer.
    Direct,
    /// Stored in the queue for a later consume.
    Queued,
}

pub struct BrokerStats {
    published_total: AtomicU64,
    delivered_direct: AtomicU64,
    delivered_from_queue: AtomicU64,
    rejected_full: AtomicU64,
    abandoned_waiters: AtomicU64,
    dropped_messages: AtomicU64,
}

impl BrokerStats {
    pub fn new() -> Self {
        Self {
            published_total: AtomicU64::new(0),
            delivered_direct: AtomicU64::new(0),
            delivered_from_queue: AtomicU64::new(0),
            rejected_full: AtomicU64::new(0),
            abandoned_waiters: AtomicU64::new(0),
            dropped_messages: AtomicU64::new(0),
        }
    }

    pub fn published_total(&self) -> u64 {
        self.published_total.load(Ordering::SeqCst)
    }

    pub fn delivered_direct(&self) -> u64 {
        self.delivered_direct.load(Ordering::SeqCst)
    }

    pub fn delivered_from_queue(&self) -> u64 {
        self.delivered_from_queue.load(Ordering::SeqCst)
    }

    pub fn rejected_full(&self) -> u64 {
        self.rejected_full.load(Ordering::SeqCst)
    }

    pub fn abandoned_waiters(&self) -> u64 {
        self.abandoned_waiters.load(Ordering::SeqCst)
    }

    /// Messages lost because a cancelled consumer's delivery could not be
    /// re-queued (queue refilled to capacity in the meantime).
    pub fn dropped_messages(&self) -> u64 {
        self.dropped_messages.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for BrokerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct BrokerState {
    queue: MessageQueue,
    waiters: WaiterRegistry,
}

impl BrokerState {
    /// Gives the message to the oldest waiter still listening. Waiters whose
    /// consumer is gone are discarded along the way. Returns the message when
    /// nobody is left to take it.
    fn hand_off(&mut self, mut message: Message) -> std::result::Result<WaiterId, Message> {
        while let Some(waiter) = self.waiters.take_oldest() {
            let id = waiter.id();
            match waiter.deliver(message) {
                Ok(()) => return Ok(id),
                Err(returned) => {
                    tracing::debug!(waiter = ?id, "skipping closed waiter");
                    message = returned;
                }
            }
        }
        Err(message)
    }
}

enum Claim<'a> {
    Ready(Message),
    Waiting(PendingConsume<'a>),
}

/// Single-topic broker pairing publishers with consumers in FIFO order.
///
/// Queue and waiter registry live behind one lock. A message is only ever
/// queued when no consumer is waiting, and a consumer only waits when the
/// queue is empty; both checks happen in the same critical section as the
/// mutation they guard.
pub struct Broker {
    state: Mutex<BrokerState>,
    max_message_bytes: usize,
    stats: BrokerStats,
}

impl Broker {
    pub fn new(max_messages: usize, max_message_bytes: usize) -> Self {
        Self {
            state: Mutex::new(BrokerState {
                queue: MessageQueue::new(max_messages),
                waiters: WaiterRegistry::new(),
            }),
            max_message_bytes,
            stats: BrokerStats::new(),
        }
    }

    pub fn publish(&self, payload: impl Into<Bytes>) -> Result<Delivery> {
        let payload = payload.into();
        if payload.is_empty() {
            return Err(BrokerError::EmptyMessage);
        }
        if payload.len() > self.max_message_bytes {
            return Err(BrokerError::MessageTooLarge {
                size: payload.len(),
                max: self.max_message_bytes,
            });
        }

        let message = Message::new(payload);
        let mut state = self.state.lock();
        let delivery = match state.hand_off(message) {
            Ok(waiter) => {
                tracing::debug!(waiter = ?waiter, "message handed to waiting consumer");
                BrokerStats::bump(&self.stats.delivered_direct);
                Delivery::Direct
            }
            Err(message) => {
                if let Err(err) = state.queue.enqueue(message) {
                    BrokerStats::bump(&self.stats.rejected_full);
                    return Err(err);
                }
                Delivery::Queued
            }
        };
        BrokerStats::bump(&self.stats.published_total);
        Ok(delivery)
    }

    /// Takes the oldest message, waiting for a publish when none is queued.
    ///
    /// There is no timeout. Dropping the returned future deregisters the
    /// consumer; a message already handed to it but never observed goes back
    /// to the next waiter or the head of the queue.
    pub async fn consume(&self) -> Message {
        loop {
            let mut pending = match self.claim() {
                Claim::Ready(message) => return message,
                Claim::Waiting(pending) => pending,
            };
            let delivered = (&mut pending.receiver).await;
            pending.settled = true;
            if let Ok(message) = delivered {
                return message;
            }
            // Sender dropped without a delivery; the waiter is no longer
            // registered, so register again.
        }
    }

    /// Non-blocking variant of [`Broker::consume`].
    pub fn try_consume(&self) -> Option<Message> {
        let message = self.state.lock().queue.dequeue()?;
        BrokerStats::bump(&self.stats.delivered_from_queue);
        Some(message)
    }

    fn claim(&self) -> Claim<'_> {
        let mut state = self.state.lock();
        if let Some(message) = state.queue.dequeue() {
            BrokerStats::bump(&self.stats.delivered_from_queue);
            return Claim::Ready(message);
        }
        let (sender, receiver) = oneshot::channel();
        let id = state.waiters.register(sender);
        tracing::debug!(waiter = ?id, waiting = state.waiters.len(), "consumer waiting");
        Claim::Waiting(PendingConsume {
            broker: self,
            id,
            receiver,
            settled: false,
        })
    }

    fn redispatch(&self, state: &mut BrokerState, message: Message) {
        match state.hand_off(message) {
            Ok(waiter) => {
                tracing::debug!(waiter = ?waiter, "undelivered message passed to next waiter");
            }
            Err(message) => {
                if let Err(message) = state.queue.requeue_front(message) {
                    BrokerStats::bump(&self.stats.dropped_messages);
                    tracing::warn!(
                        bytes = message.len(),
                        "queue full, dropping message returned by cancelled consumer"
                    );
                }
            }
        }
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn waiting_consumers(&self) -> usize {
        self.state.lock().waiters.len()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().queue.capacity()
    }

    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }

    pub fn stats(&self) -> &BrokerStats {
        &self.stats
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES, DEFAULT_MAX_MESSAGE_BYTES)
    }
}

// A registered consume that has not resolved yet. Dropping it unresolved
// deregisters the waiter.
struct PendingConsume<'a> {
    broker: &'a Broker,
    id: WaiterId,
    receiver: oneshot::Receiver<Message>,
    settled: bool,
}

impl Drop for PendingConsume<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.broker.state.lock();
        if state.waiters.remove(self.id) {
            BrokerStats::bump(&self.broker.stats.abandoned_waiters);
            tracing::debug!(waiter = ?self.id, "waiting consumer went away");
            return;
        }
        // Already taken by a publish; the message may be sitting in the channel.
        if let Ok(message) = self.receiver.try_recv() {
            BrokerStats::bump(&self.broker.stats.abandoned_waiters);
            self.broker.redispatch(&mut state, message);
        }
    }
}
