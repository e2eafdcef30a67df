use std::collections::VecDeque;

use super::message::Message;
use crate::error::{BrokerError, Result};

/// Bounded FIFO of messages nobody has asked for yet.
///
/// Not synchronized on its own; the broker only touches it while holding its
/// state lock.
#[derive(Debug)]
pub struct MessageQueue {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn enqueue(&mut self, message: Message) -> Result<()> {
        if self.is_full() {
            return Err(BrokerError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.messages.push_back(message);
        Ok(())
    }

    pub fn dequeue(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    /// Puts a message back at the head so it is the next one delivered.
    /// Hands the message back when the queue is already at capacity.
    pub fn requeue_front(&mut self, message: Message) -> std::result::Result<(), Message> {
        if self.is_full() {
            return Err(message);
        }
        self.messages.push_front(message);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.messages.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
