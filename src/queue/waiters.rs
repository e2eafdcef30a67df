use std::collections::VecDeque;

use tokio::sync::oneshot;

use super::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterId(u64);

/// A blocked consumer: the sending half of its one-shot delivery channel.
#[derive(Debug)]
pub struct Waiter {
    id: WaiterId,
    sender: oneshot::Sender<Message>,
}

impl Waiter {
    pub fn id(&self) -> WaiterId {
        self.id
    }

    /// Hands the message to the consumer and wakes it. Returns the message
    /// when the consumer has already gone away.
    pub fn deliver(self, message: Message) -> Result<(), Message> {
        self.sender.send(message)
    }
}

/// Consumers waiting for a message, served oldest first.
#[derive(Debug, Default)]
pub struct WaiterRegistry {
    waiters: VecDeque<Waiter>,
    next_id: u64,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sender: oneshot::Sender<Message>) -> WaiterId {
        let id = WaiterId(self.next_id);
        self.next_id += 1;
        self.waiters.push_back(Waiter { id, sender });
        id
    }

    pub fn take_oldest(&mut self) -> Option<Waiter> {
        self.waiters.pop_front()
    }

    /// Deregisters a waiter that gave up. Returns false when it was already
    /// taken for delivery.
    pub fn remove(&mut self, id: WaiterId) -> bool {
        match self.waiters.iter().position(|waiter| waiter.id == id) {
            Some(index) => {
                self.waiters.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
