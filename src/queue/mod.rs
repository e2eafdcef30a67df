// Broker state: the bounded queue, the waiter registry and the broker that
// owns both under one lock.

pub mod broker;
pub mod message;
pub mod message_queue;
pub mod waiters;

pub use broker::{Broker, BrokerStats, Delivery};
pub use message::Message;
pub use message_queue::MessageQueue;
pub use waiters::{Waiter, WaiterId, WaiterRegistry};
