// relayq - single-topic in-memory message broker
//
// Producers `PUBLISH` over a line-oriented TCP protocol, consumers `CONSUME`,
// and the broker pairs them first-in first-out. Binary entry point is in
// src/main.rs

pub mod client;
pub mod config;
pub mod error;
pub mod line;
pub mod queue;

pub use config::BrokerConfig;
pub use error::{BrokerError, Result};
pub use line::{serve, LineServer};
pub use queue::{Broker, BrokerStats, Delivery, Message, MessageQueue, WaiterRegistry};
