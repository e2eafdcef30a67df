use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;

/// A published payload plus the time the broker accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub payload: Bytes,
    /// Microseconds since the Unix epoch.
    pub enqueued_at: u64,
}

impl Message {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            enqueued_at: now_micros(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Microseconds elapsed since the message was accepted.
    pub fn age_micros(&self) -> u64 {
        now_micros().saturating_sub(self.enqueued_at)
    }
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}
