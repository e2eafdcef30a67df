use std::io;

pub type Result<T> = std::result::Result<T, BrokerError>;

/// Failures surfaced by the broker and the line protocol.
///
/// The `Display` text of every per-command variant is exactly the reason sent
/// back to the client after `ERROR: `.
#[derive(thiserror::Error, Debug)]
pub enum BrokerError {
    #[error("Invalid message format")]
    InvalidFormat,
    #[error("Cannot publish an empty message")]
    EmptyMessage,
    #[error("Message too large")]
    MessageTooLarge { size: usize, max: usize },
    #[error("Server is full")]
    QueueFull { capacity: usize },
    #[error("connection i/o: {0}")]
    Io(#[from] io::Error),
}

impl BrokerError {
    /// Whether the error is scoped to a single command and should be reported
    /// to the client while the connection stays open.
    pub fn is_per_command(&self) -> bool {
        !matches!(self, BrokerError::Io(_))
    }
}
