use anyhow::{bail, Context, Result};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_MESSAGES: usize = 100;
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 10 * 1024;

/// Broker process configuration sourced from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Listener host.
    pub host: String,
    /// Listener port.
    pub port: u16,
    /// Queue capacity.
    pub max_messages: usize,
    /// Largest accepted payload in bytes.
    pub max_message_bytes: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_messages: DEFAULT_MAX_MESSAGES,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl BrokerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let host = std::env::var("RELAYQ_HOST").unwrap_or(defaults.host);
        let port = env_number("RELAYQ_PORT")?.unwrap_or(defaults.port);
        let max_messages = env_number("RELAYQ_MAX_MESSAGES")?.unwrap_or(defaults.max_messages);
        let max_message_bytes =
            env_number("RELAYQ_MAX_MESSAGE_BYTES")?.unwrap_or(defaults.max_message_bytes);

        let config = Self {
            host,
            port,
            max_messages,
            max_message_bytes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_messages == 0 {
            bail!("RELAYQ_MAX_MESSAGES must be greater than zero");
        }
        if self.max_message_bytes == 0 {
            bail!("RELAYQ_MAX_MESSAGE_BYTES must be greater than zero");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_number<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parse {key}")),
        Err(_) => Ok(None),
    }
}
