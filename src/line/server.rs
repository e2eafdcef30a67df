use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use super::handler::handle_connection;
use crate::config::BrokerConfig;
use crate::queue::Broker;

/// TCP acceptor; one task per connection, all sharing the broker.
pub struct LineServer {
    listener: TcpListener,
    broker: Arc<Broker>,
}

impl LineServer {
    pub async fn bind(config: &BrokerConfig, broker: Arc<Broker>) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr()).await?;
        Ok(Self { listener, broker })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves. Accept failures are
    /// logged and never stop the loop.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        match self.listener.local_addr() {
            Ok(addr) => tracing::info!(%addr, "relayq server listening"),
            Err(err) => tracing::warn!(error = %err, "relayq server listening on unknown address"),
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("relayq server stopped accepting connections");
                    return;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        tracing::info!(%peer_addr, "new connection");
                        let broker = Arc::clone(&self.broker);
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(socket, broker).await {
                                tracing::warn!(%peer_addr, error = %err, "connection error");
                            }
                        });
                    }
                    Err(err) => tracing::warn!(error = %err, "accept failed"),
                },
            }
        }
    }
}

/// Builds a broker from `config` and serves it until `shutdown` resolves.
pub async fn serve<F>(config: BrokerConfig, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    let broker = Arc::new(Broker::new(config.max_messages, config.max_message_bytes));
    tracing::info!(
        max_messages = config.max_messages,
        max_message_bytes = config.max_message_bytes,
        "broker started"
    );
    let server = LineServer::bind(&config, broker).await?;
    server.run_until(shutdown).await;
    Ok(())
}
