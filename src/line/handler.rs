use std::io;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::codec::{Command, Frame, LineFramer, Response};
use crate::error::Result;
use crate::queue::{Broker, Message};

/// Serves commands from one connection until the peer disconnects.
///
/// Commands are answered in the order they arrive, one response line each.
/// A `CONSUME` holds the connection until a message is delivered; the socket
/// keeps being read meanwhile so a disconnect cancels the wait.
pub async fn handle_connection(mut socket: TcpStream, broker: Arc<Broker>) -> Result<()> {
    let mut buffer = BytesMut::with_capacity(4096);
    let mut framer = LineFramer::for_message_limit(broker.max_message_bytes());
    let pending_limit = framer.max_line_bytes() * 4;
    let mut out = BytesMut::with_capacity(256);

    loop {
        while let Some(frame) = framer.decode(&mut buffer) {
            let response = match frame {
                Frame::Oversized { len, head } => {
                    tracing::debug!(len, "discarded oversized line");
                    Response::Error(Command::reject_oversized(
                        &head,
                        len,
                        broker.max_message_bytes(),
                    ))
                }
                Frame::Line(line) => match Command::parse(&line) {
                    Ok(Command::Publish(payload)) => {
                        tracing::debug!(bytes = payload.len(), "PUBLISH");
                        match broker.publish(payload) {
                            Ok(delivery) => {
                                tracing::debug!(?delivery, "published");
                                Response::Published
                            }
                            Err(err) if err.is_per_command() => Response::Error(err),
                            Err(err) => return Err(err),
                        }
                    }
                    Ok(Command::Consume) => {
                        tracing::debug!("CONSUME");
                        match wait_for_message(&mut socket, &mut buffer, &broker, pending_limit)
                            .await?
                        {
                            Some(message) => {
                                tracing::debug!(
                                    waited_us = message.age_micros(),
                                    "delivering message"
                                );
                                Response::Message(message.payload)
                            }
                            None => {
                                tracing::debug!("connection closed while waiting for a message");
                                return Ok(());
                            }
                        }
                    }
                    Err(err) => {
                        tracing::debug!(line = %String::from_utf8_lossy(&line), "rejected command");
                        Response::Error(err)
                    }
                },
            };

            out.clear();
            response.encode(&mut out);
            socket.write_all(&out).await?;
        }

        let n = socket.read_buf(&mut buffer).await?;
        if n == 0 {
            tracing::debug!("connection closed by client");
            return Ok(());
        }
    }
}

// Waits for a consume to resolve while watching the socket for EOF. Input that
// arrives in the meantime stays in `buffer` for the caller. Past `limit` bytes
// the connection is given up, which also cancels the consume.
async fn wait_for_message(
    socket: &mut TcpStream,
    buffer: &mut BytesMut,
    broker: &Broker,
    limit: usize,
) -> io::Result<Option<Message>> {
    let consume = broker.consume();
    tokio::pin!(consume);

    loop {
        tokio::select! {
            biased;
            message = &mut consume => return Ok(Some(message)),
            read = socket.read_buf(buffer) => {
                if read? == 0 {
                    return Ok(None);
                }
                if buffer.len() >= limit {
                    let pending = buffer.len();
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("{pending} bytes of input pending while waiting for a message"),
                    ));
                }
            }
        }
    }
}
