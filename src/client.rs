// Interactive client: reads commands from a terminal and prints the broker's
// answer to each.
use std::io;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

pub const PROMPT: &str = "Enter command (PUBLISH <message> or CONSUME): ";
pub const INVALID_COMMAND: &str = "Invalid command. Use PUBLISH <message> or CONSUME.";

/// A single connection to a broker, one request in flight at a time.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer,
        })
    }

    /// Sends one command line and returns the response without its
    /// terminator. Blocks as long as the broker does, so a `CONSUME` on an
    /// empty queue waits here.
    pub async fn send(&mut self, command: &str) -> io::Result<String> {
        self.writer.write_all(command.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            ));
        }
        Ok(line.trim_end().to_string())
    }

    pub async fn publish(&mut self, message: &str) -> io::Result<String> {
        self.send(&format!("PUBLISH {message}")).await
    }

    pub async fn consume(&mut self) -> io::Result<String> {
        self.send("CONSUME").await
    }
}

/// Local pre-check so obviously wrong input never reaches the server.
pub fn is_command(input: &str) -> bool {
    input.starts_with("PUBLISH") || input.starts_with("CONSUME")
}

/// Prompt/send/print loop. Returns when `input` is exhausted.
pub async fn repl<R, W>(client: &mut Client, input: R, mut output: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let command = line.trim();
        if !is_command(command) {
            output
                .write_all(format!("{INVALID_COMMAND}\n").as_bytes())
                .await?;
            continue;
        }

        let response = client.send(command).await?;
        output
            .write_all(format!("Server response: {response}\n").as_bytes())
            .await?;
    }
}

/// Runs the REPL against stdin/stdout.
pub async fn run(addr: &str) -> Result<()> {
    let mut client = Client::connect(addr)
        .await
        .with_context(|| format!("connect to {addr}"))?;
    tracing::info!(%addr, "connected");
    let stdin = BufReader::new(tokio::io::stdin());
    repl(&mut client, stdin, tokio::io::stdout())
        .await
        .context("client session")?;
    Ok(())
}
