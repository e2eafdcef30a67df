use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use relayq::config::DEFAULT_PORT;
use relayq::BrokerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Server,
    Client,
}

#[derive(Parser, Debug)]
#[command(name = "relayq")]
#[command(about = "Single-topic message broker over a line-oriented TCP protocol")]
struct Args {
    /// Run the broker or the interactive client
    #[arg(long, value_enum, default_value_t = Mode::Server)]
    mode: Mode,

    /// Port to listen on (server) or connect to (client); overrides RELAYQ_PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen host in server mode; overrides RELAYQ_HOST
    #[arg(long)]
    host: Option<String>,

    /// Broker address to connect to in client mode
    #[arg(long, default_value = "localhost")]
    address: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match args.mode {
        Mode::Server => {
            let mut config = BrokerConfig::from_env()?;
            if let Some(port) = args.port {
                config.port = port;
            }
            if let Some(host) = args.host {
                config.host = host;
            }
            relayq::serve(config, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .context("run broker")?;
        }
        Mode::Client => {
            let addr = format!("{}:{}", args.address, args.port.unwrap_or(DEFAULT_PORT));
            relayq::client::run(&addr).await?;
        }
    }

    Ok(())
}
