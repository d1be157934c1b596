//! acc-relay command line entry point

use std::net::SocketAddr;
use std::path::PathBuf;

use acc_relay::receiver::Receiver;
use acc_relay::{LineSource, Relay, RelayConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "acc-relay")]
#[command(version)]
#[command(about = "Relay ACC telemetry over WebSocket")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Handoff queue capacity
    #[arg(long, global = true)]
    queue_capacity: Option<usize>,

    /// Dispatcher period in milliseconds
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Broadcast telemetry read from stdin to WebSocket subscribers
    Serve {
        /// Listen address
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Endpoint path
        #[arg(long)]
        path: Option<String>,
        /// Forward physics snapshots only
        #[arg(long)]
        physics_only: bool,
    },
    /// Push telemetry read from stdin to a single remote endpoint
    Bridge {
        /// Remote WebSocket URL
        #[arg(long)]
        url: Option<String>,
        /// Reconnect backoff in milliseconds
        #[arg(long)]
        backoff_ms: Option<u64>,
    },
    /// Accept bridge connections and log what arrives
    Receive {
        /// Listen address
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

impl Cli {
    fn load_config(&self) -> Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => RelayConfig::default(),
        };

        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(interval) = self.interval_ms {
            config.dispatch_interval_ms = interval;
        }

        match &self.command {
            Commands::Serve { bind, path, physics_only } => {
                if let Some(bind) = bind {
                    config.server.bind = *bind;
                }
                if let Some(path) = path {
                    config.server.path = path.clone();
                }
                if *physics_only {
                    config.forward = acc_relay::config::ForwardPolicy::physics_only();
                }
            }
            Commands::Bridge { url, backoff_ms } => {
                if let Some(url) = url {
                    config.bridge.url = url.clone();
                }
                if let Some(backoff) = backoff_ms {
                    config.bridge.backoff_ms = *backoff;
                }
            }
            Commands::Receive { bind } => {
                if let Some(bind) = bind {
                    config.receiver.bind = *bind;
                }
            }
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    match cli.command {
        Commands::Serve { .. } => {
            let mut relay = Relay::serve(&config).await.context("starting server")?;
            relay.attach_source(LineSource::stdin());
            wait_for_interrupt().await?;
            relay.shutdown().await;
        }
        Commands::Bridge { .. } => {
            let mut relay = Relay::bridge(&config).context("starting bridge")?;
            relay.attach_source(LineSource::stdin());
            wait_for_interrupt().await?;
            relay.shutdown().await;
        }
        Commands::Receive { .. } => {
            let receiver = Receiver::bind(config.receiver.bind).await.context("starting receiver")?;
            let cancel = CancellationToken::new();
            let serving = tokio::spawn(receiver.serve(cancel.clone()));
            wait_for_interrupt().await?;
            cancel.cancel();
            serving.await.context("receiver task panicked")??;
        }
    }

    Ok(())
}

async fn wait_for_interrupt() -> Result<()> {
    tokio::signal::ctrl_c().await.context("listening for Ctrl-C")?;
    info!("Interrupt received");
    Ok(())
}
