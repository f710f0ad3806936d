use std::path::PathBuf;

use clap::Parser;

use graceful_txn_server::config::{load_config, validate_config, ConfigError, ServerConfig};
use graceful_txn_server::lifecycle::SignalWatcher;
use graceful_txn_server::observability::init_logging;
use graceful_txn_server::{ServerError, TxnServer};

#[derive(Parser)]
#[command(name = "graceful-txn-server")]
#[command(about = "Line-oriented TCP transaction server with graceful shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override shutdown.grace_period_ms
    #[arg(long)]
    grace_period_ms: Option<u64>,
}

impl Cli {
    fn load_config(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(grace_period_ms) = self.grace_period_ms {
            config.shutdown.grace_period_ms = grace_period_ms;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load_config().map_err(ServerError::from)?;

    init_logging(&config.observability).map_err(ServerError::from)?;

    tracing::info!("graceful-txn-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        grace_period_ms = config.shutdown.grace_period_ms,
        "Configuration loaded"
    );

    let signals = SignalWatcher::install().map_err(ServerError::Signals)?;

    let server = match TxnServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    let report = server.run(signals.wait()).await;

    tracing::info!(
        drained_ms = report.drained_for.as_millis() as u64,
        abandoned_connections = report.abandoned_connections,
        "Shutdown complete"
    );
    Ok(())
}
