// crates/trustgate-daemon/src/main.rs
//
// Binary entrypoint for the Trustgate daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing, opens
// storage, wires the registry, bridge, and orchestrator, and serves the
// HTTP API until Ctrl-C.

mod config;
mod events;
mod shared;
mod state;

use clap::Parser;
use config::{DaemonConfig, StorageBackend};
use shared::{DaemonServices, Storage};
use state::{DaemonState, DaemonStateMachine};

use trustgate_rpc::{ApiServer, Authenticator};

/// Trustgate daemon: attestation registry authority and lending API.
#[derive(Parser, Debug)]
#[command(name = "trustgate-daemon", version = "0.1.0", about = "Trustgate API daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.trustgate/config.toml")]
    config: String,

    /// Override the configured API port.
    #[arg(long)]
    rpc_port: Option<u16>,

    /// Override the configured storage backend.
    #[arg(long, value_enum)]
    storage: Option<StorageBackend>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load before installing the subscriber so `log_level` can apply.
    let loaded = DaemonConfig::load(&args.config);
    let mut daemon_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => DaemonConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&daemon_config.log_level)),
        )
        .init();

    match loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", args.config),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            args.config,
            e
        ),
    }

    if let Some(port) = args.rpc_port {
        daemon_config.rpc_port = port;
    }
    if let Some(storage) = args.storage {
        daemon_config.storage = storage;
    }

    tracing::info!("Trustgate Daemon v0.1.0");
    tracing::info!("Storage: {:?}", daemon_config.storage);
    tracing::info!(
        "API endpoint: {}:{}",
        daemon_config.rpc_host,
        daemon_config.rpc_port
    );
    tracing::info!(
        "Registry domain: chain {} at {}",
        daemon_config.chain_id,
        daemon_config.registry_address
    );

    let mut state_machine = DaemonStateMachine::new();

    let storage = Storage::open(&daemon_config)?;
    let services = DaemonServices::new(&daemon_config, storage)?;
    tracing::info!("Authority address: {}", services.registry.authority());

    let authenticator = Authenticator::from_principals(&daemon_config.principals)?;
    if authenticator.is_empty() {
        tracing::warn!("No principals configured; every API request will be rejected with 401");
    } else {
        tracing::info!("{} API principals configured", authenticator.len());
    }

    let event_logger = events::spawn_event_logger(services.registry.clone());

    let server = ApiServer::new(
        daemon_config.rpc_config(),
        services.api_context(),
        authenticator,
    );

    state_machine.transition(DaemonState::Serving)?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };
    let result = server.serve_with_shutdown(shutdown).await;

    state_machine.transition(DaemonState::ShuttingDown)?;
    event_logger.abort();

    if let Err(e) = result {
        tracing::error!("API server error: {}", e);
        return Err(e);
    }
    tracing::info!("Trustgate daemon shut down gracefully");
    Ok(())
}
