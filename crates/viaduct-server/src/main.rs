mod config;
mod session;

use config::ProxyConfig;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use viaduct_protocol_core::ProtocolRegistry;

const CONFIG_PATH: &str = "config/viaduct.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = Path::new(CONFIG_PATH);
    let config = Arc::new(ProxyConfig::load(config_path)?);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    info!("Starting viaduct proxy...");
    if !config_path.exists() {
        info!("No config file found at {}, using defaults", config_path.display());
    }
    info!(
        "Config loaded: bind={}:{}, backend={} ({})",
        config.bind, config.port, config.backend, config.server_version
    );

    // Registration mistakes are programming errors; refuse to start.
    let registry = Arc::new(viaduct_protocols::build_registry(config.max_injection_depth)?);
    let supported: Vec<String> = registry
        .versions()
        .into_iter()
        .filter(|v| *v != config.server_version && registry.supports(config.server_version, *v))
        .map(|v| v.to_string())
        .collect();
    if supported.is_empty() {
        error!("No client version can reach {}", config.server_version);
    } else {
        info!("Accepting clients on: {}", supported.join(", "));
    }

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    tokio::select! {
        _ = accept_loop(listener, registry, config) => {
            error!("Accept loop exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}

async fn accept_loop(listener: TcpListener, registry: Arc<ProtocolRegistry>, config: Arc<ProxyConfig>) {
    let mut next_id: u64 = 1;
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                info!("New connection {} from {}", next_id, peer);
                let registry = registry.clone();
                let config = config.clone();
                let id = next_id;
                next_id += 1;
                tokio::spawn(async move {
                    session::handle_connection(socket, id, registry, config).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
