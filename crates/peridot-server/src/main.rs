//! Peridot relay server binary.
//!
//! Configured through `PERIDOT_ADDR` and `PERIDOT_CHANNEL_CAPACITY`; log
//! filtering follows `RUST_LOG`.

use peridot_server::{AppState, ServerConfig};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peridot_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let state = Arc::new(AppState::new(config.channel_capacity));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Peridot relay server listening on {}", config.addr);
    info!("WebSocket endpoint: ws://{}/{{room}}", config.addr);

    peridot_server::serve(listener, state).await
}
