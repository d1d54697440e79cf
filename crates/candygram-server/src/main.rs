//! Standalone relay server binary.
//!
//! Routing state lives entirely in memory: there is nothing to configure
//! beyond the listen address (`CANDYGRAM_ADDR`, default 0.0.0.0:8080).

use std::net::SocketAddr;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use candygram_server::{serve, AppState, DEFAULT_PORT};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,candygram_server=debug")),
        )
        .init();

    let addr = listen_addr();

    tokio::select! {
        result = serve(AppState::default(), addr) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl+c, shutting down");
            Ok(())
        }
    }
}

fn listen_addr() -> SocketAddr {
    let default = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT));
    match std::env::var("CANDYGRAM_ADDR") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(value = %raw, "invalid CANDYGRAM_ADDR, using default");
            default
        }),
        Err(_) => default,
    }
}
