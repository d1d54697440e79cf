//! Host the relay server in-process.

use std::net::SocketAddr;

use tracing::info;

use candygram_server::{serve, AppState, DEFAULT_PORT};

pub async fn run(port: Option<u16>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(DEFAULT_PORT)));

    tokio::select! {
        result = serve(AppState::default(), addr) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl+c, shutting down");
            Ok(())
        }
    }
}
