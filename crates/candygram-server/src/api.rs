use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode},
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use candygram_shared::constants::{HEADER_PUBLIC_KEY, HEADER_TARGET_KEY};

use crate::auth::require_signature;
use crate::error::ServerError;
use crate::registry::Registry;

#[derive(Clone, Default)]
pub struct AppState {
    pub registry: Registry,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/subscribe", get(subscribe))
        .route("/publish", post(publish))
        .layer(middleware::from_fn(require_signature))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Upgrade an authenticated caller to a persistent delivery connection
/// keyed by their public key.
async fn subscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ServerError> {
    let key = header_key(&headers, HEADER_PUBLIC_KEY)?;
    Ok(ws.on_upgrade(move |socket| deliver_loop(state, key, socket)))
}

/// Forward everything queued for `key` until the connection ends, then
/// drop the registration no matter how the loop exited.
async fn deliver_loop(state: AppState, key: String, mut socket: WebSocket) {
    let mut queue = state.registry.subscribe(&key).await;
    info!(key = %short(&key), "subscriber connected");

    loop {
        tokio::select! {
            queued = queue.recv() => match queued {
                Some(payload) => {
                    if let Err(error) = socket.send(WsMessage::Binary(payload)).await {
                        debug!(%error, "subscriber write failed");
                        break;
                    }
                }
                // a newer connection for the same key replaced this one
                None => break,
            },
            inbound = socket.recv() => match inbound {
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {} // subscribers only listen
                Some(Err(error)) => {
                    debug!(%error, "subscriber read failed");
                    break;
                }
            },
        }
    }

    state.registry.unsubscribe(&key).await;
    info!(key = %short(&key), "subscriber disconnected");
}

/// Accept an opaque payload and push it to the target subscriber. The
/// body is never inspected: the recipient rides in a header.
async fn publish(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ServerError> {
    let target = header_key(&headers, HEADER_TARGET_KEY)?;
    state.registry.forward(&target, body.to_vec()).await?;
    Ok(StatusCode::OK)
}

fn header_key(headers: &HeaderMap, name: &str) -> Result<String, ServerError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ServerError::BadRequest(format!("missing or unreadable {name} header")))
}

/// Key texts run long; log a recognizable prefix.
fn short(key: &str) -> &str {
    &key[..key.len().min(16)]
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "starting relay server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
