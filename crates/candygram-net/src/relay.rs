//! Relay transport: publish over HTTP, subscribe over a persistent
//! WebSocket.
//!
//! The relay never sees plaintext. Outbound, the encoded envelope is the
//! request body and the recipient's key rides in a header; inbound, each
//! binary frame is a complete encoded envelope, so there is no gram
//! reassembly on this path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use candygram_shared::constants::{
    HEADER_PUBLIC_KEY, HEADER_SIGNATURE, HEADER_TARGET_KEY, HEADER_TOKEN,
};
use candygram_shared::{wire, Identity};

use crate::error::TransportError;
use crate::friend::{friend_key_map, Friend};
use crate::print::Printer;
use crate::transport::Transport;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RelayTransport {
    url: String,
    identity: Arc<Identity>,
    friends: HashMap<String, Arc<Friend>>,
    client: reqwest::Client,
    printer: Printer,
    shutdown: watch::Receiver<bool>,
}

impl RelayTransport {
    pub fn new(
        url: impl Into<String>,
        identity: Arc<Identity>,
        friends: &[Arc<Friend>],
        printer: Printer,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PUBLISH_TIMEOUT)
            .build()
            .expect("failed to create HTTP client");
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            identity,
            friends: friend_key_map(friends),
            client,
            printer,
            shutdown,
        }
    }

    fn subscribe_url(&self) -> String {
        let base = if let Some(rest) = self.url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.url.clone()
        };
        format!("{base}/subscribe")
    }

    /// Decode, decrypt, and display one forwarded frame. Anything wrong
    /// with a single frame is logged and dropped; the subscription lives.
    async fn handle_frame(&self, payload: &[u8]) {
        let mut message = match wire::decode_message(payload) {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, "could not decode relay frame");
                return;
            }
        };
        if let Err(error) = message.decrypt(&self.identity) {
            warn!(%error, "could not decrypt relay message");
            return;
        }
        let sender = message.sender_text();
        let Some(friend) = self.friends.get(&sender) else {
            warn!("no friend matches the sender key, dropping message");
            return;
        };
        self.printer.show_message(&friend.name, &message.content).await;
    }
}

#[async_trait]
impl Transport for RelayTransport {
    async fn write(&self, friend: &Friend, payload: &[u8]) -> Result<(), TransportError> {
        let auth = self.identity.auth_token()?;
        let response = self
            .client
            .post(format!("{}/publish", self.url))
            .header(HEADER_TARGET_KEY, &friend.key_text)
            .header(HEADER_PUBLIC_KEY, self.identity.public_text())
            .header(HEADER_TOKEN, auth.token_hex())
            .header(HEADER_SIGNATURE, auth.signature_hex())
            .body(payload.to_vec())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::PublishRejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn read(&self) -> Result<(), TransportError> {
        let auth = self.identity.auth_token()?;
        let mut request = self.subscribe_url().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(HEADER_PUBLIC_KEY, header_value(&self.identity.public_text())?);
        headers.insert(HEADER_TOKEN, header_value(&auth.token_hex())?);
        headers.insert(HEADER_SIGNATURE, header_value(&auth.signature_hex())?);

        let (mut stream, _response) = connect_async(request).await?;
        info!(url = %self.url, "subscribed to relay");

        let mut shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("relay read loop cancelled");
                    return Ok(());
                }
                frame = stream.next() => match frame {
                    None | Some(Ok(WsMessage::Close(_))) => {
                        info!("relay closed the subscription");
                        return Ok(());
                    }
                    Some(Ok(WsMessage::Binary(payload))) => self.handle_frame(&payload).await,
                    Some(Ok(other)) => debug!(kind = %kind_of(&other), "ignoring non-binary frame"),
                    Some(Err(error)) => return Err(error.into()),
                },
            }
        }
    }
}

fn header_value(text: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(text).map_err(|e| TransportError::BadHeader(e.to_string()))
}

fn kind_of(message: &WsMessage) -> &'static str {
    match message {
        WsMessage::Text(_) => "text",
        WsMessage::Ping(_) => "ping",
        WsMessage::Pong(_) => "pong",
        WsMessage::Frame(_) => "frame",
        WsMessage::Binary(_) | WsMessage::Close(_) => "other",
    }
}
