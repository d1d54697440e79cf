use thiserror::Error;

use candygram_shared::{CodecError, CryptoError, FragmentError};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no datagram address configured for {0}")]
    NoAddress(String),

    #[error("did not get an ack from {name} within {timeout_ms}ms")]
    AckTimeout { name: String, timeout_ms: u64 },

    #[error("fragmentation failed: {0}")]
    Fragment(#[from] FragmentError),

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("publish request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("relay refused publish ({status}): {body}")]
    PublishRejected { status: u16, body: String },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid header value: {0}")]
    BadHeader(String),

    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Error, Debug)]
pub enum MessengerError {
    #[error("could not verify that a message came from {name}")]
    SignatureMismatch { name: String },

    #[error("outbound worker for {0} is gone")]
    WorkerGone(String),

    #[error("worker failed: {0}")]
    WorkerPanic(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    #[error("codec failure: {0}")]
    Codec(#[from] CodecError),
}
