//! The polymorphic transport seam.
//!
//! One variant rides a connectionless datagram channel with per-fragment
//! acknowledgement; the other rides a persistent relay connection. A
//! session picks exactly one at construction and the rest of the pipeline
//! never branches on which.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::friend::Friend;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one encoded message to a single recipient.
    async fn write(&self, friend: &Friend, payload: &[u8]) -> Result<(), TransportError>;

    /// Run the receive loop. Does not return until the session ends or is
    /// cancelled; the datagram variant dispatches inbound fragments to the
    /// correct correspondent's channel, the relay variant delivers decoded
    /// messages itself.
    async fn read(&self) -> Result<(), TransportError>;
}
