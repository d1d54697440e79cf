//! Connectionless datagram transport with per-fragment acknowledgement.
//!
//! Encrypted envelopes routinely exceed one datagram, so `write` splits
//! the payload into grams and sends them lock-step: each fragment waits
//! for a single ack byte before the next goes out, which is also what
//! guarantees fragment ordering on the far side. A missing ack fails the
//! whole message; the caller retries the message, never a fragment.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

use candygram_shared::constants::{ACK_BYTE, DATAGRAM_CEILING};
use candygram_shared::gram;

use crate::error::TransportError;
use crate::friend::Friend;
use crate::transport::Transport;

/// Per-fragment ack deadline
pub const ACK_TIMEOUT: Duration = Duration::from_secs(2);

pub struct DatagramTransport {
    listen_port: u16,
    /// Inbound dispatch keyed by source IP alone. Known limitation: two
    /// correspondents behind the same address are indistinguishable here,
    /// and the second one configured wins the route.
    routes: HashMap<IpAddr, mpsc::Sender<Vec<u8>>>,
    ack_timeout: Duration,
}

impl DatagramTransport {
    pub fn new(listen_port: u16, routes: HashMap<IpAddr, mpsc::Sender<Vec<u8>>>) -> Self {
        Self {
            listen_port,
            routes,
            ack_timeout: ACK_TIMEOUT,
        }
    }

    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    async fn run(&self, socket: UdpSocket) -> Result<(), TransportError> {
        let mut buffer = [0u8; DATAGRAM_CEILING];
        loop {
            let (len, source) = socket.recv_from(&mut buffer).await?;
            let Some(inbound) = self.routes.get(&source.ip()) else {
                warn!(%source, "dropping datagram from unknown sender");
                continue;
            };
            if inbound.send(buffer[..len].to_vec()).await.is_err() {
                warn!(%source, "inbound channel closed, dropping datagram");
                continue;
            }
            socket.send_to(&[ACK_BYTE], source).await?;
        }
    }
}

#[async_trait]
impl Transport for DatagramTransport {
    async fn write(&self, friend: &Friend, payload: &[u8]) -> Result<(), TransportError> {
        let address = friend
            .address
            .ok_or_else(|| TransportError::NoAddress(friend.name.clone()))?;

        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        socket.connect(address).await?;

        let mut ack = [0u8; 1];
        for fragment in gram::split(payload)? {
            socket.send(&fragment).await?;
            // a failed ack read counts the same as a missed deadline:
            // abort the remaining fragments, the caller retries the
            // whole message
            match timeout(self.ack_timeout, socket.recv(&mut ack)).await {
                Ok(Ok(_)) => {}
                Ok(Err(_)) | Err(_) => {
                    return Err(TransportError::AckTimeout {
                        name: friend.name.clone(),
                        timeout_ms: self.ack_timeout.as_millis() as u64,
                    })
                }
            }
        }
        Ok(())
    }

    async fn read(&self) -> Result<(), TransportError> {
        let socket = UdpSocket::bind(("0.0.0.0", self.listen_port)).await?;
        debug!(port = self.listen_port, "datagram receive loop bound");
        self.run(socket).await
    }
}

/// Best-effort local IP discovery: the address a socket connected to a
/// public resolver would source from. Only meaningful on the local
/// network; shown to the operator so friends know where to aim.
pub async fn local_ip() -> Result<IpAddr, TransportError> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
    socket.connect(("8.8.8.8", 80)).await?;
    Ok(socket.local_addr()?.ip())
}
