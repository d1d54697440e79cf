//! Build a messaging session from one group's configuration.

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::watch;

use candygram_net::{
    inbound_channels, DatagramTransport, Friend, Messenger, Printer, RelayTransport, Transport,
};
use candygram_shared::Identity;

use crate::config;

pub struct Session {
    pub messenger: Messenger,
    /// Cancellation signal observed by the relay read loop. The datagram
    /// read loop runs for the process lifetime and ignores it.
    pub shutdown: watch::Sender<bool>,
    pub relay: bool,
}

pub async fn build(group_name: &str) -> anyhow::Result<Session> {
    let config = config::load()?;
    let group = config.group(group_name)?;

    let key_path = config.key_path()?;
    let identity = Arc::new(
        Identity::load(&key_path)
            .with_context(|| format!("could not load identity from {}", key_path.display()))?,
    );

    let mut friends = Vec::with_capacity(group.friends.len());
    for friend in &group.friends {
        friends.push(Arc::new(
            Friend::new(&friend.name, &friend.key, friend.address())
                .with_context(|| format!("bad key for friend {:?}", friend.name))?,
        ));
    }
    if friends.is_empty() {
        bail!("group {group_name:?} has no friends configured");
    }

    let printer = Printer::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (transport, inbound): (Arc<dyn Transport>, Vec<_>) = match &group.url {
        Some(url) => (
            Arc::new(RelayTransport::new(
                url,
                identity.clone(),
                &friends,
                printer.clone(),
                shutdown_rx,
            )),
            Vec::new(),
        ),
        None => {
            let port = group
                .listen_port
                .context("datagram groups need listen_port in the config")?;
            let (routes, inbound) = inbound_channels(&friends);
            (Arc::new(DatagramTransport::new(port, routes)), inbound)
        }
    };

    let messenger = Messenger::new(identity, friends, transport, inbound, printer);
    Ok(Session {
        messenger,
        shutdown: shutdown_tx,
        relay: group.url.is_some(),
    })
}
