//! Listen for messages the group sends.
//!
//! A relay session watches for ctrl+c and closes the subscription
//! cleanly. A datagram session runs until the process is killed, and a
//! failed signature verification ends it with a nonzero exit.

use candygram_net::udp;

use crate::session::{self, Session};

pub async fn run(group: &str) -> anyhow::Result<()> {
    let Session {
        mut messenger,
        shutdown,
        relay,
    } = session::build(group).await?;

    if relay {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown.send(true);
            }
        });
    } else if let Ok(ip) = udp::local_ip().await {
        println!("Listening on {ip} (local network)");
    }

    messenger.read_loop().await?;
    Ok(())
}
