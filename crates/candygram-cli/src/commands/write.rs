//! Send messages to a group: start the per-friend send workers and feed
//! them lines from stdin until end-of-input.

use crate::session::{self, Session};
use crate::input;

pub async fn run(group: &str) -> anyhow::Result<()> {
    let Session {
        mut messenger,
        shutdown: _shutdown,
        ..
    } = session::build(group).await?;

    messenger.outbound_connect();
    input::write_loop(&mut messenger).await
}
