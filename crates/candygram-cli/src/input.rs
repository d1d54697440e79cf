//! Line input from stdin feeding `Messenger::publish`.

use tokio::io::{stdin, AsyncBufReadExt, BufReader};

use candygram_net::Messenger;

/// Read lines until end-of-input. Every non-empty line is published and
/// the call returns once all delivery attempts for it are done.
pub async fn write_loop(messenger: &mut Messenger) -> anyhow::Result<()> {
    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        messenger.publish(&line).await?;
    }
    Ok(())
}
