//! candygram: peer-to-peer encrypted messaging in a terminal.
//!
//! Subscribe and publish to a group over a datagram or relay transport,
//! or host the relay yourself.

mod commands;
mod config;
mod input;
mod session;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "candygram")]
#[command(about = "Peer to peer encrypted messaging in a terminal 🍬")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config directory and a fresh identity
    Init,
    /// Send messages to a group
    Write {
        /// Group name to write to
        #[arg(short, long)]
        group: String,
    },
    /// Listen for messages the group sends
    Read {
        /// Group name to listen to
        #[arg(short, long)]
        group: String,
    },
    /// Host a relay server that forwards messages between group members
    Host {
        /// Listen port (default 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print this identity's public key in shareable form
    ShowKey,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Write { group } => commands::write::run(&group).await,
        Commands::Read { group } => commands::read::run(&group).await,
        Commands::Host { port } => commands::host::run(port).await,
        Commands::ShowKey => commands::show_key::run(),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}
