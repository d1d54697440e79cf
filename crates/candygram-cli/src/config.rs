//! Configuration loading: `~/.candygram/config.toml`.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_DIR: &str = ".candygram";
pub const CONFIG_FILE: &str = "config.toml";
pub const KEY_FILE: &str = "id_rsa.pem";

pub const SAMPLE_CONFIG: &str = r#"# candygram configuration.
# The private key defaults to ~/.candygram/id_rsa.pem; uncomment to override:
# private_key_file = "~/.candygram/id_rsa.pem"

[groups.example]
# A url routes the whole group through a relay server. Leave it out to use
# direct datagrams instead, in which case every friend needs host and port,
# and listen_port is where they reach you.
url = "http://localhost:8080"
# listen_port = 9000

[[groups.example.friends]]
name = "Bill"
key = "<paste Bill's public key text here>"
# host = "192.168.1.7"
# port = 9000
"#;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub private_key_file: Option<PathBuf>,
    #[serde(default)]
    pub groups: HashMap<String, GroupConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GroupConfig {
    /// Relay server base URL; set it to use the relay transport
    pub url: Option<String>,
    /// Local datagram listen port (datagram mode only)
    pub listen_port: Option<u16>,
    #[serde(default)]
    pub friends: Vec<FriendConfig>,
}

#[derive(Debug, Deserialize)]
pub struct FriendConfig {
    pub name: String,
    /// Public key in canonical text form
    pub key: String,
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
}

impl FriendConfig {
    pub fn address(&self) -> Option<SocketAddr> {
        match (self.host, self.port) {
            (Some(host), Some(port)) => Some(SocketAddr::new(host, port)),
            _ => None,
        }
    }
}

impl Config {
    pub fn group(&self, name: &str) -> anyhow::Result<&GroupConfig> {
        self.groups
            .get(name)
            .with_context(|| format!("no group named {name:?} in the config"))
    }

    pub fn key_path(&self) -> anyhow::Result<PathBuf> {
        match &self.private_key_file {
            Some(path) => Ok(expand_home(path)),
            None => Ok(config_dir()?.join(KEY_FILE)),
        }
    }
}

pub fn config_dir() -> anyhow::Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR))
        .context("could not determine the home directory")
}

pub fn load() -> anyhow::Result<Config> {
    let path = config_dir()?.join(CONFIG_FILE);
    let raw = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "could not read config file {}; run `candygram init` first",
            path.display()
        )
    })?;
    parse(&raw).with_context(|| format!("could not parse {}", path.display()))
}

fn parse(raw: &str) -> anyhow::Result<Config> {
    Ok(toml::from_str(raw)?)
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
