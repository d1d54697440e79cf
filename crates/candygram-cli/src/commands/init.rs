//! Create `~/.candygram/` with a sample config and a fresh identity.

use anyhow::bail;

use candygram_shared::Identity;

use crate::config::{self, CONFIG_FILE, KEY_FILE, SAMPLE_CONFIG};

pub fn run() -> anyhow::Result<()> {
    let dir = config::config_dir()?;
    std::fs::create_dir_all(&dir)?;

    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        std::fs::write(&config_path, SAMPLE_CONFIG)?;
    }

    let key_path = dir.join(KEY_FILE);
    if key_path.exists() {
        bail!(
            "refusing to overwrite the existing key file {}",
            key_path.display()
        );
    }
    let identity = Identity::generate()?;
    identity.write_key_files(&key_path)?;

    println!("Created candygram config and key files in {}", dir.display());
    println!("Share this public key with your friends:\n{}", identity.public_text());
    Ok(())
}
