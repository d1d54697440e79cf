//! Print this identity's public key in shareable text form.

use candygram_shared::Identity;

use crate::config;

pub fn run() -> anyhow::Result<()> {
    let key_path = match config::load() {
        Ok(config) => config.key_path()?,
        // no config yet; the key may still exist at the default location
        Err(_) => config::config_dir()?.join(config::KEY_FILE),
    };
    let identity = Identity::load(&key_path)?;
    println!("{}", identity.public_text());
    Ok(())
}
