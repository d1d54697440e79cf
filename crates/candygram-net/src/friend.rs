//! Configured correspondents.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use rsa::RsaPublicKey;

use candygram_shared::identity;
use candygram_shared::IdentityError;

/// A configured correspondent: who they are and, in datagram mode, how to
/// reach them. Built once at startup, lives for the session.
#[derive(Debug, Clone)]
pub struct Friend {
    pub name: String,
    pub public_key: RsaPublicKey,
    /// Canonical single-line text form of `public_key`; used as the map
    /// key everywhere a friend is looked up by key.
    pub key_text: String,
    /// Datagram-mode address. Relay-only friends have none.
    pub address: Option<SocketAddr>,
}

impl Friend {
    pub fn new(
        name: impl Into<String>,
        key_text: &str,
        address: Option<SocketAddr>,
    ) -> Result<Self, IdentityError> {
        let public_key = identity::public_key_from_text(key_text)?;
        // Re-encode so the stored text is canonical no matter how the
        // config spelled it.
        let key_text = identity::public_key_to_text(&public_key)?;
        Ok(Self {
            name: name.into(),
            public_key,
            key_text,
            address,
        })
    }
}

/// Index friends by their canonical key text.
pub fn friend_key_map(friends: &[Arc<Friend>]) -> HashMap<String, Arc<Friend>> {
    friends
        .iter()
        .map(|friend| (friend.key_text.clone(), friend.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candygram_shared::Identity;

    #[test]
    fn test_friend_key_is_canonical() {
        let id = Identity::generate().unwrap();
        let padded = format!("  {}\n", id.public_text());

        let friend = Friend::new("bill", &padded, None).unwrap();
        assert_eq!(friend.key_text, id.public_text());
    }

    #[test]
    fn test_bad_key_text_rejected() {
        assert!(Friend::new("bill", "not a key", None).is_err());
    }

    #[test]
    fn test_key_map_lookup() {
        let id = Identity::generate().unwrap();
        let friend = Arc::new(Friend::new("bill", &id.public_text(), None).unwrap());
        let map = friend_key_map(&[friend.clone()]);

        assert_eq!(map.get(&id.public_text()).unwrap().name, "bill");
    }
}
