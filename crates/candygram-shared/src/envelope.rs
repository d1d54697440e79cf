use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};

use crate::crypto::{self, SymmetricKey};
use crate::error::CryptoError;
use crate::identity::{self, Identity};

/// One logical chat message in its transmissible form.
///
/// The sender signs the plaintext content, then encrypts it once per
/// recipient: a fresh symmetric key encrypts the content, and that key is
/// sealed under the recipient's public key. The embedded sender key lets
/// the receiver identify and verify who wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Plaintext before `encrypt`, nonce-prefixed ciphertext after
    pub content: Vec<u8>,
    /// Signature over the SHA-256 digest of the plaintext content
    pub signature: Vec<u8>,
    /// The per-message symmetric key, sealed under the recipient's key
    pub sealed_key: Vec<u8>,
    /// The sender's public key, DER-encoded SPKI
    pub sender_key: Vec<u8>,
}

impl Message {
    pub fn new(content: impl Into<Vec<u8>>, sender: &Identity) -> Self {
        Self {
            content: content.into(),
            signature: Vec::new(),
            sealed_key: Vec::new(),
            sender_key: sender.public_der().to_vec(),
        }
    }

    /// Sign the content with the sender's private key. Must run before
    /// `encrypt`: the signature covers the plaintext.
    pub fn sign(&mut self, sender: &Identity) -> Result<(), CryptoError> {
        self.signature = sender.sign(&self.content)?;
        Ok(())
    }

    /// Encrypt the content in place for one recipient. Every call
    /// generates an independent symmetric key, so a message encrypted for
    /// several recipients never shares key material between them.
    pub fn encrypt(&mut self, recipient: &RsaPublicKey) -> Result<(), CryptoError> {
        let key = crypto::generate_symmetric_key();
        let ciphertext = crypto::encrypt(&key, &self.content)?;
        self.sealed_key = identity::seal_key(recipient, &key)?;
        self.content = ciphertext;
        Ok(())
    }

    /// Open the sealed key and decrypt the content in place.
    pub fn decrypt(&mut self, recipient: &Identity) -> Result<(), CryptoError> {
        let key_bytes = recipient.unseal(&self.sealed_key)?;
        let key: SymmetricKey = key_bytes
            .try_into()
            .map_err(|_| CryptoError::DecryptionFailed)?;
        self.content = crypto::decrypt(&key, &self.content)?;
        Ok(())
    }

    /// Check the signature against the embedded sender key. Only
    /// meaningful once the content is decrypted. A malformed sender key
    /// verifies as false.
    pub fn verify_signature(&self) -> bool {
        match identity::public_key_from_der(&self.sender_key) {
            Ok(key) => identity::verify_signature(&key, &self.content, &self.signature),
            Err(_) => false,
        }
    }

    /// The embedded sender key in its canonical text form, for matching
    /// against a friend map.
    pub fn sender_text(&self) -> String {
        BASE64.encode(&self.sender_key)
    }
}
