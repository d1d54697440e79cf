use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::constants::{AUTH_TOKEN_SIZE, OAEP_LABEL, RSA_KEY_BITS};
use crate::error::{CryptoError, IdentityError};

/// A user's cryptographic identity: one RSA keypair used both to sign
/// outgoing messages and to open keys sealed to us.
#[derive(Clone)]
pub struct Identity {
    key: RsaPrivateKey,
    public_der: Vec<u8>,
}

impl Identity {
    /// Generate a new random identity
    pub fn generate() -> Result<Self, IdentityError> {
        let key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).map_err(IdentityError::Generation)?;
        Self::from_key(key)
    }

    /// Restore an identity from a PKCS#8 PEM private key
    pub fn from_pem(pem: &str) -> Result<Self, IdentityError> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| IdentityError::InvalidKey(e.to_string()))?;
        Self::from_key(key)
    }

    /// Read an identity from a PEM key file on disk
    pub fn load(path: &Path) -> Result<Self, IdentityError> {
        let pem = std::fs::read_to_string(path)?;
        Self::from_pem(&pem)
    }

    fn from_key(key: RsaPrivateKey) -> Result<Self, IdentityError> {
        let public_der = key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| IdentityError::Encode(e.to_string()))?
            .into_vec();
        Ok(Self { key, public_der })
    }

    /// Write the private key (PKCS#8 PEM, mode 0600) to `path` and the
    /// public key (SPKI PEM) alongside it with a `.pub` extension.
    pub fn write_key_files(&self, path: &Path) -> Result<(), IdentityError> {
        let private_pem = self
            .key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| IdentityError::Encode(e.to_string()))?;
        std::fs::write(path, private_pem.as_bytes())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        let public_pem = self
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| IdentityError::Encode(e.to_string()))?;
        std::fs::write(path.with_extension("pub"), public_pem)?;
        Ok(())
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }

    /// DER-encoded SPKI form of the public key, as embedded in messages
    pub fn public_der(&self) -> &[u8] {
        &self.public_der
    }

    /// Canonical single-line text form of the public key, safe for config
    /// files and request headers
    pub fn public_text(&self) -> String {
        BASE64.encode(&self.public_der)
    }

    /// Sign the SHA-256 digest of `data` with PKCS#1 v1.5
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let digest = Sha256::digest(data);
        self.key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(CryptoError::Sign)
    }

    /// Open a symmetric key sealed to this identity
    pub fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.key
            .decrypt(Oaep::new_with_label::<Sha256, _>(OAEP_LABEL), sealed)
            .map_err(|_| CryptoError::Unseal)
    }

    /// A fresh random token plus our signature over it, used to
    /// authenticate relay requests
    pub fn auth_token(&self) -> Result<AuthToken, CryptoError> {
        let mut token = vec![0u8; AUTH_TOKEN_SIZE];
        OsRng.fill_bytes(&mut token);
        let signature = self.sign(&token)?;
        Ok(AuthToken { token, signature })
    }
}

/// A signed random token presented in relay request headers
pub struct AuthToken {
    pub token: Vec<u8>,
    pub signature: Vec<u8>,
}

impl AuthToken {
    pub fn token_hex(&self) -> String {
        hex::encode(&self.token)
    }

    pub fn signature_hex(&self) -> String {
        hex::encode(&self.signature)
    }
}

/// Seal a symmetric key under `recipient` with RSA-OAEP
pub fn seal_key(recipient: &RsaPublicKey, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    recipient
        .encrypt(&mut OsRng, Oaep::new_with_label::<Sha256, _>(OAEP_LABEL), key)
        .map_err(CryptoError::Seal)
}

/// Verify a PKCS#1 v1.5 signature over the SHA-256 digest of `data`.
/// Malformed signatures verify as false; this never errors.
pub fn verify_signature(key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> bool {
    let digest = Sha256::digest(data);
    key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .is_ok()
}

pub fn public_key_to_text(key: &RsaPublicKey) -> Result<String, IdentityError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| IdentityError::Encode(e.to_string()))?;
    Ok(BASE64.encode(der.as_bytes()))
}

pub fn public_key_from_text(text: &str) -> Result<RsaPublicKey, IdentityError> {
    let der = BASE64
        .decode(text.trim())
        .map_err(|e| IdentityError::InvalidKey(e.to_string()))?;
    public_key_from_der(&der)
}

pub fn public_key_from_der(der: &[u8]) -> Result<RsaPublicKey, IdentityError> {
    RsaPublicKey::from_public_key_der(der).map_err(|e| IdentityError::InvalidKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let id = Identity::generate().unwrap();
        let message = b"signed bytes";
        let signature = id.sign(message).unwrap();

        assert!(verify_signature(&id.public_key(), message, &signature));
        assert!(!verify_signature(&id.public_key(), b"other bytes", &signature));
    }

    #[test]
    fn test_garbage_signature_is_false_not_error() {
        let id = Identity::generate().unwrap();
        assert!(!verify_signature(&id.public_key(), b"data", b"not a signature"));
    }

    #[test]
    fn test_public_text_roundtrip() {
        let id = Identity::generate().unwrap();
        let text = id.public_text();
        assert!(!text.contains('\n'));

        let parsed = public_key_from_text(&text).unwrap();
        assert_eq!(parsed, id.public_key());
        assert_eq!(public_key_to_text(&parsed).unwrap(), text);
    }

    #[test]
    fn test_seal_unseal() {
        let id = Identity::generate().unwrap();
        let key = crate::crypto::generate_symmetric_key();

        let sealed = seal_key(&id.public_key(), &key).unwrap();
        assert_ne!(sealed, key.to_vec());
        assert_eq!(id.unseal(&sealed).unwrap(), key.to_vec());
    }

    #[test]
    fn test_unseal_wrong_identity_fails() {
        let alice = Identity::generate().unwrap();
        let bob = Identity::generate().unwrap();
        let key = crate::crypto::generate_symmetric_key();

        let sealed = seal_key(&alice.public_key(), &key).unwrap();
        assert!(bob.unseal(&sealed).is_err());
    }

    #[test]
    fn test_auth_token_verifies() {
        let id = Identity::generate().unwrap();
        let auth = id.auth_token().unwrap();

        assert!(verify_signature(&id.public_key(), &auth.token, &auth.signature));

        let mut tampered = auth.signature.clone();
        tampered[0] ^= 0x01;
        assert!(!verify_signature(&id.public_key(), &auth.token, &tampered));
    }

    #[test]
    fn test_pem_roundtrip() {
        let dir = std::env::temp_dir().join(format!("candygram-key-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("id_rsa.pem");

        let id = Identity::generate().unwrap();
        id.write_key_files(&path).unwrap();

        let restored = Identity::load(&path).unwrap();
        assert_eq!(restored.public_text(), id.public_text());
        assert!(path.with_extension("pub").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
