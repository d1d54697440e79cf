use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("could not seal symmetric key: {0}")]
    Seal(rsa::Error),

    #[error("could not open sealed key")]
    Unseal,

    #[error("signing failed: {0}")]
    Sign(rsa::Error),
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed message record: {0}")]
    Message(bincode::Error),

    #[error("malformed gram record: {0}")]
    Gram(bincode::Error),
}

#[derive(Error, Debug)]
pub enum FragmentError {
    #[error("encoded gram is {size} bytes, over the {limit}-byte datagram ceiling")]
    TooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("failed to generate keypair: {0}")]
    Generation(rsa::Error),

    #[error("could not encode key: {0}")]
    Encode(String),

    #[error("key file error: {0}")]
    KeyFile(#[from] std::io::Error),
}
