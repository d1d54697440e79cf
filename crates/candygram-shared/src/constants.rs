/// Hard ceiling for one encoded gram: it must fit a single datagram.
pub const DATAGRAM_CEILING: usize = 1024;

/// Content window per gram. The gram record framing adds a length prefix
/// and the more-flag on top of the content, so leave some leeway under
/// the datagram ceiling.
pub const GRAM_CONTENT_SIZE: usize = 1000;

/// AES-256-GCM nonce size in bytes
pub const NONCE_SIZE: usize = 12;

/// Symmetric key size in bytes (AES-256-GCM)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Modulus size in bits for generated RSA identities
pub const RSA_KEY_BITS: usize = 2048;

/// OAEP label binding sealed keys to this application
pub const OAEP_LABEL: &str = "candygram-sealed-key";

/// Random token size for signed request authentication
pub const AUTH_TOKEN_SIZE: usize = 32;

/// Single acknowledgement byte of the datagram protocol
pub const ACK_BYTE: u8 = 0x06;

/// Relay request headers. The key headers carry the canonical single-line
/// text form of a public key; token and signature are hex.
pub const HEADER_PUBLIC_KEY: &str = "x-candygram-key";
pub const HEADER_TARGET_KEY: &str = "x-candygram-target";
pub const HEADER_TOKEN: &str = "x-candygram-token";
pub const HEADER_SIGNATURE: &str = "x-candygram-signature";
