//! Stable binary encoding for the two record types that cross the wire.
//!
//! Both records encode with bincode over a fixed field order; that order is
//! the compatibility contract between sender and receiver builds. Field
//! contents are opaque here: validation happens in the envelope layer.

use crate::envelope::Message;
use crate::error::CodecError;
use crate::gram::Gram;

pub fn encode_message(message: &Message) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(message).map_err(CodecError::Message)
}

pub fn decode_message(data: &[u8]) -> Result<Message, CodecError> {
    bincode::deserialize(data).map_err(CodecError::Message)
}

pub fn encode_gram(gram: &Gram) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(gram).map_err(CodecError::Gram)
}

pub fn decode_gram(data: &[u8]) -> Result<Gram, CodecError> {
    bincode::deserialize(data).map_err(CodecError::Gram)
}
