//! Fragmentation of encoded messages into datagram-sized grams.
//!
//! An encoded message of any length becomes an ordered run of grams; each
//! carries a bounded content window and a flag saying whether more follow.
//! Concatenating the content of one run, in send order, reproduces the
//! encoded message exactly. The protocol has no message ids: reassembly is
//! strictly sequential per correspondent.

use serde::{Deserialize, Serialize};

use crate::constants::{DATAGRAM_CEILING, GRAM_CONTENT_SIZE};
use crate::error::FragmentError;
use crate::wire;

/// A bounded-size wire fragment of one encoded message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gram {
    pub content: Vec<u8>,
    /// True on every gram of a run except the last
    pub more: bool,
}

/// Split an encoded message into encoded grams ready for the wire.
pub fn split(encoded: &[u8]) -> Result<Vec<Vec<u8>>, FragmentError> {
    split_with_window(encoded, GRAM_CONTENT_SIZE)
}

fn split_with_window(encoded: &[u8], window: usize) -> Result<Vec<Vec<u8>>, FragmentError> {
    // An empty input still needs one terminating gram, or the receiver
    // would accumulate forever.
    if encoded.is_empty() {
        return Ok(vec![encode_checked(Gram {
            content: Vec::new(),
            more: false,
        })?]);
    }

    let mut grams = Vec::with_capacity(encoded.len() / window + 1);
    let mut chunks = encoded.chunks(window).peekable();
    while let Some(chunk) = chunks.next() {
        grams.push(encode_checked(Gram {
            content: chunk.to_vec(),
            more: chunks.peek().is_some(),
        })?);
    }
    Ok(grams)
}

fn encode_checked(gram: Gram) -> Result<Vec<u8>, FragmentError> {
    let encoded = wire::encode_gram(&gram)?;
    if encoded.len() > DATAGRAM_CEILING {
        return Err(FragmentError::TooLarge {
            size: encoded.len(),
            limit: DATAGRAM_CEILING,
        });
    }
    Ok(encoded)
}

/// Per-correspondent accumulator for one run of grams.
///
/// Feed it decoded grams in arrival order; it hands back the complete
/// encoded message when the final gram lands and resets for the next run.
/// Never share one instance between correspondents.
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: Vec<u8>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, gram: Gram) -> Option<Vec<u8>> {
        self.buffer.extend_from_slice(&gram.content);
        if gram.more {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}
