//! Log record encoding.
//!
//! A record binds the SHA-256 of a body to an optional context hint:
//!
//! ```text
//! 'b' || SHA-256(body) || 'c' || u16be(len(hint)) || hint
//! ```
//!
//! Both segments are always present, so an empty hint still yields a
//! 36-byte record. Only the body hash enters the record; the body itself is
//! streamed through the hasher and never buffered.

use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

use crate::error::RecordError;

/// Largest context hint a record can carry.
pub const MAX_CONTEXT_HINT_LEN: usize = u16::MAX as usize;

const BODY_TAG: u8 = b'b';
const CONTEXT_TAG: u8 = b'c';

/// How a (body, hint) pair is turned into the bytes committed to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    /// Segmented `b`/`c` record. The only format signers produce.
    #[default]
    Spicy,
    /// The raw body bytes, for logs that predate context hints.
    ///
    /// Verification-only; a non-empty hint cannot be represented.
    Bare,
}

impl RecordFormat {
    /// Encode a record in this format, reading the body to completion.
    pub fn encode<R: Read>(self, body: R, hint: &[u8]) -> Result<Vec<u8>, RecordError> {
        match self {
            Self::Spicy => encode_record(body, hint),
            Self::Bare => {
                if !hint.is_empty() {
                    return Err(RecordError::HintUnsupported);
                }
                let mut out = Vec::new();
                let mut body = body;
                body.read_to_end(&mut out)?;
                Ok(out)
            }
        }
    }
}

/// A `Write` sink that only feeds a SHA-256 state.
struct HashWriter(Sha256);

impl Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Encode the segmented record for `body` and `hint`.
///
/// Fails with [`RecordError::HintTooLong`] before touching the body if the
/// hint cannot be length-prefixed in 16 bits.
pub fn encode_record<R: Read>(mut body: R, hint: &[u8]) -> Result<Vec<u8>, RecordError> {
    if hint.len() > MAX_CONTEXT_HINT_LEN {
        return Err(RecordError::HintTooLong { len: hint.len() });
    }

    let mut hasher = HashWriter(Sha256::new());
    io::copy(&mut body, &mut hasher)?;
    let body_hash = hasher.0.finalize();

    let mut record = Vec::with_capacity(1 + 32 + 1 + 2 + hint.len());
    record.push(BODY_TAG);
    record.extend_from_slice(&body_hash);
    record.push(CONTEXT_TAG);
    record.extend_from_slice(&(hint.len() as u16).to_be_bytes());
    record.extend_from_slice(hint);
    Ok(record)
}
