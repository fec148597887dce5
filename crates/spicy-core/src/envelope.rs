//! The Spicy Signature v1 envelope.
//!
//! ```text
//! c2sp.org/spicy-signature@v1\n
//! index <decimal>\n
//! <base64 proof hash>\n        (zero or more)
//! \n
//! <signed checkpoint note, verbatim>
//! [\n
//! contexthint\n
//! <raw hint bytes>]
//! ```
//!
//! None of the nested sections declares its own length, so decoding locates
//! them by scanning for blank lines. The checkpoint note finds its signature
//! block by searching backward for the last blank line of whatever slice it
//! is handed, so the slice must end exactly where the note does.

use bytes::Bytes;

use crate::checkpoint::CheckpointCapsule;
use crate::crypto::Sha256Hash;
use crate::error::EnvelopeError;

/// First line of every v1 envelope, including its newline.
pub const PREAMBLE: &[u8] = b"c2sp.org/spicy-signature@v1\n";

/// Label line opening the optional context hint section.
pub const CONTEXT_HINT_LABEL: &[u8] = b"contexthint\n";

const INDEX_PREFIX: &str = "index ";
const SECTION_SEP: &[u8] = b"\n\n";

/// A decoded or freshly built Spicy Signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpicySignature {
    index: u64,
    proof: Vec<Sha256Hash>,
    checkpoint: CheckpointCapsule,
    context_hint: Bytes,
}

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn parse_index(line: &[u8]) -> Result<u64, EnvelopeError> {
    let line = std::str::from_utf8(line)
        .map_err(|_| EnvelopeError::BadIndex("not UTF-8".to_string()))?;
    let digits = line
        .strip_prefix(INDEX_PREFIX)
        .ok_or_else(|| EnvelopeError::BadIndex(format!("expected \"index <n>\", got {line:?}")))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EnvelopeError::BadIndex(format!("{digits:?} is not a decimal integer")));
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(EnvelopeError::BadIndex(format!("{digits:?} has leading zeros")));
    }
    digits
        .parse()
        .map_err(|_| EnvelopeError::BadIndex(format!("{digits:?} does not fit in 64 bits")))
}

impl SpicySignature {
    /// Assemble an envelope from its parts.
    pub fn new(
        index: u64,
        proof: Vec<Sha256Hash>,
        checkpoint: CheckpointCapsule,
        context_hint: impl Into<Bytes>,
    ) -> Self {
        Self {
            index,
            proof,
            checkpoint,
            context_hint: context_hint.into(),
        }
    }

    /// Leaf index of the signed record.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Inclusion proof, leaf to root.
    pub fn proof(&self) -> &[Sha256Hash] {
        &self.proof
    }

    pub fn checkpoint(&self) -> &CheckpointCapsule {
        &self.checkpoint
    }

    /// The context hint bytes; empty if the envelope carries none.
    pub fn context_hint(&self) -> &[u8] {
        &self.context_hint
    }

    /// Serialize the envelope.
    ///
    /// The context hint section is written only when the hint is non-empty.
    pub fn encode(&self) -> Vec<u8> {
        let checkpoint = self.checkpoint.as_bytes();
        let mut out = Vec::with_capacity(
            PREAMBLE.len() + 32 + self.proof.len() * 45 + checkpoint.len() + self.context_hint.len() + 16,
        );
        out.extend_from_slice(PREAMBLE);
        out.extend_from_slice(format!("{INDEX_PREFIX}{}\n", self.index).as_bytes());
        for h in &self.proof {
            out.extend_from_slice(h.to_base64().as_bytes());
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(checkpoint);
        if !self.context_hint.is_empty() {
            out.push(b'\n');
            out.extend_from_slice(CONTEXT_HINT_LABEL);
            out.extend_from_slice(&self.context_hint);
        }
        out
    }

    /// Parse an envelope. The checkpoint is parsed structurally but its
    /// signatures are not checked here.
    pub fn decode(raw: &[u8]) -> Result<Self, EnvelopeError> {
        if !raw.starts_with(PREAMBLE) {
            return Err(EnvelopeError::BadPreamble);
        }

        // A ends the header, B ends the checkpoint text, C (if any) ends the
        // checkpoint signatures and opens the hint section.
        let a = find(raw, 0, SECTION_SEP).ok_or(EnvelopeError::Truncated)?;
        let b = find(raw, a + 2, SECTION_SEP).ok_or(EnvelopeError::Truncated)?;
        let c = find(raw, b + 2, SECTION_SEP);

        let mut lines = raw[..a].split(|&byte| byte == b'\n').skip(1);
        let index_line = lines
            .next()
            .ok_or_else(|| EnvelopeError::BadIndex("missing index line".to_string()))?;
        let index = parse_index(index_line)?;

        let proof = lines
            .enumerate()
            .map(|(i, line)| {
                std::str::from_utf8(line)
                    .ok()
                    .and_then(Sha256Hash::from_base64)
                    .ok_or(EnvelopeError::BadProofHash { line: i })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // The note parser requires its trailing newline, hence C + 1.
        let checkpoint_end = c.map_or(raw.len(), |c| c + 1);
        let checkpoint =
            CheckpointCapsule::open_unverified(Bytes::copy_from_slice(&raw[a + 2..checkpoint_end]))?;

        let context_hint = match c {
            None => Bytes::new(),
            Some(c) => {
                let hint = raw[c + 2..]
                    .strip_prefix(CONTEXT_HINT_LABEL)
                    .ok_or(EnvelopeError::BadContextHint)?;
                Bytes::copy_from_slice(hint)
            }
        };

        Ok(Self {
            index,
            proof,
            checkpoint,
            context_hint,
        })
    }
}
