//! Transparency log checkpoints (c2sp.org/tlog-checkpoint).
//!
//! A checkpoint body is:
//!
//! ```text
//! <origin>\n
//! <tree size, decimal>\n
//! <base64 root hash>\n
//! [<extension line>\n]*
//! ```
//!
//! Checkpoints travel as signed notes. [`CheckpointCapsule`] keeps the signed
//! bytes exactly as received alongside the parsed view, since a signed note
//! cannot be rebuilt byte for byte from its parsed fields.

use bytes::Bytes;

use crate::crypto::{NoteVerifiers, Sha256Hash};
use crate::error::CheckpointError;
use crate::note::{self, SignedNote};

const MAX_CHECKPOINT_LEN: usize = 1_000_000;

/// The parsed body of a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub origin: String,
    pub size: u64,
    pub root: Sha256Hash,
    /// Extension lines, each newline terminated; empty if none.
    pub extension: String,
}

impl Checkpoint {
    /// Parse a checkpoint body (the text of its signed note).
    pub fn parse(text: &str) -> Result<Self, CheckpointError> {
        if text.len() > MAX_CHECKPOINT_LEN || text.matches('\n').count() < 3 {
            return Err(CheckpointError::Malformed("too few lines"));
        }
        let mut lines = text.splitn(4, '\n');
        let (Some(origin), Some(size_line), Some(root_line), Some(rest)) =
            (lines.next(), lines.next(), lines.next(), lines.next())
        else {
            return Err(CheckpointError::Malformed("too few lines"));
        };

        if origin.is_empty() {
            return Err(CheckpointError::Malformed("empty origin"));
        }
        let size: u64 = size_line
            .parse()
            .map_err(|_| CheckpointError::Malformed("tree size is not a decimal integer"))?;
        if size.to_string() != size_line {
            return Err(CheckpointError::Malformed("tree size is not canonical"));
        }
        let root = Sha256Hash::from_base64(root_line)
            .ok_or(CheckpointError::Malformed("root hash is not base64 of 32 bytes"))?;

        let mut remaining = rest;
        while !remaining.is_empty() {
            match remaining.split_once('\n') {
                Some((line, after)) if !line.is_empty() => remaining = after,
                _ => return Err(CheckpointError::Malformed("empty or unterminated extension line")),
            }
        }

        Ok(Self {
            origin: origin.to_string(),
            size,
            root,
            extension: rest.to_string(),
        })
    }

    /// Render the checkpoint body.
    pub fn to_text(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            self.origin,
            self.size,
            self.root.to_base64(),
            self.extension
        )
    }
}

/// A signed checkpoint retained byte for byte as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointCapsule {
    bytes: Bytes,
    note: SignedNote,
    checkpoint: Checkpoint,
}

impl CheckpointCapsule {
    /// Parse signed checkpoint bytes without checking any signature.
    pub fn open_unverified(bytes: impl Into<Bytes>) -> Result<Self, CheckpointError> {
        let bytes = bytes.into();
        let note = note::open_unverified(&bytes)?;
        Self::from_note(bytes, note)
    }

    /// Parse signed checkpoint bytes, requiring at least one signature by a
    /// key in `known`.
    pub fn open(bytes: impl Into<Bytes>, known: &NoteVerifiers) -> Result<Self, CheckpointError> {
        let bytes = bytes.into();
        let note = note::open(&bytes, known)?;
        Self::from_note(bytes, note)
    }

    fn from_note(bytes: Bytes, note: SignedNote) -> Result<Self, CheckpointError> {
        let checkpoint = Checkpoint::parse(note.text())?;
        Ok(Self {
            bytes,
            note,
            checkpoint,
        })
    }

    /// The signed note bytes, verbatim.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn note(&self) -> &SignedNote {
        &self.note
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn origin(&self) -> &str {
        &self.checkpoint.origin
    }

    pub fn size(&self) -> u64 {
        self.checkpoint.size
    }

    pub fn root(&self) -> &Sha256Hash {
        &self.checkpoint.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyAlgorithm, NoteSigner};
    use crate::error::NoteError;

    const ROOT: &str = "GRV1O0dCqmjjPvYi7CtOT79zb/fPwLNsMFWsynwU8Ac=";

    #[test]
    fn test_parse_minimal() {
        let text = format!("example.com/log\n100270\n{ROOT}\n");
        let c = Checkpoint::parse(&text).unwrap();
        assert_eq!(c.origin, "example.com/log");
        assert_eq!(c.size, 100270);
        assert_eq!(c.root.to_base64(), ROOT);
        assert_eq!(c.extension, "");
        assert_eq!(c.to_text(), text);
    }

    #[test]
    fn test_parse_extensions() {
        let text = format!("o\n1\n{ROOT}\nfoo\nbar baz\n");
        let c = Checkpoint::parse(&text).unwrap();
        assert_eq!(c.extension, "foo\nbar baz\n");
        assert_eq!(c.to_text(), text);
    }

    #[test]
    fn test_rejects_blank_extension_line() {
        let text = format!("o\n1\n{ROOT}\nfoo\n\nbar\n");
        assert!(Checkpoint::parse(&text).is_err());
    }

    #[test]
    fn test_rejects_bad_size_and_root() {
        for text in [
            format!("o\n01\n{ROOT}\n"),
            format!("o\n+1\n{ROOT}\n"),
            format!("o\n-1\n{ROOT}\n"),
            "o\n1\nAAAA\n".to_string(),
            format!("o\n1\n{ROOT}"),
            format!("\n1\n{ROOT}\n"),
            format!("o\n1\n{ROOT}\nunterminated"),
        ] {
            assert!(Checkpoint::parse(&text).is_err(), "{text:?}");
        }
    }

    #[test]
    fn test_capsule_keeps_bytes() {
        let signer = NoteSigner::from_seed("o", KeyAlgorithm::Ed25519, [9; 32]).unwrap();
        let signed = note::sign(&format!("o\n5\n{ROOT}\n"), &[&signer]).unwrap();

        let capsule = CheckpointCapsule::open_unverified(signed.clone()).unwrap();
        assert_eq!(capsule.as_bytes(), &signed[..]);
        assert_eq!(capsule.size(), 5);
        assert_eq!(capsule.origin(), "o");

        let verified =
            CheckpointCapsule::open(signed.clone(), &NoteVerifiers::new([signer.verifier()])).unwrap();
        assert_eq!(verified.note().verified().count(), 1);

        assert!(matches!(
            CheckpointCapsule::open(signed, &NoteVerifiers::default()),
            Err(CheckpointError::Note(NoteError::Unverified(_)))
        ));
    }
}
