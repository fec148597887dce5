//! Signed notes (c2sp.org/signed-note).
//!
//! A signed note is UTF-8 text ending in a newline, a blank line, then one or
//! more signature lines of the form `— <name> <base64(keyhash || sig)>`.
//! The signature block starts after the *last* blank line of the message,
//! so the text itself may contain blank lines.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::crypto::{is_valid_key_name, NoteSigner, NoteVerifiers};
use crate::error::NoteError;

/// Prefix of every signature line: an em dash and a space.
pub const SIGNATURE_PREFIX: &str = "\u{2014} ";

/// Notes with more signature lines than this are rejected outright.
pub const MAX_SIGNATURES: usize = 100;

/// One signature line of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSignature {
    pub name: String,
    pub key_hash: u32,
    /// Base64 of `keyhash || signature`, as it appeared on the line.
    pub base64: String,
    /// Whether a known verifier checked this signature.
    pub verified: bool,
}

/// A parsed signed note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedNote {
    text: String,
    signatures: Vec<NoteSignature>,
}

impl SignedNote {
    /// The signed text, including its final newline.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// All signature lines in the order they appeared.
    pub fn signatures(&self) -> &[NoteSignature] {
        &self.signatures
    }

    /// Signatures checked by a known verifier.
    pub fn verified(&self) -> impl Iterator<Item = &NoteSignature> {
        self.signatures.iter().filter(|s| s.verified)
    }

    /// Whether `name`/`key_hash` produced a verified signature on this note.
    pub fn is_signed_by(&self, name: &str, key_hash: u32) -> bool {
        self.verified()
            .any(|s| s.key_hash == key_hash && s.name == name)
    }
}

fn check_characters(msg: &[u8]) -> Result<&str, NoteError> {
    let s = std::str::from_utf8(msg).map_err(|_| NoteError::Malformed("not UTF-8"))?;
    if s.chars().any(|c| c < ' ' && c != '\n') {
        return Err(NoteError::Malformed("control character"));
    }
    Ok(s)
}

fn split_signatures(msg: &str) -> Result<(&str, &str), NoteError> {
    let split = msg
        .rfind("\n\n")
        .ok_or(NoteError::Malformed("missing signature block"))?;
    let (text, sigs) = (&msg[..split + 1], &msg[split + 2..]);
    if sigs.is_empty() || !sigs.ends_with('\n') {
        return Err(NoteError::Malformed("signature block must end with a newline"));
    }
    Ok((text, sigs))
}

/// Open a signed note, verifying signatures by any key in `known`.
///
/// Signatures by unknown keys are kept as unverified. A signature by a known
/// key that fails to verify is an error. If no signature verifies, the note
/// is returned inside [`NoteError::Unverified`].
pub fn open(msg: &[u8], known: &NoteVerifiers) -> Result<SignedNote, NoteError> {
    let msg = check_characters(msg)?;
    let (text, sigs) = split_signatures(msg)?;

    let mut note = SignedNote {
        text: text.to_string(),
        signatures: Vec::new(),
    };
    let mut count = 0usize;
    for line in sigs.split_terminator('\n') {
        let line = line
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or(NoteError::Malformed("signature line must start with an em dash"))?;
        let (name, b64) = line.split_once(' ').unwrap_or((line, ""));
        let raw = STANDARD
            .decode(b64)
            .map_err(|_| NoteError::Malformed("signature is not base64"))?;
        if !is_valid_key_name(name) || b64.is_empty() || raw.len() < 5 {
            return Err(NoteError::Malformed("invalid signature line"));
        }
        count += 1;
        if count > MAX_SIGNATURES {
            return Err(NoteError::Malformed("too many signatures"));
        }

        let key_hash = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let sig = NoteSignature {
            name: name.to_string(),
            key_hash,
            base64: b64.to_string(),
            verified: false,
        };

        match known.find(name, key_hash) {
            None => {
                if !note.signatures.contains(&sig) {
                    note.signatures.push(sig);
                }
            }
            Some(verifier) => {
                if note.is_signed_by(name, key_hash) {
                    continue;
                }
                if !verifier.verify(text.as_bytes(), &raw[4..]) {
                    return Err(NoteError::InvalidSignature {
                        name: name.to_string(),
                    });
                }
                note.signatures.push(NoteSignature { verified: true, ..sig });
            }
        }
    }

    if note.verified().next().is_none() {
        return Err(NoteError::Unverified(Box::new(note)));
    }
    Ok(note)
}

/// Parse a signed note without checking any signature.
///
/// Structural problems are still errors.
pub fn open_unverified(msg: &[u8]) -> Result<SignedNote, NoteError> {
    match open(msg, &NoteVerifiers::default()) {
        Ok(note) => Ok(note),
        Err(NoteError::Unverified(note)) => Ok(*note),
        Err(e) => Err(e),
    }
}

fn signature_line(signer: &NoteSigner, text: &str) -> String {
    let mut raw = signer.key_hash().to_be_bytes().to_vec();
    raw.extend_from_slice(&signer.sign(text.as_bytes()));
    format!("{}{} {}\n", SIGNATURE_PREFIX, signer.name(), STANDARD.encode(raw))
}

/// Sign `text` with each of `signers`, producing a complete signed note.
pub fn sign(text: &str, signers: &[&NoteSigner]) -> Result<Vec<u8>, NoteError> {
    if text.is_empty() || !text.ends_with('\n') {
        return Err(NoteError::Malformed("text must end with a newline"));
    }
    check_characters(text.as_bytes())?;
    if signers.is_empty() {
        return Err(NoteError::Malformed("no signers"));
    }
    let mut out = String::with_capacity(text.len() + 1 + signers.len() * 128);
    out.push_str(text);
    out.push('\n');
    for signer in signers {
        out.push_str(&signature_line(signer, text));
    }
    Ok(out.into_bytes())
}

/// Append signatures by `signers` to an existing signed note, keeping the
/// original bytes as a verbatim prefix.
pub fn add_signatures(msg: &[u8], signers: &[&NoteSigner]) -> Result<Vec<u8>, NoteError> {
    let note = open_unverified(msg)?;
    let mut out = msg.to_vec();
    for signer in signers {
        out.extend_from_slice(signature_line(signer, note.text()).as_bytes());
    }
    Ok(out)
}
