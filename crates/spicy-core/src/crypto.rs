//! Cryptographic primitives for Spicy Signatures.
//!
//! Wraps SHA-256 hashing and the signed-note key formats (Ed25519 log keys and
//! timestamped witness cosignature keys) with strong types.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::KeyError;

/// A 32-byte SHA-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 hash of the given data.
    pub fn digest(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Standard padded base64, as used in envelopes and checkpoints.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Parse canonical padded base64 of exactly 32 bytes.
    pub fn from_base64(s: &str) -> Option<Self> {
        let bytes = STANDARD.decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl AsRef<[u8]> for Sha256Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Sha256Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Note keys
// ─────────────────────────────────────────────────────────────────────────────

/// Signature algorithm identifier carried in the first byte of an encoded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// Plain Ed25519 over the note text.
    Ed25519,
    /// Ed25519 over a timestamped `cosignature/v1` message.
    Cosignature,
}

impl KeyAlgorithm {
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Ed25519 => 0x01,
            Self::Cosignature => 0x04,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self, KeyError> {
        match b {
            0x01 => Ok(Self::Ed25519),
            0x04 => Ok(Self::Cosignature),
            other => Err(KeyError::UnsupportedAlgorithm(other)),
        }
    }
}

const COSIGNATURE_HEADER: &str = "cosignature/v1\ntime ";

/// A valid key name is non-empty and contains no whitespace and no `+`.
pub fn is_valid_key_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c == '+')
}

/// The 32-bit key hash identifying a key in signature lines.
///
/// First four bytes (big-endian) of `SHA-256(name || "\n" || alg || key)`.
pub fn key_hash(name: &str, alg: KeyAlgorithm, key: &[u8; 32]) -> u32 {
    let mut h = Sha256::new();
    h.update(name.as_bytes());
    h.update(b"\n");
    h.update([alg.as_byte()]);
    h.update(key);
    let digest = h.finalize();
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

fn cosignature_message(timestamp: u64, text: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(COSIGNATURE_HEADER.len() + 21 + text.len());
    msg.extend_from_slice(COSIGNATURE_HEADER.as_bytes());
    msg.extend_from_slice(timestamp.to_string().as_bytes());
    msg.push(b'\n');
    msg.extend_from_slice(text);
    msg
}

fn decode_key_material(name: &str, hash_hex: &str, b64: &str) -> Result<(KeyAlgorithm, [u8; 32], u32), KeyError> {
    if !is_valid_key_name(name) {
        return Err(KeyError::InvalidName(name.to_string()));
    }
    if hash_hex.len() != 8 {
        return Err(KeyError::Malformed("key hash must be 8 hex digits"));
    }
    let declared = u32::from_str_radix(hash_hex, 16)
        .map_err(|_| KeyError::Malformed("key hash must be 8 hex digits"))?;
    let raw = STANDARD
        .decode(b64)
        .map_err(|_| KeyError::Malformed("key material is not base64"))?;
    let (&alg, key) = raw
        .split_first()
        .ok_or(KeyError::Malformed("empty key material"))?;
    let alg = KeyAlgorithm::from_byte(alg)?;
    let key: [u8; 32] = key
        .try_into()
        .map_err(|_| KeyError::Malformed("key must be 32 bytes"))?;
    Ok((alg, key, declared))
}

/// A public key able to verify one named signer's note signatures.
#[derive(Clone, PartialEq, Eq)]
pub struct NoteVerifier {
    name: String,
    key_hash: u32,
    alg: KeyAlgorithm,
    key: VerifyingKey,
}

impl NoteVerifier {
    /// Parse a verifier key of the form `name+hash+base64(alg||key)`.
    pub fn parse(vkey: &str) -> Result<Self, KeyError> {
        // Key names never contain '+', but the base64 key material may.
        let mut parts = vkey.splitn(3, '+');
        let (Some(name), Some(hash_hex), Some(b64)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(KeyError::Malformed("verifier key must have three '+' separated fields"));
        };
        let (alg, key, declared) = decode_key_material(name, hash_hex, b64)?;
        let verifier = Self::new(name, alg, key)?;
        if verifier.key_hash != declared {
            return Err(KeyError::HashMismatch {
                name: name.to_string(),
                declared,
                computed: verifier.key_hash,
            });
        }
        Ok(verifier)
    }

    /// Build a verifier from its parts, computing the key hash.
    pub fn new(name: &str, alg: KeyAlgorithm, key: [u8; 32]) -> Result<Self, KeyError> {
        if !is_valid_key_name(name) {
            return Err(KeyError::InvalidName(name.to_string()));
        }
        let verifying = VerifyingKey::from_bytes(&key).map_err(|_| KeyError::InvalidKey)?;
        Ok(Self {
            name: name.to_string(),
            key_hash: key_hash(name, alg, &key),
            alg,
            key: verifying,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_hash(&self) -> u32 {
        self.key_hash
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.alg
    }

    /// Verify `sig` (the signature bytes after the 4-byte key hash) over `text`.
    pub fn verify(&self, text: &[u8], sig: &[u8]) -> bool {
        match self.alg {
            KeyAlgorithm::Ed25519 => {
                let Ok(sig) = <[u8; 64]>::try_from(sig) else {
                    return false;
                };
                self.key.verify(text, &Signature::from_bytes(&sig)).is_ok()
            }
            KeyAlgorithm::Cosignature => {
                if sig.len() != 8 + 64 {
                    return false;
                }
                let (ts, sig) = sig.split_at(8);
                let mut ts_bytes = [0u8; 8];
                ts_bytes.copy_from_slice(ts);
                let mut sig_bytes = [0u8; 64];
                sig_bytes.copy_from_slice(sig);
                let msg = cosignature_message(u64::from_be_bytes(ts_bytes), text);
                self.key.verify(&msg, &Signature::from_bytes(&sig_bytes)).is_ok()
            }
        }
    }

    /// Encode back to the `name+hash+base64` text form.
    pub fn to_vkey(&self) -> String {
        let mut raw = Vec::with_capacity(33);
        raw.push(self.alg.as_byte());
        raw.extend_from_slice(self.key.as_bytes());
        format!("{}+{:08x}+{}", self.name, self.key_hash, STANDARD.encode(raw))
    }
}

impl fmt::Debug for NoteVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NoteVerifier({}+{:08x})", self.name, self.key_hash)
    }
}

/// A set of verifiers, looked up by name and key hash when opening notes.
#[derive(Debug, Clone, Default)]
pub struct NoteVerifiers {
    verifiers: Vec<NoteVerifier>,
}

impl NoteVerifiers {
    pub fn new(verifiers: impl IntoIterator<Item = NoteVerifier>) -> Self {
        let mut set = Self::default();
        for v in verifiers {
            set.insert(v);
        }
        set
    }

    /// Add a verifier. Duplicate (name, key hash) pairs are ignored.
    pub fn insert(&mut self, verifier: NoteVerifier) {
        if self.find(&verifier.name, verifier.key_hash).is_none() {
            self.verifiers.push(verifier);
        }
    }

    pub fn find(&self, name: &str, key_hash: u32) -> Option<&NoteVerifier> {
        self.verifiers
            .iter()
            .find(|v| v.key_hash == key_hash && v.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.verifiers.len()
    }
}

/// A private key producing note signature lines.
#[derive(Clone)]
pub struct NoteSigner {
    name: String,
    key_hash: u32,
    alg: KeyAlgorithm,
    key: SigningKey,
    timestamp: u64,
}

impl NoteSigner {
    /// Parse a signer key of the form `PRIVATE+KEY+name+hash+base64(alg||seed)`.
    ///
    /// The declared hash is checked against the hash of the derived public key.
    pub fn parse(skey: &str) -> Result<Self, KeyError> {
        let mut parts = skey.splitn(5, '+');
        let (Some("PRIVATE"), Some("KEY"), Some(name), Some(hash_hex), Some(b64)) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(KeyError::Malformed("signer key must be PRIVATE+KEY+name+hash+key"));
        };
        let (alg, seed, declared) = decode_key_material(name, hash_hex, b64)?;
        let signer = Self::from_seed(name, alg, seed)?;
        if signer.key_hash != declared {
            return Err(KeyError::HashMismatch {
                name: name.to_string(),
                declared,
                computed: signer.key_hash,
            });
        }
        Ok(signer)
    }

    /// Create a signer from a 32-byte Ed25519 seed.
    pub fn from_seed(name: &str, alg: KeyAlgorithm, seed: [u8; 32]) -> Result<Self, KeyError> {
        if !is_valid_key_name(name) {
            return Err(KeyError::InvalidName(name.to_string()));
        }
        let key = SigningKey::from_bytes(&seed);
        let public = key.verifying_key().to_bytes();
        Ok(Self {
            name: name.to_string(),
            key_hash: key_hash(name, alg, &public),
            alg,
            key,
            timestamp: 0,
        })
    }

    /// Set the timestamp embedded in cosignatures. Ignored for plain Ed25519.
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_hash(&self) -> u32 {
        self.key_hash
    }

    /// Signature bytes over `text`, without the key hash prefix.
    pub fn sign(&self, text: &[u8]) -> Vec<u8> {
        match self.alg {
            KeyAlgorithm::Ed25519 => self.key.sign(text).to_bytes().to_vec(),
            KeyAlgorithm::Cosignature => {
                let msg = cosignature_message(self.timestamp, text);
                let mut out = Vec::with_capacity(8 + 64);
                out.extend_from_slice(&self.timestamp.to_be_bytes());
                out.extend_from_slice(&self.key.sign(&msg).to_bytes());
                out
            }
        }
    }

    /// The matching public verifier.
    pub fn verifier(&self) -> NoteVerifier {
        NoteVerifier {
            name: self.name.clone(),
            key_hash: self.key_hash,
            alg: self.alg,
            key: self.key.verifying_key(),
        }
    }
}

impl fmt::Debug for NoteSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NoteSigner({}+{:08x})", self.name, self.key_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VKEY: &str = "example.com/log/testdata+33d7b496+AeHTu4Q3hEIMHNqc6fASMsq3rKNx280NI+oO5xCFkkSx";
    const SKEY: &str =
        "PRIVATE+KEY+example.com/log/testdata+33d7b496+AeymY/SZAX0jZcJ8enZ5FY1Dz+wTML2yWSkK+9DSF3eg";

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            Sha256Hash::digest(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_base64_roundtrip_and_length() {
        let h = Sha256Hash::digest(b"abc");
        assert_eq!(Sha256Hash::from_base64(&h.to_base64()), Some(h));
        assert_eq!(Sha256Hash::from_base64("AAAA"), None);
        assert_eq!(Sha256Hash::from_base64("not base64!"), None);
    }

    #[test]
    fn test_parse_verifier_key() {
        let v = NoteVerifier::parse(VKEY).unwrap();
        assert_eq!(v.name(), "example.com/log/testdata");
        assert_eq!(v.key_hash(), 0x33d7b496);
        assert_eq!(v.algorithm(), KeyAlgorithm::Ed25519);
        assert_eq!(v.to_vkey(), VKEY);
    }

    #[test]
    fn test_parse_signer_key_matches_verifier() {
        let s = NoteSigner::parse(SKEY).unwrap();
        let v = NoteVerifier::parse(VKEY).unwrap();
        assert_eq!(s.verifier(), v);

        let sig = s.sign(b"hello\n");
        assert!(v.verify(b"hello\n", &sig));
        assert!(!v.verify(b"hello!\n", &sig));
    }

    #[test]
    fn test_key_hash_mismatch_rejected() {
        let bad = VKEY.replace("33d7b496", "33d7b497");
        assert!(matches!(
            NoteVerifier::parse(&bad),
            Err(KeyError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_keys_with_plus_in_key_material_roundtrip() {
        let mut with_plus = 0;
        for seed in 0u8..64 {
            for alg in [KeyAlgorithm::Ed25519, KeyAlgorithm::Cosignature] {
                let signer = NoteSigner::from_seed("log.example", alg, [seed; 32]).unwrap();
                let vkey = signer.verifier().to_vkey();
                let parsed = NoteVerifier::parse(&vkey).unwrap_or_else(|e| panic!("{vkey}: {e}"));
                assert_eq!(parsed, signer.verifier());

                let mut material = vec![alg.as_byte()];
                material.extend_from_slice(&[seed; 32]);
                let skey = format!(
                    "PRIVATE+KEY+log.example+{:08x}+{}",
                    signer.key_hash(),
                    STANDARD.encode(&material)
                );
                let parsed = NoteSigner::parse(&skey).unwrap_or_else(|e| panic!("{skey}: {e}"));
                assert_eq!(parsed.verifier(), signer.verifier());

                if vkey.matches('+').count() > 2 || skey.matches('+').count() > 4 {
                    with_plus += 1;
                }
            }
        }
        assert!(with_plus > 0);
    }

    #[test]
    fn test_invalid_names_rejected() {
        assert!(!is_valid_key_name(""));
        assert!(!is_valid_key_name("a b"));
        assert!(!is_valid_key_name("a+b"));
        assert!(is_valid_key_name("example.com/log"));
        assert!(NoteSigner::from_seed("bad name", KeyAlgorithm::Ed25519, [1; 32]).is_err());
    }

    #[test]
    fn test_cosignature_roundtrip() {
        let s = NoteSigner::from_seed("witness.example", KeyAlgorithm::Cosignature, [7; 32])
            .unwrap()
            .with_timestamp(1_700_000_000);
        let v = s.verifier();
        let sig = s.sign(b"text\n");
        assert_eq!(sig.len(), 72);
        assert_eq!(&sig[..8], &1_700_000_000u64.to_be_bytes());
        assert!(v.verify(b"text\n", &sig));
        assert!(!v.verify(b"other\n", &sig));

        let reparsed = NoteVerifier::parse(&v.to_vkey()).unwrap();
        assert_eq!(reparsed, v);
    }

    #[test]
    fn test_verifier_set_lookup() {
        let a = NoteSigner::from_seed("a", KeyAlgorithm::Ed25519, [1; 32]).unwrap().verifier();
        let b = NoteSigner::from_seed("b", KeyAlgorithm::Ed25519, [2; 32]).unwrap().verifier();
        let set = NoteVerifiers::new([a.clone(), b.clone(), a.clone()]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.find("a", a.key_hash()), Some(&a));
        assert_eq!(set.find("a", b.key_hash()), None);
    }

    #[test]
    fn test_hash_serde() {
        let h = Sha256Hash::digest(b"abc");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(serde_json::from_str::<Sha256Hash>(&json).unwrap(), h);
    }
}
