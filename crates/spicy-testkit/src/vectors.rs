//! Golden test vectors for record encoding.
//!
//! Every implementation must turn the same body and context hint into the
//! same record bytes, or signatures stop verifying across implementations.

use serde::{Deserialize, Serialize};

use spicy_core::encode_record;
use spicy_core::tlog::record_hash;

/// A golden record vector. Byte fields are hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenVector {
    pub name: String,
    pub description: String,
    pub body: String,
    pub context_hint: String,
    /// Expected record bytes.
    pub record: String,
    /// Expected Merkle leaf hash of the record.
    pub leaf_hash: String,
}

/// A vector file as exported for other implementations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorFile {
    pub version: String,
    pub description: String,
    pub vectors: Vec<GoldenVector>,
}

fn generate_vector(name: &str, description: &str, body: &[u8], hint: &[u8]) -> GoldenVector {
    let record = encode_record(body, hint).expect("vector hint should fit in a record");
    GoldenVector {
        name: name.to_string(),
        description: description.to_string(),
        body: hex::encode(body),
        context_hint: hex::encode(hint),
        leaf_hash: record_hash(&record).to_hex(),
        record: hex::encode(record),
    }
}

/// Get all golden vectors, computed with this implementation.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        generate_vector("empty", "Empty body, empty hint", b"", b""),
        generate_vector("abc_no_hint", "Body \"abc\", empty hint", b"abc", b""),
        generate_vector("abc_hint_hi", "Body \"abc\", hint \"hi\"", b"abc", b"hi"),
        generate_vector(
            "binary_body",
            "Body containing all 256 byte values",
            &(0u8..=255).collect::<Vec<u8>>(),
            b"binary",
        ),
        generate_vector(
            "hint_with_newline",
            "Hint ending in a newline is kept verbatim",
            b"document",
            b"hello there\n",
        ),
        generate_vector(
            "long_hint",
            "Hint longer than 255 bytes exercises both length bytes",
            b"x",
            &[0x61; 300],
        ),
    ]
}

/// Record bytes pinned independently of this implementation.
pub const PINNED_RECORDS: &[(&str, &str)] = &[
    (
        "empty",
        "62e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855630000",
    ),
    (
        "abc_no_hint",
        "62ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad630000",
    ),
    (
        "abc_hint_hi",
        "62ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad6300026869",
    ),
];

/// Check computed vectors against the pinned records.
///
/// Returns `(name, matches, computed record hex)` for each pinned vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let computed = all_vectors();
    PINNED_RECORDS
        .iter()
        .map(|(name, expected)| {
            let got = computed
                .iter()
                .find(|v| v.name == *name)
                .map(|v| v.record.clone())
                .unwrap_or_default();
            (name.to_string(), got == *expected, got)
        })
        .collect()
}

/// The vectors as pretty-printed JSON.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&VectorFile {
        version: "1".to_string(),
        description: "Spicy Signature record vectors: 'b' || SHA-256(body) || 'c' || u16be(len) || hint"
            .to_string(),
        vectors: all_vectors(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinned_vectors_match() {
        for (name, matches, got) in verify_all_vectors() {
            assert!(matches, "vector '{name}' produced {got}");
        }
    }

    #[test]
    fn test_vectors_are_deterministic() {
        assert_eq!(all_vectors(), all_vectors());
    }

    #[test]
    fn test_record_layout() {
        for v in all_vectors() {
            let record = hex::decode(&v.record).unwrap();
            let hint = hex::decode(&v.context_hint).unwrap();
            assert_eq!(record[0], b'b', "{}", v.name);
            assert_eq!(record[33], b'c', "{}", v.name);
            let len = u16::from_be_bytes([record[34], record[35]]) as usize;
            assert_eq!(len, hint.len(), "{}", v.name);
            assert_eq!(&record[36..], &hint[..], "{}", v.name);
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let json = vectors_json().unwrap();
        let file: VectorFile = serde_json::from_str(&json).unwrap();
        assert_eq!(file.vectors, all_vectors());
    }
}
