//! Error types for Spicy Signature core operations.

use thiserror::Error;

use crate::note::SignedNote;

/// Errors produced while computing a log record from a body and context hint.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("context hint is {len} bytes, exceeds maximum of 65535")]
    HintTooLong { len: usize },

    #[error("bare records cannot carry a context hint")]
    HintUnsupported,

    #[error("failed to read body: {0}")]
    Io(#[from] std::io::Error),
}

/// Structural errors from decoding a Spicy Signature envelope.
///
/// Decoding either fully succeeds or fails with exactly one of these.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("not a spicy signature: preamble does not match")]
    BadPreamble,

    #[error("malformed spicy signature: missing section separator")]
    Truncated,

    #[error("malformed spicy signature: bad index line: {0}")]
    BadIndex(String),

    #[error("malformed spicy signature: proof hash {line} is not base64 of 32 bytes")]
    BadProofHash { line: usize },

    #[error("malformed spicy signature: checkpoint: {0}")]
    BadCheckpoint(#[from] CheckpointError),

    #[error("malformed spicy signature: expected contexthint as last section")]
    BadContextHint,
}

/// Errors from opening a signed note.
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("malformed note: {0}")]
    Malformed(&'static str),

    #[error("invalid signature by {name}")]
    InvalidSignature { name: String },

    /// The note is well formed but carries no signature from a known key.
    ///
    /// Recoverable: the parsed note is still usable for reading its text.
    #[error("note has no verified signatures")]
    Unverified(Box<SignedNote>),
}

/// Errors from parsing a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("signed note: {0}")]
    Note(#[from] NoteError),

    #[error("malformed checkpoint body: {0}")]
    Malformed(&'static str),
}

/// Errors from parsing or constructing note keys.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("malformed key: {0}")]
    Malformed(&'static str),

    #[error("invalid key name: {0:?}")]
    InvalidName(String),

    #[error("key hash mismatch for {name}: declared {declared:08x}, computed {computed:08x}")]
    HashMismatch {
        name: String,
        declared: u32,
        computed: u32,
    },

    #[error("unsupported key algorithm: {0:#04x}")]
    UnsupportedAlgorithm(u8),

    #[error("invalid ed25519 key material")]
    InvalidKey,
}

/// Errors from Merkle tree and tile computations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TlogError {
    #[error("invalid inputs: index {index} not in tree of size {tree_size}")]
    IndexOutOfRange { index: u64, tree_size: u64 },

    #[error("proof does not reproduce the tree root")]
    ProofFailed,

    #[error("expected {expected} hashes, got {got}")]
    HashCount { expected: usize, got: usize },

    #[error("stored hash index {0} not available")]
    MissingHash(u64),

    #[error("invalid tile: {0}")]
    InvalidTile(String),

    #[error("tile data inconsistent with tree root")]
    InconsistentTiles,
}

/// Errors from evaluating or parsing a checkpoint trust policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("policy not satisfied for checkpoint with origin {origin:?}")]
    NotSatisfied { origin: String },

    #[error("policy accepts the canary origin \"check.invalid\"; combine it with an origin predicate")]
    OriginUnconstrained,

    #[error("policy line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("policy key on line {line}: {source}")]
    Key {
        line: usize,
        #[source]
        source: KeyError,
    },
}
