//! # Spicy Core
//!
//! Pure primitives for Spicy Signatures: offline-verifiable proofs that a
//! body (plus an optional context hint) was recorded in a transparency log.
//!
//! This crate performs no network or storage I/O. Bodies are consumed
//! through [`std::io::Read`] so they can be hashed without buffering.
//!
//! ## Key Types
//!
//! - [`SpicySignature`] - The envelope: index, inclusion proof, checkpoint, hint
//! - [`CheckpointCapsule`] - A signed checkpoint kept byte for byte
//! - [`Policy`] - Composable checkpoint trust predicate
//! - [`RecordFormat`] - How (body, hint) becomes the logged record
//!
//! ## Supporting Formats
//!
//! Signed notes live in [`note`], Merkle tree math in [`tlog`], and hash
//! tiles in [`tile`].

pub mod checkpoint;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod note;
pub mod policy;
pub mod record;
pub mod tile;
pub mod tlog;

pub use checkpoint::{Checkpoint, CheckpointCapsule};
pub use crypto::{KeyAlgorithm, NoteSigner, NoteVerifier, NoteVerifiers, Sha256Hash};
pub use envelope::SpicySignature;
pub use error::{
    CheckpointError, EnvelopeError, KeyError, NoteError, PolicyError, RecordError, TlogError,
};
pub use note::SignedNote;
pub use policy::Policy;
pub use record::{encode_record, RecordFormat, MAX_CONTEXT_HINT_LEN};
pub use tile::{Tile, TilePlan};
