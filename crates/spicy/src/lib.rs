//! # Spicy
//!
//! Spicy Signatures: compact, self-contained proofs that a body (plus an
//! optional context hint) was recorded at a known position in a
//! transparency log. Anyone holding the log's public key can verify one
//! offline, without contacting the log again.
//!
//! ## Overview
//!
//! - [`Signer`] appends a record to a log, waits for a covering checkpoint,
//!   and assembles the inclusion proof into a [`SpicySignature`].
//! - [`Verifier`] decodes an envelope, recomputes the record from the body,
//!   checks the proof, and evaluates a checkpoint trust [`Policy`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use spicy::{Signer, SignerConfig, Verifier, VerifierConfig, Policy};
//! use spicy::core::{KeyAlgorithm, NoteSigner};
//! use spicy::log::{MemoryLog, MemoryLogConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() {
//!     let key = NoteSigner::from_seed("log.example", KeyAlgorithm::Ed25519, [7; 32]).unwrap();
//!     let log = Arc::new(MemoryLog::new(key, MemoryLogConfig::default()));
//!     let signer = Signer::from_log(log.clone(), SignerConfig::default());
//!
//!     let sig = signer
//!         .sign(&b"content"[..], b"label", &CancellationToken::new())
//!         .await
//!         .unwrap();
//!
//!     let policy = Policy::All(vec![
//!         Policy::SignedBy(log.verifier()),
//!         Policy::Origin("log.example".to_string()),
//!     ]);
//!     let verifier = Verifier::new(policy, VerifierConfig::default());
//!     verifier.verify(&sig.encode(), &b"content"[..], Some(b"label")).unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `spicy::core` - Records, envelopes, notes, checkpoints, Merkle math
//! - `spicy::log` - Log collaborator traits and the in-memory log

pub mod error;
pub mod signer;
pub mod verifier;

pub use spicy_core as core;
pub use spicy_log as log;

pub use error::{ErrorKind, Result, SpicyError};
pub use signer::{SignStage, Signer, SignerConfig};
pub use verifier::{Verified, Verifier, VerifierConfig};

pub use spicy_core::{CheckpointCapsule, Policy, RecordFormat, SpicySignature};
