//! The Verifier: checks a Spicy Signature against a body, offline.
//!
//! Verification decodes the envelope, rebuilds the record from the body and
//! the hint *embedded in the envelope*, checks the inclusion proof against
//! the checkpoint root, and finally evaluates the trust policy on the
//! checkpoint. Each step fails closed with its own error.

use std::io::Read;

use bytes::Bytes;
use spicy_core::tlog::{check_record, record_hash};
use spicy_core::{CheckpointCapsule, Policy, RecordFormat, SpicySignature};
use tracing::debug;

use crate::error::{Result, SpicyError};

/// Configuration for a [`Verifier`].
#[derive(Debug, Clone, Default)]
pub struct VerifierConfig {
    /// Record encoding the log used. Only legacy envelopes need
    /// [`RecordFormat::Bare`].
    pub record_format: RecordFormat,
}

/// A successful verification.
#[derive(Debug, Clone)]
pub struct Verified {
    /// Leaf index of the record.
    pub index: u64,
    /// The checkpoint, opened with the policy's keys.
    pub checkpoint: CheckpointCapsule,
    /// The context hint carried by the envelope.
    pub context_hint: Bytes,
}

/// Verifies Spicy Signatures under a fixed trust policy.
#[derive(Debug, Clone)]
pub struct Verifier {
    policy: Policy,
    config: VerifierConfig,
}

impl Verifier {
    pub fn new(policy: Policy, config: VerifierConfig) -> Self {
        Self { policy, config }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Verify `envelope` against `body`.
    ///
    /// If `expected_hint` is given it must equal the embedded hint; that is
    /// checked before the body is read.
    pub fn verify<B: Read>(
        &self,
        envelope: &[u8],
        body: B,
        expected_hint: Option<&[u8]>,
    ) -> Result<Verified> {
        let sig = SpicySignature::decode(envelope)?;

        if let Some(expected) = expected_hint {
            if expected != sig.context_hint() {
                return Err(SpicyError::HintMismatch);
            }
        }

        let record = self.config.record_format.encode(body, sig.context_hint())?;
        let leaf = record_hash(&record);

        let checkpoint = sig.checkpoint();
        check_record(sig.proof(), checkpoint.size(), checkpoint.root(), sig.index(), &leaf)
            .map_err(SpicyError::ProofMismatch)?;

        let checkpoint = self
            .policy
            .evaluate(checkpoint.as_bytes())
            .map_err(SpicyError::PolicyNotSatisfied)?;

        debug!(
            index = sig.index(),
            origin = checkpoint.origin(),
            size = checkpoint.size(),
            "verified spicy signature"
        );
        Ok(Verified {
            index: sig.index(),
            checkpoint,
            context_hint: Bytes::copy_from_slice(sig.context_hint()),
        })
    }
}
