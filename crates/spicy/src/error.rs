//! Error types for signing and verification.

use std::time::Duration;

use spicy_core::{CheckpointError, EnvelopeError, PolicyError, RecordError, TlogError};
use spicy_log::LogError;
use thiserror::Error;

/// Errors that can occur while signing or verifying.
///
/// Every failure carries one specific reason; see [`SpicyError::kind`] for
/// the coarse classification.
#[derive(Debug, Error)]
pub enum SpicyError {
    /// The record could not be built (oversized hint, unreadable body).
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// The envelope is structurally invalid.
    #[error("{0}")]
    Envelope(#[from] EnvelopeError),

    /// The checkpoint returned by the log could not be parsed.
    #[error("checkpoint error: {0}")]
    Checkpoint(CheckpointError),

    /// The caller's expected context hint differs from the embedded one.
    #[error("context hint does not match the signature")]
    HintMismatch,

    /// The inclusion proof does not lead to the checkpoint root.
    #[error("inclusion proof mismatch: {0}")]
    ProofMismatch(TlogError),

    /// The checkpoint does not satisfy the trust policy.
    #[error("checkpoint policy not satisfied: {0}")]
    PolicyNotSatisfied(PolicyError),

    /// A log collaborator failed.
    #[error("log error: {0}")]
    Log(#[from] LogError),

    /// The caller cancelled the operation.
    #[error("cancelled")]
    Cancelled,

    /// No covering checkpoint appeared in time.
    #[error("timed out after {0:?} waiting for a covering checkpoint")]
    TimedOut(Duration),
}

/// Coarse classification of a [`SpicyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input cannot be encoded.
    Input,
    /// Malformed envelope or checkpoint.
    Structural,
    /// Well formed, but not trustworthy.
    Trust,
    /// Collaborator or I/O failure, surfaced unchanged.
    Transport,
    /// Cancelled or timed out.
    Cancelled,
}

impl SpicyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Record(RecordError::Io(_)) => ErrorKind::Transport,
            Self::Record(_) => ErrorKind::Input,
            Self::Envelope(_) | Self::Checkpoint(_) => ErrorKind::Structural,
            Self::HintMismatch | Self::ProofMismatch(_) | Self::PolicyNotSatisfied(_) => {
                ErrorKind::Trust
            }
            Self::Log(_) => ErrorKind::Transport,
            Self::Cancelled | Self::TimedOut(_) => ErrorKind::Cancelled,
        }
    }
}

/// Result type for signing and verification.
pub type Result<T> = std::result::Result<T, SpicyError>;
