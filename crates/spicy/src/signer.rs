//! The Signer: turns a body and context hint into a Spicy Signature.
//!
//! Signing runs through fixed stages:
//!
//! ```text
//! Idle -> RecordComputed -> Appended -> Checked -> ProofBuilt -> Emitted
//! ```
//!
//! A failure at any stage aborts the whole call; no partial envelope is
//! ever returned. The wait for a covering checkpoint is the only long
//! suspension and is bounded by both a cancellation token and a timeout.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use spicy_core::tlog::{check_record, record_hash};
use spicy_core::{encode_record, CheckpointCapsule, SpicySignature};
use spicy_log::{LogAppender, LogError, PublicationAwaiter, TileHashReader, TileReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, SpicyError};

/// Configuration for a [`Signer`].
#[derive(Debug, Clone)]
pub struct SignerConfig {
    /// How long to wait for a checkpoint covering the new record.
    pub checkpoint_timeout: Duration,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            checkpoint_timeout: Duration::from_secs(30),
        }
    }
}

/// Progress of one sign call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignStage {
    Idle,
    RecordComputed,
    Appended,
    Checked,
    ProofBuilt,
    Emitted,
}

/// Signs content into a transparency log.
///
/// Holds no mutable state; concurrent calls are safe as long as the
/// appender assigns distinct indexes.
pub struct Signer<A, P, R>
where
    A: LogAppender,
    P: PublicationAwaiter,
    R: TileReader,
{
    appender: Arc<A>,
    awaiter: Arc<P>,
    tiles: Arc<R>,
    config: SignerConfig,
}

impl<L> Signer<L, L, L>
where
    L: LogAppender + PublicationAwaiter + TileReader,
{
    /// A signer whose three collaborators are the same log.
    pub fn from_log(log: Arc<L>, config: SignerConfig) -> Self {
        Self::new(log.clone(), log.clone(), log, config)
    }
}

impl<A, P, R> Signer<A, P, R>
where
    A: LogAppender,
    P: PublicationAwaiter,
    R: TileReader,
{
    pub fn new(appender: Arc<A>, awaiter: Arc<P>, tiles: Arc<R>, config: SignerConfig) -> Self {
        Self {
            appender,
            awaiter,
            tiles,
            config,
        }
    }

    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// Sign `body` with context hint `hint`.
    ///
    /// `body` is read to the end synchronously, on the calling task, before
    /// anything is appended. Read slow sources (sockets, large files) inside
    /// `tokio::task::spawn_blocking` or into memory first.
    ///
    /// Cancelling `cancel` while waiting for the checkpoint returns
    /// [`SpicyError::Cancelled`]; the record may still have been logged.
    pub async fn sign<B: Read>(
        &self,
        body: B,
        hint: &[u8],
        cancel: &CancellationToken,
    ) -> Result<SpicySignature> {
        let mut stage = SignStage::Idle;
        let result = self.run(body, hint, cancel, &mut stage).await;
        if let Err(e) = &result {
            warn!(stage = ?stage, error = %e, "signing aborted");
        }
        result
    }

    fn advance(stage: &mut SignStage, next: SignStage) {
        debug!(from = ?*stage, to = ?next, "sign stage");
        *stage = next;
    }

    async fn run<B: Read>(
        &self,
        body: B,
        hint: &[u8],
        cancel: &CancellationToken,
        stage: &mut SignStage,
    ) -> Result<SpicySignature> {
        let record = encode_record(body, hint)?;
        let leaf = record_hash(&record);
        Self::advance(stage, SignStage::RecordComputed);

        let pending = self.appender.append(Bytes::from(record));
        Self::advance(stage, SignStage::Appended);

        let timeout = self.config.checkpoint_timeout;
        let (index, checkpoint) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SpicyError::Cancelled),
            res = tokio::time::timeout(timeout, self.awaiter.await_checkpoint(pending)) => {
                res.map_err(|_| SpicyError::TimedOut(timeout))??
            }
        };

        // The checkpoint comes straight from the log we just wrote to, so
        // only its structure is checked here.
        let capsule = CheckpointCapsule::open_unverified(checkpoint).map_err(SpicyError::Checkpoint)?;
        let size = capsule.size();
        if index >= size {
            return Err(LogError::NotCovered { index, size }.into());
        }
        debug!(index, size, origin = capsule.origin(), "covering checkpoint");
        Self::advance(stage, SignStage::Checked);

        let root = *capsule.root();
        let reader = TileHashReader::new(&*self.tiles, size, root);
        let proof = reader.prove_record(index).await?;
        check_record(&proof, size, &root, index, &leaf).map_err(|_| LogError::InconsistentTiles)?;
        Self::advance(stage, SignStage::ProofBuilt);

        let signature = SpicySignature::new(index, proof, capsule, Bytes::copy_from_slice(hint));
        Self::advance(stage, SignStage::Emitted);
        Ok(signature)
    }
}
