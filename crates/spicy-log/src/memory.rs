//! In-memory transparency log.
//!
//! Implements every collaborator trait over a flat stored-hash array. All
//! data is lost when the log is dropped. Thread-safe via RwLock; published
//! checkpoints are broadcast on a watch channel so awaiters wake as soon as
//! a covering checkpoint appears.

use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use spicy_core::tile::{read_tile_data, Tile, DEFAULT_TILE_HEIGHT};
use spicy_core::tlog::{record_hash, stored_hashes_for_record_hash, tree_hash};
use spicy_core::{note, Checkpoint, NoteSigner, NoteVerifier, Sha256Hash, TlogError};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{LogError, Result};
use crate::traits::{IndexFuture, LogAppender, PublicationAwaiter, TileReader};

/// Configuration for a [`MemoryLog`].
#[derive(Debug, Clone)]
pub struct MemoryLogConfig {
    /// Publish a new checkpoint after every append.
    pub publish_on_append: bool,
    /// Extension lines added to every checkpoint body, without newlines.
    pub extension_lines: Vec<String>,
}

impl Default for MemoryLogConfig {
    fn default() -> Self {
        Self {
            publish_on_append: true,
            extension_lines: Vec::new(),
        }
    }
}

/// A published checkpoint: tree size and signed note bytes.
type Published = Option<(u64, Bytes)>;

/// In-memory log implementation.
pub struct MemoryLog {
    signer: NoteSigner,
    cosigners: Vec<NoteSigner>,
    config: MemoryLogConfig,
    inner: RwLock<MemoryLogInner>,
    published: watch::Sender<Published>,
}

struct MemoryLogInner {
    /// Appended records, by index.
    entries: Vec<Bytes>,

    /// Flat stored-hash array.
    stored: Vec<Sha256Hash>,
}

fn poisoned<T>(_: T) -> LogError {
    LogError::Io("memory log lock poisoned".to_string())
}

impl MemoryLog {
    /// Create an empty log whose origin is the signer's key name.
    pub fn new(signer: NoteSigner, config: MemoryLogConfig) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            signer,
            cosigners: Vec::new(),
            config,
            inner: RwLock::new(MemoryLogInner {
                entries: Vec::new(),
                stored: Vec::new(),
            }),
            published,
        }
    }

    /// Add signers (typically witnesses) that co-sign every checkpoint.
    pub fn with_cosigners(mut self, cosigners: Vec<NoteSigner>) -> Self {
        self.cosigners = cosigners;
        self
    }

    pub fn origin(&self) -> &str {
        self.signer.name()
    }

    /// The log's checkpoint verification key.
    pub fn verifier(&self) -> NoteVerifier {
        self.signer.verifier()
    }

    /// Number of appended records.
    pub fn size(&self) -> Result<u64> {
        Ok(self.inner.read().map_err(poisoned)?.entries.len() as u64)
    }

    /// Record at `index`, if appended.
    pub fn entry(&self, index: u64) -> Result<Option<Bytes>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(usize::try_from(index)
            .ok()
            .and_then(|i| inner.entries.get(i).cloned()))
    }

    /// Root hash over all appended records.
    pub fn root(&self) -> Result<Sha256Hash> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(tree_hash(inner.entries.len() as u64, &inner.stored)?)
    }

    /// The most recently published checkpoint.
    pub fn latest_checkpoint(&self) -> Option<Bytes> {
        self.published.borrow().as_ref().map(|(_, b)| b.clone())
    }

    fn append_sync(&self, record: Bytes) -> Result<u64> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let index = inner.entries.len() as u64;
        let hashes = stored_hashes_for_record_hash(index, record_hash(&record), &inner.stored)?;
        inner.stored.extend(hashes);
        inner.entries.push(record);
        debug!(index, "appended record");
        Ok(index)
    }

    /// Sign and publish a checkpoint over every record appended so far.
    pub fn publish(&self) -> Result<Bytes> {
        let (size, root) = {
            let inner = self.inner.read().map_err(poisoned)?;
            let size = inner.entries.len() as u64;
            (size, tree_hash(size, &inner.stored)?)
        };

        let mut extension = String::new();
        for line in &self.config.extension_lines {
            extension.push_str(line);
            extension.push('\n');
        }
        let checkpoint = Checkpoint {
            origin: self.origin().to_string(),
            size,
            root,
            extension,
        };
        let mut signers = vec![&self.signer];
        signers.extend(self.cosigners.iter());
        let signed = Bytes::from(note::sign(&checkpoint.to_text(), &signers)?);

        // Concurrent publishers may race; never move the published size back.
        self.published.send_if_modified(|current| match current {
            Some((published_size, _)) if *published_size > size => false,
            _ => {
                *current = Some((size, signed.clone()));
                true
            }
        });
        debug!(size, root = %root, "published checkpoint");
        Ok(signed)
    }
}

impl LogAppender for MemoryLog {
    fn append(&self, record: Bytes) -> IndexFuture {
        let result = self.append_sync(record);
        if result.is_ok() && self.config.publish_on_append {
            if let Err(e) = self.publish() {
                return IndexFuture::ready(Err(e));
            }
        }
        IndexFuture::ready(result)
    }
}

#[async_trait]
impl PublicationAwaiter for MemoryLog {
    async fn await_checkpoint(&self, index: IndexFuture) -> Result<(u64, Bytes)> {
        let index = index.await?;
        let mut rx = self.published.subscribe();
        loop {
            let covering = rx
                .borrow_and_update()
                .as_ref()
                .filter(|(size, _)| *size > index)
                .map(|(_, checkpoint)| checkpoint.clone());
            if let Some(checkpoint) = covering {
                return Ok((index, checkpoint));
            }
            rx.changed().await.map_err(|_| LogError::Closed)?;
        }
    }
}

#[async_trait]
impl TileReader for MemoryLog {
    async fn read_tile(&self, level: u64, index: u64, partial_width: u8) -> Result<Bytes> {
        let not_found = || LogError::NotFound {
            level,
            index,
            width: partial_width,
        };
        let tile = Tile {
            height: DEFAULT_TILE_HEIGHT,
            level: u8::try_from(level).map_err(|_| not_found())?,
            index,
            width: if partial_width == 0 {
                1 << DEFAULT_TILE_HEIGHT
            } else {
                partial_width as u32
            },
        };
        let inner = self.inner.read().map_err(poisoned)?;
        match read_tile_data(&tile, &inner.stored) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(TlogError::MissingHash(_)) | Err(TlogError::InvalidTile(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spicy_core::{CheckpointCapsule, KeyAlgorithm, NoteVerifiers};
    use std::sync::Arc;
    use std::time::Duration;

    fn signer() -> NoteSigner {
        NoteSigner::from_seed("log.example", KeyAlgorithm::Ed25519, [1; 32]).unwrap()
    }

    #[tokio::test]
    async fn test_append_assigns_sequential_indexes() {
        let log = MemoryLog::new(signer(), MemoryLogConfig::default());
        for i in 0..5u64 {
            assert_eq!(log.append(Bytes::from(vec![i as u8])).await.unwrap(), i);
        }
        assert_eq!(log.size().unwrap(), 5);
        assert_eq!(log.entry(2).unwrap(), Some(Bytes::from(vec![2u8])));
        assert_eq!(log.entry(9).unwrap(), None);
    }

    #[tokio::test]
    async fn test_published_checkpoint_is_signed() {
        let config = MemoryLogConfig {
            extension_lines: vec!["ext one".to_string()],
            ..Default::default()
        };
        let log = MemoryLog::new(signer(), config);
        log.append(Bytes::from_static(b"a")).await.unwrap();
        log.append(Bytes::from_static(b"b")).await.unwrap();

        let bytes = log.latest_checkpoint().unwrap();
        let capsule = CheckpointCapsule::open(bytes, &NoteVerifiers::new([log.verifier()])).unwrap();
        assert_eq!(capsule.origin(), "log.example");
        assert_eq!(capsule.size(), 2);
        assert_eq!(capsule.root(), &log.root().unwrap());
        assert_eq!(capsule.checkpoint().extension, "ext one\n");
    }

    #[tokio::test]
    async fn test_await_waits_for_covering_checkpoint() {
        let config = MemoryLogConfig {
            publish_on_append: false,
            ..Default::default()
        };
        let log = Arc::new(MemoryLog::new(signer(), config));
        let fut = log.append(Bytes::from_static(b"a"));

        let waiter = {
            let log = log.clone();
            tokio::spawn(async move { log.await_checkpoint(fut).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        log.publish().unwrap();
        let (index, checkpoint) = waiter.await.unwrap().unwrap();
        assert_eq!(index, 0);
        assert_eq!(CheckpointCapsule::open_unverified(checkpoint).unwrap().size(), 1);
    }

    #[tokio::test]
    async fn test_read_tile_partial_and_missing() {
        let log = MemoryLog::new(signer(), MemoryLogConfig::default());
        for i in 0..3u8 {
            log.append(Bytes::from(vec![i])).await.unwrap();
        }
        let tile = log.read_tile(0, 0, 3).await.unwrap();
        assert_eq!(tile.len(), 3 * 32);
        assert_eq!(&tile[..32], record_hash(&[0]).as_bytes());

        assert!(matches!(
            log.read_tile(0, 0, 0).await,
            Err(LogError::NotFound { .. })
        ));
        assert!(matches!(
            log.read_tile(0, 1, 1).await,
            Err(LogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_cosigners_sign_checkpoints() {
        let witness = NoteSigner::from_seed("w.example", KeyAlgorithm::Cosignature, [2; 32])
            .unwrap()
            .with_timestamp(1);
        let wv = witness.verifier();
        let log = MemoryLog::new(signer(), MemoryLogConfig::default()).with_cosigners(vec![witness]);
        log.append(Bytes::from_static(b"x")).await.unwrap();

        let capsule = CheckpointCapsule::open(
            log.latest_checkpoint().unwrap(),
            &NoteVerifiers::new([log.verifier(), wv]),
        )
        .unwrap();
        assert_eq!(capsule.note().verified().count(), 2);
    }
}
