//! Collaborator traits: the interfaces a transparency log exposes to the
//! signer.
//!
//! Signing needs three things from a log: somewhere to append a record,
//! a way to wait until a checkpoint covers it, and read access to hash tiles
//! so an inclusion proof can be assembled.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::Result;

/// A pending index assignment returned by [`LogAppender::append`].
pub struct IndexFuture(BoxFuture<'static, Result<u64>>);

impl IndexFuture {
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = Result<u64>> + Send + 'static,
    {
        Self(fut.boxed())
    }

    /// A future that resolves immediately.
    pub fn ready(result: Result<u64>) -> Self {
        Self::new(futures::future::ready(result))
    }
}

impl Future for IndexFuture {
    type Output = Result<u64>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().0.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for IndexFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IndexFuture")
    }
}

/// Appends records to a log.
pub trait LogAppender: Send + Sync {
    /// Submit a record. Index assignment may complete later.
    ///
    /// Concurrent appends must be assigned distinct indexes.
    fn append(&self, record: Bytes) -> IndexFuture;
}

/// Waits for a published checkpoint covering an appended record.
#[async_trait]
pub trait PublicationAwaiter: Send + Sync {
    /// Resolve `index`, then wait until a checkpoint of size greater than it
    /// is published. Returns the index and the checkpoint bytes verbatim.
    ///
    /// Dropping the returned future abandons the wait.
    async fn await_checkpoint(&self, index: IndexFuture) -> Result<(u64, Bytes)>;
}

/// Reads hash tiles.
#[async_trait]
pub trait TileReader: Send + Sync {
    /// Read one tile. `partial_width` is 0 for a full tile, otherwise the
    /// number of hashes in a partial tile.
    async fn read_tile(&self, level: u64, index: u64, partial_width: u8) -> Result<Bytes>;
}
