//! Tile-backed stored-hash reads and inclusion proofs.
//!
//! Tiles for one request are fetched concurrently. The first failed fetch
//! aborts the whole request; hashes are only returned once every tile has
//! been authenticated against the checkpoint root.
//!
//! Tile readers address tiles of [`DEFAULT_TILE_HEIGHT`] only.

use futures::future::try_join_all;
use spicy_core::tile::{TilePlan, DEFAULT_TILE_HEIGHT};
use spicy_core::{tlog, Sha256Hash, TlogError};
use tracing::debug;

use crate::error::Result;
use crate::traits::TileReader;

/// Reads stored hashes through a [`TileReader`], trusting only data that
/// hashes to a known tree root.
pub struct TileHashReader<'a, R: TileReader + ?Sized> {
    reader: &'a R,
    tree_size: u64,
    root: Sha256Hash,
}

impl<'a, R: TileReader + ?Sized> TileHashReader<'a, R> {
    pub fn new(reader: &'a R, tree_size: u64, root: Sha256Hash) -> Self {
        Self {
            reader,
            tree_size,
            root,
        }
    }

    /// Fetch the stored hashes at `indexes`, in order.
    pub async fn read_hashes(&self, indexes: &[u64]) -> Result<Vec<Sha256Hash>> {
        let plan = TilePlan::new(DEFAULT_TILE_HEIGHT, self.tree_size, indexes)?;
        debug!(
            tree_size = self.tree_size,
            hashes = indexes.len(),
            tiles = plan.tiles().len(),
            "reading tiles"
        );

        let requests = plan
            .tiles()
            .iter()
            .map(|tile| {
                let width = tile
                    .partial_width()
                    .ok_or_else(|| TlogError::InvalidTile(tile.path()))?;
                Ok((tile, width))
            })
            .collect::<std::result::Result<Vec<_>, TlogError>>()?;

        let data = try_join_all(requests.into_iter().map(|(tile, width)| {
            debug!(tile = %tile, "read tile");
            self.reader.read_tile(tile.level as u64, tile.index, width)
        }))
        .await?;

        Ok(plan.extract(&data, &self.root)?)
    }

    /// Inclusion proof for record `index` in this tree.
    pub async fn prove_record(&self, index: u64) -> Result<Vec<Sha256Hash>> {
        let indexes = tlog::record_proof_indexes(self.tree_size, index)?;
        if indexes.is_empty() {
            return Ok(Vec::new());
        }
        let hashes = self.read_hashes(&indexes).await?;
        Ok(tlog::record_proof_from_hashes(self.tree_size, index, &hashes)?)
    }
}
