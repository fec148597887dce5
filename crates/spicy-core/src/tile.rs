//! Hash tiles: fixed-height slices of the stored-hash tree.
//!
//! A tile of height `h` at tile level `L` and index `N` holds up to `2^h`
//! consecutive hashes from tree level `L * h`. Tiles narrower than `2^h` are
//! partial and only appear at the right edge of the tree.
//!
//! [`TilePlan`] decides which tiles a reader must fetch to return a set of
//! stored hashes, and authenticates fetched tile data against a trusted root
//! before extracting hashes from it. Fetching itself is left to the caller.

use std::collections::HashMap;
use std::fmt;

use crate::crypto::Sha256Hash;
use crate::error::TlogError;
use crate::tlog::{self, node_hash, split_stored_hash_index, stored_hash_index, HashReader};

/// Bytes per hash within tile data.
pub const HASH_SIZE: usize = 32;

/// Tile height used by tlog-tiles logs.
pub const DEFAULT_TILE_HEIGHT: u8 = 8;

/// Coordinates of a hash tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    /// Height, `1..=30`.
    pub height: u8,
    /// Tile level; covers tree level `level * height`.
    pub level: u8,
    /// Index within the tile level.
    pub index: u64,
    /// Number of hashes, `1..=2^height`.
    pub width: u32,
}

impl Tile {
    /// Whether this tile holds a full `2^height` hashes.
    pub fn is_full(&self) -> bool {
        self.width == 1u32 << self.height
    }

    /// Width as sent to tile readers: 0 for a full tile.
    ///
    /// `None` when a partial width does not fit in a byte, which can only
    /// happen above height 8.
    pub fn partial_width(&self) -> Option<u8> {
        if self.is_full() {
            Some(0)
        } else {
            u8::try_from(self.width).ok()
        }
    }

    /// The tlog-tiles path, e.g. `tile/0/x001/234.p/5`.
    pub fn path(&self) -> String {
        let mut n = self.index;
        let mut groups = vec![format!("{:03}", n % 1000)];
        n /= 1000;
        while n > 0 {
            groups.push(format!("x{:03}", n % 1000));
            n /= 1000;
        }
        groups.reverse();
        let mut path = format!("tile/{}/{}", self.level, groups.join("/"));
        if !self.is_full() {
            path.push_str(&format!(".p/{}", self.width));
        }
        path
    }

    fn validate(&self) -> Result<(), TlogError> {
        if self.height < 1
            || self.height > 30
            || (self.level as u32) * (self.height as u32) >= 64
            || self.width < 1
            || self.width > 1u32 << self.height
        {
            return Err(TlogError::InvalidTile(self.path()));
        }
        Ok(())
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// The smallest tile containing stored hash `index`, with the byte range of
/// the data that hashes to it.
pub fn tile_for_index(height: u8, index: u64) -> (Tile, usize, usize) {
    let h = height as u32;
    let (level, n) = split_stored_hash_index(index);
    let tile_level = level / h;
    let level_in = level - tile_level * h;
    let tile_index = (n << level_in) >> h;
    let n_in = n - ((tile_index << h) >> level_in);
    let tile = Tile {
        height,
        level: tile_level as u8,
        index: tile_index,
        width: ((n_in + 1) << level_in) as u32,
    };
    let start = ((n_in << level_in) as usize) * HASH_SIZE;
    let end = (((n_in + 1) << level_in) as usize) * HASH_SIZE;
    (tile, start, end)
}

/// Merkle hash of a contiguous power-of-two run of tile hashes.
pub fn tile_hash(data: &[u8]) -> Sha256Hash {
    if data.len() <= HASH_SIZE {
        let mut h = [0u8; 32];
        h[..data.len()].copy_from_slice(data);
        return Sha256Hash(h);
    }
    let half = data.len() / 2;
    node_hash(&tile_hash(&data[..half]), &tile_hash(&data[half..]))
}

/// Extract stored hash `index` from the data of `tile`.
pub fn hash_from_tile(tile: &Tile, data: &[u8], index: u64) -> Result<Sha256Hash, TlogError> {
    tile.validate()?;
    if data.len() < tile.width as usize * HASH_SIZE {
        return Err(TlogError::InvalidTile(format!(
            "{}: {} bytes of data",
            tile,
            data.len()
        )));
    }
    let (t, start, end) = tile_for_index(tile.height, index);
    if tile.level != t.level || tile.index != t.index || tile.width < t.width {
        return Err(TlogError::InvalidTile(format!(
            "index {index} is in {t}, not {tile}"
        )));
    }
    Ok(tile_hash(&data[start..end]))
}

/// The tile `k` levels above `tile` in a tree of `tree_size` records,
/// trimmed to the tree edge. `None` if that tile would be empty.
pub fn tile_parent(tile: &Tile, k: u8, tree_size: u64) -> Option<Tile> {
    let h = tile.height as u32;
    let level = tile.level.checked_add(k)?;
    let shift = (level as u32).checked_mul(h)?;
    let mut parent = Tile {
        height: tile.height,
        level,
        index: tile.index.checked_shr(k as u32 * h).unwrap_or(0),
        width: 1u32 << h,
    };
    let max = tree_size.checked_shr(shift).unwrap_or(0);
    let start = parent.index << h;
    if start + parent.width as u64 >= max {
        if max <= start {
            return None;
        }
        parent.width = (max - start) as u32;
    }
    Some(parent)
}

/// Assemble the data for `tile` from a stored-hash source.
pub fn read_tile_data<R: HashReader + ?Sized>(tile: &Tile, reader: &R) -> Result<Vec<u8>, TlogError> {
    tile.validate()?;
    let level = tile.level as u32 * tile.height as u32;
    let start = tile.index << tile.height;
    let indexes: Vec<u64> = (0..tile.width as u64)
        .map(|i| stored_hash_index(level, start + i))
        .collect();
    let hashes = reader.read_hashes(&indexes)?;
    let mut data = Vec::with_capacity(hashes.len() * HASH_SIZE);
    for h in &hashes {
        data.extend_from_slice(&h.0);
    }
    Ok(data)
}

/// The set of tiles needed to serve a batch of stored hashes from a tree of
/// known size and root.
///
/// Tiles are ordered so that the ones recomputing the root come first and
/// every other tile comes after its parent.
#[derive(Debug, Clone)]
pub struct TilePlan {
    tree_size: u64,
    tiles: Vec<Tile>,
    order: HashMap<Tile, usize>,
    tree_indexes: Vec<u64>,
    tree_tiles: Vec<usize>,
    indexes: Vec<u64>,
    index_tiles: Vec<usize>,
}

impl TilePlan {
    /// Plan the tiles for `indexes` in a tree of `tree_size` records.
    pub fn new(height: u8, tree_size: u64, indexes: &[u64]) -> Result<Self, TlogError> {
        if !(1..=30).contains(&height) {
            return Err(TlogError::InvalidTile(format!("height {height}")));
        }
        let tree_indexes = tlog::tree_hash_indexes(tree_size);
        let mut plan = Self {
            tree_size,
            tiles: Vec::new(),
            order: HashMap::new(),
            tree_indexes: Vec::new(),
            tree_tiles: Vec::new(),
            indexes: indexes.to_vec(),
            index_tiles: Vec::with_capacity(indexes.len()),
        };

        for &x in &tree_indexes {
            let (tile, _, _) = tile_for_index(height, x);
            let tile = tile_parent(&tile, 0, tree_size)
                .ok_or_else(|| TlogError::InvalidTile(tile.path()))?;
            let j = plan.insert(tile);
            plan.tree_tiles.push(j);
        }
        plan.tree_indexes = tree_indexes;

        let limit = stored_hash_index(0, tree_size);
        for &x in indexes {
            if x >= limit {
                return Err(TlogError::MissingHash(x));
            }
            let (tile, _, _) = tile_for_index(height, x);

            // Walk up until reaching a tile already planned; that one is
            // authenticated, so its descendants can be checked against it.
            let mut k = 0u8;
            let found = loop {
                let parent = tile_parent(&tile, k, tree_size)
                    .ok_or_else(|| TlogError::InvalidTile(tile.path()))?;
                if let Some(&j) = plan.order.get(&parent) {
                    break j;
                }
                k = k
                    .checked_add(1)
                    .ok_or_else(|| TlogError::InvalidTile(tile.path()))?;
            };
            if k == 0 {
                plan.index_tiles.push(found);
                continue;
            }

            // Walk back down, recording each child after its parent.
            let mut last = found;
            for level in (0..k).rev() {
                let p = tile_parent(&tile, level, tree_size)
                    .ok_or_else(|| TlogError::InvalidTile(tile.path()))?;
                if !p.is_full() {
                    return Err(TlogError::InvalidTile(p.path()));
                }
                last = plan.insert(p);
            }
            plan.index_tiles.push(last);
        }
        Ok(plan)
    }

    fn insert(&mut self, tile: Tile) -> usize {
        if let Some(&j) = self.order.get(&tile) {
            return j;
        }
        let j = self.tiles.len();
        self.order.insert(tile, j);
        self.tiles.push(tile);
        j
    }

    /// Tiles to fetch, in order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Authenticate `data` (one entry per [`tiles`](Self::tiles)) against
    /// `root`, then return the requested hashes in request order.
    pub fn extract<D: AsRef<[u8]>>(&self, data: &[D], root: &Sha256Hash) -> Result<Vec<Sha256Hash>, TlogError> {
        if data.len() != self.tiles.len() {
            return Err(TlogError::HashCount {
                expected: self.tiles.len(),
                got: data.len(),
            });
        }

        let computed = if self.tree_indexes.is_empty() {
            Sha256Hash::digest(b"")
        } else {
            let mut th: Option<Sha256Hash> = None;
            for (i, &x) in self.tree_indexes.iter().enumerate().rev() {
                let j = self.tree_tiles[i];
                let h = hash_from_tile(&self.tiles[j], data[j].as_ref(), x)?;
                th = Some(match th {
                    None => h,
                    Some(right) => node_hash(&h, &right),
                });
            }
            th.unwrap_or(Sha256Hash::ZERO)
        };
        if computed != *root {
            return Err(TlogError::InconsistentTiles);
        }

        let authenticated = self
            .tree_tiles
            .iter()
            .copied()
            .max()
            .map_or(0, |m| m + 1);
        for i in authenticated..self.tiles.len() {
            let tile = &self.tiles[i];
            let parent = tile_parent(tile, 1, self.tree_size)
                .ok_or_else(|| TlogError::InvalidTile(tile.path()))?;
            let j = *self
                .order
                .get(&parent)
                .ok_or_else(|| TlogError::InvalidTile(tile.path()))?;
            let level = parent.level as u32 * parent.height as u32;
            let expected = hash_from_tile(&parent, data[j].as_ref(), stored_hash_index(level, tile.index))?;
            if expected != tile_hash(data[i].as_ref()) {
                return Err(TlogError::InconsistentTiles);
            }
        }

        self.indexes
            .iter()
            .zip(&self.index_tiles)
            .map(|(&x, &j)| hash_from_tile(&self.tiles[j], data[j].as_ref(), x))
            .collect()
    }
}
