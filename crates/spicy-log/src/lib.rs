//! # Spicy Log
//!
//! The transparency-log side of Spicy Signatures.
//!
//! - [`LogAppender`], [`PublicationAwaiter`], [`TileReader`] - what a log
//!   must provide for signing
//! - [`TileHashReader`] - authenticated stored-hash reads and inclusion
//!   proofs over fetched tiles
//! - [`MemoryLog`] - an in-memory log implementing all three traits

pub mod error;
pub mod memory;
pub mod tiles;
pub mod traits;

pub use error::{LogError, Result};
pub use memory::{MemoryLog, MemoryLogConfig};
pub use tiles::TileHashReader;
pub use traits::{IndexFuture, LogAppender, PublicationAwaiter, TileReader};
