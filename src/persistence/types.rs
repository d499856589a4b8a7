//! Types shared with the persistence collaborator.
//!
//! `ChunkSnapshot` (see `world::storage::span`) carries a typed
//! `ChunkSpanData` rather than an opaque byte payload.

use crate::world::storage::span::ChunkSpan;
use std::fmt;

/// Zone identifier plus three signed region coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionKey {
    pub zone: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Zone identifier plus three signed chunk coordinates, identifying one
/// storage sub-key within a region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub zone: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{},{}", self.zone, self.x, self.y, self.z)
    }
}

/// A region's full contents as read from the persistence backend: a flat list
/// of the chunk-span fragments it stores.
#[derive(Debug, Clone, Default)]
pub struct ChunkRegionSnapshot {
    pub key: Option<RegionKey>,
    pub chunks: Vec<crate::world::storage::span::ChunkSnapshot>,
}

/// How to resolve an id absent from the registry on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownIdPolicy {
    Fail,
    Placeholder,
    Skip,
}

/// The persistence format collaborator: maps chunks to regions and storage
/// keys, and loads regions. The on-disk layout behind this trait is opaque
/// to the core.
pub trait PersistenceFormat: Send + Sync {
    fn region_for_chunk(&self, zone: &str, coord: crate::world::core::ChunkCoord) -> RegionKey;
    fn storage_keys_for_chunk(&self, zone: &str, coord: crate::world::core::ChunkCoord) -> Vec<ChunkKey>;
    fn span_for_storage_key(&self, key: &ChunkKey) -> ChunkSpan;
    fn load_region(&self, key: &RegionKey) -> Result<ChunkRegionSnapshot, PersistenceError>;
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
