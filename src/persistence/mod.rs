//! Persistence collaborator types and the on-disk voxel source tier.

pub mod source;
pub mod types;

pub use source::PersistenceSource;
pub use types::{
    ChunkKey, ChunkRegionSnapshot, PersistenceError, PersistenceFormat, PersistenceResult,
    RegionKey, UnknownIdPolicy,
};
