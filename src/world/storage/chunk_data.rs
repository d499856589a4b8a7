//! Chunk Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in chunk_operations.rs

use crate::constants::SUBCHUNK_VOLUME;
use crate::world::core::{BlockState, ChunkCoord};

/// A sparse, subchunk-allocated 32^3 cube of blocks. Each of the 8 subchunks
/// is a lazily-allocated 16^3 array, present only once it holds a non-air
/// block.
pub struct ChunkData {
    pub coord: ChunkCoord,
    pub subchunks: [Option<Box<[BlockState; SUBCHUNK_VOLUME]>>; 8],
    pub non_air_count: u32,
    pub opaque_count: u32,
    pub subchunk_non_air: [u32; 8],
    pub subchunk_opaque: [u32; 8],
    pub dirty: bool,
    pub persist_dirty: bool,
    pub world_gen_version: u32,
    pub mesh_revision: u64,
}
