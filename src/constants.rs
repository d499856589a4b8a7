//! Crate-wide numeric constants.

/// Chunks are cubic regions of blocks, `CHUNK_SIZE` blocks to a side.
pub const CHUNK_SIZE: i32 = 32;
/// Chunks split into 8 subchunks of `SUBCHUNK_SIZE` blocks to a side.
pub const SUBCHUNK_SIZE: i32 = 16;
/// Number of subchunks per chunk (2x2x2).
pub const SUBCHUNKS_PER_CHUNK: usize = 8;

/// Total voxel count in a chunk (32^3).
pub const CHUNK_VOLUME: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;
/// Total voxel count in a subchunk (16^3).
pub const SUBCHUNK_VOLUME: usize = (SUBCHUNK_SIZE * SUBCHUNK_SIZE * SUBCHUNK_SIZE) as usize;
