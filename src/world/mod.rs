//! Voxel world core: block identity, chunk storage, chunk management, the
//! voxel source chain, and the adaptive SVO page pipeline built on top of them.

pub mod core;
pub mod management;
pub mod storage;
pub mod voxel_source;
pub mod voxel_svo;

pub use core::{BlockId, BlockRegistry, BlockState, ChunkCoord, RenderLayer};
pub use management::ChunkManager;
pub use storage::{Chunk, ChunkCache};
