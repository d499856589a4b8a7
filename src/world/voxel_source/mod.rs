//! The priority chain of voxel data sources feeding the SVO page pipeline:
//! resident chunks, then persisted regions, then world generation.

pub mod chain;
pub mod desc;
pub mod generator;
pub mod loaded;

pub use chain::{VoxelSource, VoxelSourceChain, VoxelSourceChainTelemetry};
pub use desc::{to_voxel_id, BrickSampleDesc, BrickSampleStatus, VoxelId, VOXEL_AIR};
pub use generator::{ChunkGenerateFn, GeneratorSource};
pub use loaded::{ChunkSnapshot, LoadedChunkSource};
