//! Voxel-world streaming and level-of-detail core.
//!
//! Turns a world of mutable block chunks into a multi-resolution octree of
//! pages suitable for efficient CPU sampling, culling, and surface
//! extraction at arbitrary view distances. Windowing, GPU upload, input
//! bindings, the asset pipeline, and the high-level application loop are
//! external collaborators and live outside this crate.

pub mod constants;
pub mod error;
pub mod persistence;
pub mod renderer;
pub mod world;

pub use error::{EngineError, EngineResult, ErrorContext, OptionExt};

pub use world::core::{BlockId, BlockRegistry, BlockState, ChunkCoord, RenderLayer};
pub use world::management::ChunkManager;
pub use world::storage::{Chunk, ChunkCache};
pub use world::voxel_source::{
    BrickSampleDesc, BrickSampleStatus, GeneratorSource, LoadedChunkSource, VoxelId,
    VoxelSourceChain,
};
pub use world::voxel_svo::{
    build_mip_pyramid, build_voxel_page_cpu, build_voxel_page_tree, VoxelMaterialClass,
    VoxelMipPyramid, VoxelPageCpu, VoxelPageKey, VoxelPageTree, VoxelSvoConfig, VoxelSvoPageInfo,
    VoxelSvoPipeline, VoxelSvoTelemetry,
};
pub use persistence::{PersistenceFormat, PersistenceSource};
