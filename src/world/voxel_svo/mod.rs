//! Adaptive voxel SVO built from the chunk store: per-page mip pyramids,
//! sparse octrees, the build/upload pipeline, and surface extraction.

pub mod config;
pub mod mip;
pub mod page;
pub mod page_pipeline;
pub mod page_tree;
pub mod surface;

pub use config::VoxelSvoConfig;
pub use mip::{build_mip_pyramid, VoxelMipLevel, VoxelMipPyramid};
pub use page::{build_voxel_page_cpu, VoxelPageCpu, VoxelPageKey};
pub use page_pipeline::{PageRecord, PageState, VoxelSvoPageInfo, VoxelSvoPipeline, VoxelSvoTelemetry};
pub use page_tree::{
    build_voxel_page_tree, VoxelMaterialClass, VoxelMaterialClassifier, VoxelPageTree,
    VoxelSvoNode, VoxelSvoNodeKind,
};
