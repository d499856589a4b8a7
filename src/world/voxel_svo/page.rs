//! CPU-side voxel page: an L0 brick plus its mip pyramid, keyed by LOD level
//! and page-grid coordinate.

use super::mip::{build_mip_pyramid, VoxelMipPyramid};
use crate::world::voxel_source::VoxelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoxelPageKey {
    pub level: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelPageKey {
    pub fn new(level: i32, x: i32, y: i32, z: i32) -> Self {
        Self { level, x, y, z }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoxelPageCpu {
    pub key: VoxelPageKey,
    pub dim: i32,
    pub l0: Vec<VoxelId>,
    pub mips: VoxelMipPyramid,
}

impl Default for VoxelPageKey {
    fn default() -> Self {
        Self { level: 0, x: 0, y: 0, z: 0 }
    }
}

impl VoxelPageCpu {
    pub fn l0_voxel_count(&self) -> usize {
        self.l0.len()
    }

    pub fn cpu_bytes(&self) -> usize {
        let mut bytes = self.l0.len() * std::mem::size_of::<VoxelId>();
        for level in &self.mips.levels {
            bytes += level.cells.len() * std::mem::size_of::<u32>();
        }
        bytes
    }
}

/// Builds a CPU page from an L0 brick. Returns an empty page if `dim <= 0`
/// or `l0.len() != dim^3`.
pub fn build_voxel_page_cpu(key: VoxelPageKey, l0: &[VoxelId], dim: i32) -> VoxelPageCpu {
    let mut out = VoxelPageCpu::default();
    if dim <= 0 {
        return out;
    }
    let expected = (dim as usize).pow(3);
    if l0.len() != expected {
        return out;
    }

    out.key = key;
    out.dim = dim;
    out.l0 = l0.to_vec();
    out.mips = build_mip_pyramid(&out.l0, dim);
    out
}
