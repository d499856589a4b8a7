//! Shared voxel-sampling types and the brick-sampling iteration every source
//! in the chain uses. `sample_brick_via_lookup` is a single generic helper
//! parameterized by a per-chunk lookup closure, since every source's
//! chunk-iteration body is otherwise identical.

use crate::world::core::{world_to_chunk, world_to_local, BlockId, BlockState, ChunkCoord};
use crate::world::storage::chunk_operations::dense_index;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Type identifier carried through the voxel SVO system. Maps directly to
/// `BlockId`'s numeric value so the far system stays format-agnostic.
pub type VoxelId = u16;

pub const VOXEL_AIR: VoxelId = 0;

pub fn to_voxel_id(id: BlockId) -> VoxelId {
    id.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrickSampleStatus {
    Hit,
    Miss,
    Cancelled,
}

/// Describes one brick sample request: a world-voxel-space box plus a stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrickSampleDesc {
    pub world_min_voxel: (i32, i32, i32),
    pub brick_dims_voxels: (i32, i32, i32),
    pub step_voxels: i32,
}

impl BrickSampleDesc {
    pub fn is_valid(&self) -> bool {
        if self.step_voxels <= 0 {
            return false;
        }
        let (dx, dy, dz) = self.brick_dims_voxels;
        if dx <= 0 || dy <= 0 || dz <= 0 {
            return false;
        }
        dx % self.step_voxels == 0 && dy % self.step_voxels == 0 && dz % self.step_voxels == 0
    }

    pub fn out_dims(&self) -> (i32, i32, i32) {
        if !self.is_valid() {
            return (0, 0, 0);
        }
        let (dx, dy, dz) = self.brick_dims_voxels;
        (dx / self.step_voxels, dy / self.step_voxels, dz / self.step_voxels)
    }

    pub fn out_voxel_count(&self) -> usize {
        let (dx, dy, dz) = self.out_dims();
        if dx <= 0 || dy <= 0 || dz <= 0 {
            return 0;
        }
        (dx as usize) * (dy as usize) * (dz as usize)
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.map(|c| c.load(Ordering::Relaxed)).unwrap_or(false)
}

fn brick_index(x: i32, y: i32, z: i32, dims: (i32, i32, i32)) -> usize {
    (x + y * dims.0 + z * dims.0 * dims.1) as usize
}

/// Sample a brick by resolving each intersecting chunk through `lookup`,
/// caching results for the duration of the call, then copying one voxel per
/// output cell. `lookup` returns a dense (`x + y*32 + z*32^2`) 32768-element
/// block array for a chunk, or `None` if that chunk has nothing to offer —
/// any `None` during the prefetch pass makes the whole brick a `Miss`.
pub fn sample_brick_via_lookup(
    desc: &BrickSampleDesc,
    out: &mut [VoxelId],
    cancel: Option<&AtomicBool>,
    mut lookup: impl FnMut(ChunkCoord) -> Option<Vec<BlockState>>,
) -> BrickSampleStatus {
    if is_cancelled(cancel) {
        return BrickSampleStatus::Cancelled;
    }
    if !desc.is_valid() {
        return BrickSampleStatus::Miss;
    }

    let dims = desc.out_dims();
    let expected = desc.out_voxel_count();
    if expected == 0 || out.len() != expected {
        return BrickSampleStatus::Miss;
    }

    let (wmx, wmy, wmz) = desc.world_min_voxel;
    let max_world = (
        wmx + (dims.0 - 1) * desc.step_voxels,
        wmy + (dims.1 - 1) * desc.step_voxels,
        wmz + (dims.2 - 1) * desc.step_voxels,
    );
    let min_chunk = world_to_chunk(wmx, wmy, wmz);
    let max_chunk = world_to_chunk(max_world.0, max_world.1, max_world.2);

    let (cx0, cx1) = (min_chunk.x.min(max_chunk.x), min_chunk.x.max(max_chunk.x));
    let (cy0, cy1) = (min_chunk.y.min(max_chunk.y), min_chunk.y.max(max_chunk.y));
    let (cz0, cz1) = (min_chunk.z.min(max_chunk.z), min_chunk.z.max(max_chunk.z));

    let mut cache: HashMap<ChunkCoord, Vec<BlockState>> = HashMap::new();
    for cz in cz0..=cz1 {
        for cy in cy0..=cy1 {
            for cx in cx0..=cx1 {
                if is_cancelled(cancel) {
                    return BrickSampleStatus::Cancelled;
                }
                let coord = ChunkCoord::new(cx, cy, cz);
                match lookup(coord) {
                    Some(blocks) => {
                        cache.insert(coord, blocks);
                    }
                    None => return BrickSampleStatus::Miss,
                }
            }
        }
    }

    for z in 0..dims.2 {
        if is_cancelled(cancel) {
            return BrickSampleStatus::Cancelled;
        }
        let wz = wmz + z * desc.step_voxels;
        for y in 0..dims.1 {
            let wy = wmy + y * desc.step_voxels;
            for x in 0..dims.0 {
                let wx = wmx + x * desc.step_voxels;
                let chunk_coord = world_to_chunk(wx, wy, wz);
                let blocks = cache
                    .get(&chunk_coord)
                    .expect("chunk was prefetched above");
                let (lx, ly, lz) = world_to_local(wx, wy, wz);
                let idx = dense_index(lx, ly, lz);
                out[brick_index(x, y, z, dims)] = to_voxel_id(blocks[idx].id);
            }
        }
    }

    BrickSampleStatus::Hit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_step_rejected() {
        let desc = BrickSampleDesc {
            world_min_voxel: (0, 0, 0),
            brick_dims_voxels: (4, 4, 4),
            step_voxels: 3,
        };
        assert!(!desc.is_valid());
    }

    #[test]
    fn out_dims_divides_by_step() {
        let desc = BrickSampleDesc {
            world_min_voxel: (0, 0, 0),
            brick_dims_voxels: (8, 8, 8),
            step_voxels: 2,
        };
        assert_eq!(desc.out_dims(), (4, 4, 4));
        assert_eq!(desc.out_voxel_count(), 64);
    }
}
