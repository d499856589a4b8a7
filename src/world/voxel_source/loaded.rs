//! Worker-safe source backed by immutable snapshots of resident chunks.
//! Snapshot creation must happen on the main thread before handing a
//! `LoadedChunkSource` to a worker: `ChunkManager` itself is not thread-safe.

use super::desc::{sample_brick_via_lookup, BrickSampleDesc, BrickSampleStatus, VoxelId};
use crate::constants::CHUNK_VOLUME;
use crate::world::core::{BlockState, ChunkCoord};
use crate::world::management::ChunkManager;
use std::sync::atomic::AtomicBool;

pub struct ChunkSnapshot {
    pub coord: ChunkCoord,
    pub blocks: Vec<BlockState>,
}

pub struct LoadedChunkSource {
    snapshots: Vec<ChunkSnapshot>,
}

impl LoadedChunkSource {
    pub fn new(snapshots: Vec<ChunkSnapshot>) -> Self {
        Self { snapshots }
    }

    /// Collect dense block snapshots for every chunk intersecting `desc`.
    /// Reads live `Chunk` instances through `chunks`; call only where
    /// `ChunkManager` access is externally synchronized.
    pub fn snapshot_for_brick(chunks: &ChunkManager, desc: &BrickSampleDesc) -> Vec<ChunkSnapshot> {
        let mut out = Vec::new();
        if !desc.is_valid() {
            return out;
        }
        let dims = desc.out_dims();
        if dims.0 <= 0 || dims.1 <= 0 || dims.2 <= 0 {
            return out;
        }

        let (wmx, wmy, wmz) = desc.world_min_voxel;
        let max_world = (
            wmx + (dims.0 - 1) * desc.step_voxels,
            wmy + (dims.1 - 1) * desc.step_voxels,
            wmz + (dims.2 - 1) * desc.step_voxels,
        );
        let min_chunk = crate::world::core::world_to_chunk(wmx, wmy, wmz);
        let max_chunk = crate::world::core::world_to_chunk(max_world.0, max_world.1, max_world.2);

        let (cx0, cx1) = (min_chunk.x.min(max_chunk.x), min_chunk.x.max(max_chunk.x));
        let (cy0, cy1) = (min_chunk.y.min(max_chunk.y), min_chunk.y.max(max_chunk.y));
        let (cz0, cz1) = (min_chunk.z.min(max_chunk.z), min_chunk.z.max(max_chunk.z));

        for cz in cz0..=cz1 {
            for cy in cy0..=cy1 {
                for cx in cx0..=cx1 {
                    let coord = ChunkCoord::new(cx, cy, cz);
                    if let Some(chunk) = chunks.get_chunk(coord) {
                        let mut blocks = vec![BlockState::AIR; CHUNK_VOLUME];
                        let mut arr = [BlockState::AIR; CHUNK_VOLUME];
                        chunk.copy_blocks(&mut arr);
                        blocks.copy_from_slice(&arr);
                        out.push(ChunkSnapshot { coord, blocks });
                    }
                }
            }
        }
        out
    }

    fn find(&self, coord: ChunkCoord) -> Option<&ChunkSnapshot> {
        self.snapshots.iter().find(|s| s.coord == coord)
    }

    pub fn sample_brick(
        &self,
        desc: &BrickSampleDesc,
        out: &mut [VoxelId],
        cancel: Option<&AtomicBool>,
    ) -> BrickSampleStatus {
        sample_brick_via_lookup(desc, out, cancel, |coord| {
            self.find(coord).map(|s| s.blocks.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::core::BlockId;

    #[test]
    fn miss_when_chunk_absent() {
        let source = LoadedChunkSource::new(vec![]);
        let desc = BrickSampleDesc {
            world_min_voxel: (0, 0, 0),
            brick_dims_voxels: (4, 4, 4),
            step_voxels: 1,
        };
        let mut out = vec![0u16; desc.out_voxel_count()];
        assert_eq!(source.sample_brick(&desc, &mut out, None), BrickSampleStatus::Miss);
    }

    #[test]
    fn hit_reads_block_ids_from_snapshot() {
        let coord = ChunkCoord::new(0, 0, 0);
        let mut blocks = vec![BlockState::AIR; CHUNK_VOLUME];
        blocks[0] = BlockState::new(BlockId::new(9), 0, 0, 0);
        let source = LoadedChunkSource::new(vec![ChunkSnapshot { coord, blocks }]);

        let desc = BrickSampleDesc {
            world_min_voxel: (0, 0, 0),
            brick_dims_voxels: (1, 1, 1),
            step_voxels: 1,
        };
        let mut out = vec![0u16; 1];
        assert_eq!(source.sample_brick(&desc, &mut out, None), BrickSampleStatus::Hit);
        assert_eq!(out[0], 9);
    }
}
