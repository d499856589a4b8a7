//! `VoxelSource`: a tagged union over the three source kinds, and
//! `VoxelSourceChain`, the loaded -> persistence -> generator priority chain.
//! A tagged enum dispatches to each source's `sample_brick` by match rather
//! than through a `dyn` trait object, avoiding v-table dispatch on a
//! per-voxel-brick hot path.

use super::desc::{BrickSampleDesc, BrickSampleStatus, VoxelId};
use super::generator::GeneratorSource;
use super::loaded::LoadedChunkSource;
use crate::persistence::PersistenceSource;
use std::sync::atomic::AtomicBool;

pub enum VoxelSource<'a> {
    Loaded(&'a LoadedChunkSource),
    Persistence(&'a PersistenceSource),
    Generator(&'a GeneratorSource),
}

impl VoxelSource<'_> {
    fn sample_brick(
        &self,
        desc: &BrickSampleDesc,
        out: &mut [VoxelId],
        cancel: Option<&AtomicBool>,
    ) -> BrickSampleStatus {
        match self {
            VoxelSource::Loaded(s) => s.sample_brick(desc, out, cancel),
            VoxelSource::Persistence(s) => s.sample_brick(desc, out, cancel),
            VoxelSource::Generator(s) => s.sample_brick(desc, out, cancel),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VoxelSourceChainTelemetry {
    pub bricks_sampled: u64,
    pub voxels_sampled: u64,
    pub loaded_hits: u64,
    pub persistence_hits: u64,
    pub generator_hits: u64,
}

/// Priority chain: loaded, then persistence, then generator. Worker-safe as
/// long as every configured source is.
#[derive(Default)]
pub struct VoxelSourceChain<'a> {
    loaded: Option<&'a LoadedChunkSource>,
    persistence: Option<&'a PersistenceSource>,
    generator: Option<&'a GeneratorSource>,
    telemetry: VoxelSourceChainTelemetry,
}

impl<'a> VoxelSourceChain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_loaded(&mut self, source: Option<&'a LoadedChunkSource>) {
        self.loaded = source;
    }

    pub fn set_persistence(&mut self, source: Option<&'a PersistenceSource>) {
        self.persistence = source;
    }

    pub fn set_generator(&mut self, source: Option<&'a GeneratorSource>) {
        self.generator = source;
    }

    pub fn telemetry(&self) -> VoxelSourceChainTelemetry {
        self.telemetry
    }

    pub fn reset_telemetry(&mut self) {
        self.telemetry = VoxelSourceChainTelemetry::default();
    }

    pub fn sample_brick(
        &mut self,
        desc: &BrickSampleDesc,
        out: &mut [VoxelId],
        cancel: Option<&AtomicBool>,
    ) -> BrickSampleStatus {
        if cancel.map(|c| c.load(std::sync::atomic::Ordering::Relaxed)).unwrap_or(false) {
            return BrickSampleStatus::Cancelled;
        }

        let voxel_count = desc.out_voxel_count() as u64;

        if let Some(loaded) = self.loaded {
            match VoxelSource::Loaded(loaded).sample_brick(desc, out, cancel) {
                BrickSampleStatus::Hit => {
                    self.telemetry.bricks_sampled += 1;
                    self.telemetry.voxels_sampled += voxel_count;
                    self.telemetry.loaded_hits += 1;
                    return BrickSampleStatus::Hit;
                }
                BrickSampleStatus::Cancelled => return BrickSampleStatus::Cancelled,
                BrickSampleStatus::Miss => {}
            }
        }

        if let Some(persistence) = self.persistence {
            match VoxelSource::Persistence(persistence).sample_brick(desc, out, cancel) {
                BrickSampleStatus::Hit => {
                    self.telemetry.bricks_sampled += 1;
                    self.telemetry.voxels_sampled += voxel_count;
                    self.telemetry.persistence_hits += 1;
                    return BrickSampleStatus::Hit;
                }
                BrickSampleStatus::Cancelled => return BrickSampleStatus::Cancelled,
                BrickSampleStatus::Miss => {}
            }
        }

        if let Some(generator) = self.generator {
            let status = VoxelSource::Generator(generator).sample_brick(desc, out, cancel);
            if status == BrickSampleStatus::Hit {
                self.telemetry.bricks_sampled += 1;
                self.telemetry.voxels_sampled += voxel_count;
                self.telemetry.generator_hits += 1;
            }
            return status;
        }

        BrickSampleStatus::Miss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CHUNK_VOLUME;
    use crate::world::core::{BlockId, BlockState, ChunkCoord};
    use crate::world::voxel_source::loaded::ChunkSnapshot;

    #[test]
    fn falls_through_to_generator_on_miss() {
        let loaded = LoadedChunkSource::new(vec![]);
        let generator = GeneratorSource::new(Box::new(|_coord, blocks, _cancel| {
            blocks.iter_mut().for_each(|b| *b = BlockState::new(BlockId::new(4), 0, 0, 0));
        }));

        let mut chain = VoxelSourceChain::new();
        chain.set_loaded(Some(&loaded));
        chain.set_generator(Some(&generator));

        let desc = BrickSampleDesc {
            world_min_voxel: (0, 0, 0),
            brick_dims_voxels: (1, 1, 1),
            step_voxels: 1,
        };
        let mut out = vec![0u16; 1];
        let status = chain.sample_brick(&desc, &mut out, None);
        assert_eq!(status, BrickSampleStatus::Hit);
        assert_eq!(out[0], 4);
        assert_eq!(chain.telemetry().generator_hits, 1);
        assert_eq!(chain.telemetry().loaded_hits, 0);
    }

    #[test]
    fn loaded_takes_priority_over_generator() {
        let coord = ChunkCoord::new(0, 0, 0);
        let mut blocks = vec![BlockState::AIR; CHUNK_VOLUME];
        blocks[0] = BlockState::new(BlockId::new(7), 0, 0, 0);
        let loaded = LoadedChunkSource::new(vec![ChunkSnapshot { coord, blocks }]);
        let generator = GeneratorSource::new(Box::new(|_coord, blocks, _cancel| {
            blocks.iter_mut().for_each(|b| *b = BlockState::new(BlockId::new(99), 0, 0, 0));
        }));

        let mut chain = VoxelSourceChain::new();
        chain.set_loaded(Some(&loaded));
        chain.set_generator(Some(&generator));

        let desc = BrickSampleDesc {
            world_min_voxel: (0, 0, 0),
            brick_dims_voxels: (1, 1, 1),
            step_voxels: 1,
        };
        let mut out = vec![0u16; 1];
        chain.sample_brick(&desc, &mut out, None);
        assert_eq!(out[0], 7);
        assert_eq!(chain.telemetry().loaded_hits, 1);
        assert_eq!(chain.telemetry().generator_hits, 0);
    }
}
