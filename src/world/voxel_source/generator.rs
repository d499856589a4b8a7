//! Worker-safe source that synthesizes chunk data via a generator callback.
//! This is the fallback tier of the source chain; a direct density-function
//! sampler could replace it later without touching callers.

use super::desc::{sample_brick_via_lookup, BrickSampleDesc, BrickSampleStatus, VoxelId};
use crate::constants::CHUNK_VOLUME;
use crate::world::core::{BlockState, ChunkCoord};
use std::sync::atomic::AtomicBool;

pub type ChunkGenerateFn = dyn Fn(ChunkCoord, &mut [BlockState], Option<&AtomicBool>) + Send + Sync;

pub struct GeneratorSource {
    generator: Box<ChunkGenerateFn>,
}

impl GeneratorSource {
    pub fn new(generator: Box<ChunkGenerateFn>) -> Self {
        Self { generator }
    }

    pub fn sample_brick(
        &self,
        desc: &BrickSampleDesc,
        out: &mut [VoxelId],
        cancel: Option<&AtomicBool>,
    ) -> BrickSampleStatus {
        sample_brick_via_lookup(desc, out, cancel, |coord| {
            let mut blocks = vec![BlockState::AIR; CHUNK_VOLUME];
            (self.generator)(coord, &mut blocks, cancel);
            Some(blocks)
        })
    }
}
