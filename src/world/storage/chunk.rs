//! Method-based handle over `chunk_data`/`chunk_operations`.

use super::chunk_data::ChunkData;
use super::chunk_operations as ops;
use crate::constants::CHUNK_VOLUME;
use crate::error::EngineResult;
use crate::world::core::{BlockRegistry, BlockState, ChunkCoord};

pub struct Chunk {
    data: ChunkData,
}

impl Chunk {
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            data: ops::create_chunk(coord),
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.data.coord
    }

    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockState {
        ops::get_block(&self.data, x, y, z)
    }

    pub fn set_block(&mut self, x: i32, y: i32, z: i32, state: BlockState, registry: Option<&BlockRegistry>) {
        ops::set_block(&mut self.data, x, y, z, state, registry);
    }

    pub fn fill(&mut self, state: BlockState, registry: Option<&BlockRegistry>) {
        ops::fill(&mut self.data, state, registry);
    }

    pub fn copy_from(&mut self, buf: &[BlockState], registry: Option<&BlockRegistry>) -> EngineResult<()> {
        ops::copy_from(&mut self.data, buf, registry)
    }

    pub fn copy_blocks(&self, out: &mut [BlockState; CHUNK_VOLUME]) {
        ops::copy_blocks(&self.data, out)
    }

    pub fn serialize(&self) -> Vec<u8> {
        ops::serialize(&self.data)
    }

    pub fn deserialize(bytes: &[u8]) -> EngineResult<Self> {
        Ok(Self {
            data: ops::deserialize(bytes)?,
        })
    }

    pub fn non_air_count(&self) -> u32 {
        self.data.non_air_count
    }

    pub fn opaque_count(&self) -> u32 {
        self.data.opaque_count
    }

    pub fn is_empty(&self) -> bool {
        self.data.non_air_count == 0
    }

    pub fn is_dirty(&self) -> bool {
        self.data.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.data.dirty = false;
    }

    pub fn mark_dirty(&mut self) {
        self.data.dirty = true;
    }

    pub fn is_persist_dirty(&self) -> bool {
        self.data.persist_dirty
    }

    pub fn clear_persist_dirty(&mut self) {
        self.data.persist_dirty = false;
    }

    pub fn mesh_revision(&self) -> u64 {
        self.data.mesh_revision
    }

    pub fn world_gen_version(&self) -> u32 {
        self.data.world_gen_version
    }

    pub fn set_world_gen_version(&mut self, version: u32) {
        self.data.world_gen_version = version;
    }
}
