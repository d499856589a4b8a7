//! Owns the resident chunk table, keyed by `ChunkCoord`. Single-threaded: all
//! operations must be externally synchronized.

use crate::error::EngineResult;
use crate::world::core::{world_to_chunk, world_to_local, BlockRegistry, BlockState, ChunkCoord};
use crate::world::storage::Chunk;
use std::collections::HashMap;

pub struct ChunkManager {
    chunks: HashMap<ChunkCoord, Chunk>,
    registry: Option<BlockRegistry>,
}

impl ChunkManager {
    pub fn new() -> Self {
        Self {
            chunks: HashMap::new(),
            registry: None,
        }
    }

    pub fn set_registry(&mut self, registry: BlockRegistry) {
        self.registry = Some(registry);
    }

    pub fn get_chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn get_chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    pub fn get_or_create_chunk(&mut self, coord: ChunkCoord) -> &mut Chunk {
        self.chunks.entry(coord).or_insert_with(|| {
            log::debug!("[CHUNK_MANAGER] created chunk at ({}, {}, {})", coord.x, coord.y, coord.z);
            Chunk::new(coord)
        })
    }

    pub fn has_chunk(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Returns `Air` if the containing chunk is not loaded.
    pub fn get_block(&self, wx: i32, wy: i32, wz: i32) -> BlockState {
        let coord = world_to_chunk(wx, wy, wz);
        match self.chunks.get(&coord) {
            Some(chunk) => {
                let (lx, ly, lz) = world_to_local(wx, wy, wz);
                chunk.get_block(lx, ly, lz)
            }
            None => BlockState::AIR,
        }
    }

    /// Creates the containing chunk if absent, sets the block, then marks
    /// every face-adjacent neighbor chunk dirty that the local coordinate
    /// touches on a chunk boundary.
    pub fn set_block(&mut self, wx: i32, wy: i32, wz: i32, state: BlockState) {
        let coord = world_to_chunk(wx, wy, wz);
        let (lx, ly, lz) = world_to_local(wx, wy, wz);
        let registry = self.registry.as_ref();

        let chunk = self.chunks.entry(coord).or_insert_with(|| Chunk::new(coord));
        if chunk.get_block(lx, ly, lz) == state {
            return;
        }
        chunk.set_block(lx, ly, lz, state, registry);

        let size = crate::constants::CHUNK_SIZE;
        let mut mark = |offset: (i32, i32, i32)| {
            let neighbor = ChunkCoord::new(coord.x + offset.0, coord.y + offset.1, coord.z + offset.2);
            if let Some(chunk) = self.chunks.get_mut(&neighbor) {
                chunk.mark_dirty();
            }
        };

        if lx == 0 {
            mark((-1, 0, 0));
        } else if lx == size - 1 {
            mark((1, 0, 0));
        }
        if ly == 0 {
            mark((0, -1, 0));
        } else if ly == size - 1 {
            mark((0, 1, 0));
        }
        if lz == 0 {
            mark((0, 0, -1));
        } else if lz == size - 1 {
            mark((0, 0, 1));
        }
    }

    /// Replace (or create) the chunk at `coord` from serialized bytes,
    /// overriding the stored coordinate with `coord`.
    pub fn load_chunk(&mut self, coord: ChunkCoord, data: &[u8]) -> EngineResult<()> {
        let decoded = Chunk::deserialize(data)?;
        let mut blocks = [BlockState::AIR; crate::constants::CHUNK_VOLUME];
        decoded.copy_blocks(&mut blocks);

        let mut chunk = Chunk::new(coord);
        chunk.copy_from(&blocks, self.registry.as_ref())?;
        self.chunks.insert(coord, chunk);
        log::debug!("[CHUNK_MANAGER] loaded chunk at ({}, {}, {})", coord.x, coord.y, coord.z);
        Ok(())
    }

    /// Does not save the chunk; callers must persist dirty chunks first.
    pub fn unload_chunk(&mut self, coord: ChunkCoord) {
        if self.chunks.remove(&coord).is_some() {
            log::debug!("[CHUNK_MANAGER] unloaded chunk at ({}, {}, {})", coord.x, coord.y, coord.z);
        }
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    pub fn get_dirty_chunks(&self) -> Vec<ChunkCoord> {
        self.chunks
            .iter()
            .filter(|(_, chunk)| chunk.is_dirty())
            .map(|(coord, _)| *coord)
            .collect()
    }

    pub fn clear_dirty_flags(&mut self) {
        for chunk in self.chunks.values_mut() {
            chunk.clear_dirty();
        }
    }

    pub fn for_each_chunk(&self, mut f: impl FnMut(ChunkCoord, &Chunk)) {
        for (coord, chunk) in &self.chunks {
            f(*coord, chunk);
        }
    }

    pub fn for_each_chunk_mut(&mut self, mut f: impl FnMut(ChunkCoord, &mut Chunk)) {
        for (coord, chunk) in &mut self.chunks {
            f(*coord, chunk);
        }
    }

    pub fn loaded_chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl Default for ChunkManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::core::BlockId;

    #[test]
    fn get_block_in_unloaded_chunk_is_air() {
        let manager = ChunkManager::new();
        assert!(manager.get_block(0, 0, 0).is_air());
    }

    #[test]
    fn boundary_dirty_propagation_marks_existing_neighbor_only() {
        let mut manager = ChunkManager::new();
        manager.get_or_create_chunk(ChunkCoord::new(0, 0, 0));
        manager.get_or_create_chunk(ChunkCoord::new(1, 0, 0));
        manager.clear_dirty_flags();

        // x=31 is the +x boundary of chunk (0,0,0): touches neighbor (1,0,0).
        manager.set_block(31, 0, 0, BlockState::new(BlockId::new(1), 0, 0, 0));

        assert!(manager.get_chunk(ChunkCoord::new(1, 0, 0)).unwrap().is_dirty());
        // No chunk at (-1,0,0), so nothing to mark there; must not panic.
        assert!(manager.get_chunk(ChunkCoord::new(-1, 0, 0)).is_none());
    }

    #[test]
    fn set_block_creates_containing_chunk() {
        let mut manager = ChunkManager::new();
        manager.set_block(5, 5, 5, BlockState::new(BlockId::new(2), 0, 0, 0));
        assert!(manager.has_chunk(ChunkCoord::new(0, 0, 0)));
    }

    #[test]
    fn dirty_chunks_round_trip() {
        let mut manager = ChunkManager::new();
        manager.set_block(0, 0, 0, BlockState::new(BlockId::new(1), 0, 0, 0));
        assert_eq!(manager.get_dirty_chunks(), vec![ChunkCoord::new(0, 0, 0)]);
        manager.clear_dirty_flags();
        assert!(manager.get_dirty_chunks().is_empty());
    }

    #[test]
    fn unload_and_clear() {
        let mut manager = ChunkManager::new();
        manager.get_or_create_chunk(ChunkCoord::new(0, 0, 0));
        manager.unload_chunk(ChunkCoord::new(0, 0, 0));
        assert_eq!(manager.loaded_chunk_count(), 0);

        manager.get_or_create_chunk(ChunkCoord::new(1, 1, 1));
        manager.get_or_create_chunk(ChunkCoord::new(2, 2, 2));
        manager.clear();
        assert_eq!(manager.loaded_chunk_count(), 0);
    }
}
