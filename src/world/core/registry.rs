//! Thin OOP-style wrapper over `registry_data`/`registry_operations`, kept for
//! call sites that want a method-based handle rather than threading the data
//! struct through free functions by hand.

use super::registry_data::{BlockRegistration, BlockRegistryData, BlockType};
use super::registry_operations as ops;
use super::BlockId;
use crate::error::EngineResult;

pub struct BlockRegistry {
    data: BlockRegistryData,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            data: ops::create_block_registry(),
        }
    }

    pub fn register_block(&mut self, block_type: BlockType) -> EngineResult<BlockId> {
        ops::register_block(&mut self.data, block_type)
    }

    pub fn get_type(&self, id: BlockId) -> Option<&BlockType> {
        ops::get_type(&self.data, id)
    }

    pub fn get_id(&self, identifier: &str) -> Option<BlockId> {
        ops::get_id(&self.data, identifier)
    }

    pub fn get_registrations(&self) -> &[BlockRegistration] {
        ops::get_registrations(&self.data)
    }

    pub fn is_registered(&self, id: BlockId) -> bool {
        ops::is_registered(&self.data, id)
    }

    /// Stable 64-bit hash over normalized registry contents, for change detection.
    pub fn snapshot_hash(&self) -> u64 {
        ops::snapshot_hash(&self.data)
    }

    /// Opacity lookup used by chunk counters; unregistered/air ids are transparent.
    pub fn is_opaque(&self, id: BlockId) -> bool {
        self.get_type(id).map(|t| t.opaque).unwrap_or(false)
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
