//! Block Registry Operations - Pure DOP Functions
//!
//! All functions are pure: take data, return results, no side effects.
//! No methods, no self, just transformations.

use super::registry_data::{BlockRegistration, BlockRegistryData, BlockType};
use super::BlockId;
use crate::error::{EngineError, EngineResult};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Create new, empty block registry data. Id 0 (`Air`) is implicit and never
/// present in `types`/`registrations` — callers treat any unregistered id as air.
pub fn create_block_registry() -> BlockRegistryData {
    BlockRegistryData {
        types: HashMap::new(),
        name_to_id: HashMap::new(),
        registrations: Vec::new(),
        next_id: 1,
    }
}

/// Register a new block type. Ids are assigned densely starting at 1 in
/// registration order. Rejects a duplicate identifier string.
pub fn register_block(
    data: &mut BlockRegistryData,
    block_type: BlockType,
) -> EngineResult<BlockId> {
    if data.name_to_id.contains_key(&block_type.identifier) {
        return Err(EngineError::InvalidInput(format!(
            "duplicate block identifier: {}",
            block_type.identifier
        )));
    }

    let id = BlockId::new(data.next_id);
    data.next_id += 1;

    log::info!(
        "[BLOCK_REGISTRY] registered '{}' as id {}",
        block_type.identifier,
        id.0
    );

    data.name_to_id.insert(block_type.identifier.clone(), id);
    data.types.insert(id, block_type.clone());
    data.registrations.push(BlockRegistration { id, block_type });

    Ok(id)
}

/// Get a block's schema by id.
pub fn get_type(data: &BlockRegistryData, id: BlockId) -> Option<&BlockType> {
    data.types.get(&id)
}

/// Get a block's id by identifier string.
pub fn get_id(data: &BlockRegistryData, identifier: &str) -> Option<BlockId> {
    data.name_to_id.get(identifier).copied()
}

/// All registered blocks, in registration order.
pub fn get_registrations(data: &BlockRegistryData) -> &[BlockRegistration] {
    &data.registrations
}

pub fn is_registered(data: &BlockRegistryData, id: BlockId) -> bool {
    id.is_air() || data.types.contains_key(&id)
}

fn hash_block_type(block_type: &BlockType) -> u64 {
    let mut h = DefaultHasher::new();
    block_type.identifier.hash(&mut h);
    block_type.opaque.hash(&mut h);
    block_type.solid.hash(&mut h);
    block_type.cull_same_type.hash(&mut h);
    block_type.emitted_light.hash(&mut h);
    block_type.light_attenuation.hash(&mut h);
    std::mem::discriminant(&block_type.render_layer).hash(&mut h);
    for tex in &block_type.face_textures {
        tex.hash(&mut h);
    }
    h.finish()
}

/// Stable 64-bit hash over the registry's normalized contents. Order-independent:
/// registering the same set of blocks in any order yields the same hash, since
/// each entry is hashed on its own schema (never its assigned numeric id) and the
/// per-entry hashes are combined with a commutative fold (XOR).
pub fn snapshot_hash(data: &BlockRegistryData) -> u64 {
    data.types
        .values()
        .map(hash_block_type)
        .fold(0u64, |acc, h| acc ^ h)
}
