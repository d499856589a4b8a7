//! Chunk Operations - Pure DOP Functions
//!
//! All functions are pure: take data, return results, no side effects.
//! No methods, no self, just transformations.

use super::chunk_data::ChunkData;
use crate::constants::{CHUNK_SIZE, CHUNK_VOLUME, SUBCHUNK_SIZE, SUBCHUNK_VOLUME};
use crate::error::{EngineError, EngineResult};
use crate::world::core::{BlockRegistry, BlockState, ChunkCoord};

const MAGIC: &[u8; 4] = b"RCHK";

/// Index of the subchunk (0..8) containing local coordinate `(lx, ly, lz)`.
fn subchunk_index(lx: i32, ly: i32, lz: i32) -> usize {
    let sx = (lx >> 4) & 1;
    let sy = (ly >> 4) & 1;
    let sz = (lz >> 4) & 1;
    (sx + 2 * sy + 4 * sz) as usize
}

/// Index within a subchunk's flat 16^3 array.
fn local_index(lx: i32, ly: i32, lz: i32) -> usize {
    let x = lx & 15;
    let y = ly & 15;
    let z = lz & 15;
    (x + y * SUBCHUNK_SIZE + z * SUBCHUNK_SIZE * SUBCHUNK_SIZE) as usize
}

/// Dense chunk-local index, used by `serialize`/`deserialize`/`copy_blocks`:
/// `x + y*S + z*S^2`.
pub(crate) fn dense_index(x: i32, y: i32, z: i32) -> usize {
    (x + y * CHUNK_SIZE + z * CHUNK_SIZE * CHUNK_SIZE) as usize
}

pub fn create_chunk(coord: ChunkCoord) -> ChunkData {
    ChunkData {
        coord,
        subchunks: Default::default(),
        non_air_count: 0,
        opaque_count: 0,
        subchunk_non_air: [0; 8],
        subchunk_opaque: [0; 8],
        dirty: false,
        persist_dirty: false,
        world_gen_version: 0,
        mesh_revision: 0,
    }
}

pub fn get_block(data: &ChunkData, x: i32, y: i32, z: i32) -> BlockState {
    debug_assert!((0..CHUNK_SIZE).contains(&x) && (0..CHUNK_SIZE).contains(&y) && (0..CHUNK_SIZE).contains(&z));
    let idx = subchunk_index(x, y, z);
    match &data.subchunks[idx] {
        Some(blocks) => blocks[local_index(x, y, z)],
        None => BlockState::AIR,
    }
}

/// Set a block. No-op if the stored state already equals `state`. Allocates
/// the owning subchunk on first non-air write; frees it once its non-air
/// count returns to zero. Without a registry, opacity counters are left
/// unchanged (opacity tracking degrades gracefully).
pub fn set_block(
    data: &mut ChunkData,
    x: i32,
    y: i32,
    z: i32,
    state: BlockState,
    registry: Option<&BlockRegistry>,
) {
    debug_assert!((0..CHUNK_SIZE).contains(&x) && (0..CHUNK_SIZE).contains(&y) && (0..CHUNK_SIZE).contains(&z));
    let idx = subchunk_index(x, y, z);
    let li = local_index(x, y, z);

    let old = match &data.subchunks[idx] {
        Some(blocks) => blocks[li],
        None => BlockState::AIR,
    };
    if old == state {
        return;
    }

    if !old.is_air() {
        data.subchunk_non_air[idx] -= 1;
        data.non_air_count -= 1;
        if let Some(registry) = registry {
            if registry.is_opaque(old.id) {
                data.subchunk_opaque[idx] -= 1;
                data.opaque_count -= 1;
            }
        }
    }

    if state.is_air() {
        // Subchunk allocation tracks non-air writes only; an air write into an
        // unallocated subchunk has nothing to record.
        if let Some(blocks) = &mut data.subchunks[idx] {
            blocks[li] = state;
        }
    } else {
        let blocks = data.subchunks[idx]
            .get_or_insert_with(|| Box::new([BlockState::AIR; SUBCHUNK_VOLUME]));
        blocks[li] = state;
        data.subchunk_non_air[idx] += 1;
        data.non_air_count += 1;
        if let Some(registry) = registry {
            if registry.is_opaque(state.id) {
                data.subchunk_opaque[idx] += 1;
                data.opaque_count += 1;
            }
        }
    }

    if data.subchunk_non_air[idx] == 0 {
        data.subchunks[idx] = None;
    }

    data.dirty = true;
    data.persist_dirty = true;
    data.mesh_revision += 1;
}

/// Bulk-assign every voxel in the chunk to `state`.
pub fn fill(data: &mut ChunkData, state: BlockState, registry: Option<&BlockRegistry>) {
    for z in 0..CHUNK_SIZE {
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                set_block(data, x, y, z, state, registry);
            }
        }
    }
}

/// Bulk-assign from a dense `x + y*S + z*S^2` ordered buffer.
pub fn copy_from(
    data: &mut ChunkData,
    buf: &[BlockState],
    registry: Option<&BlockRegistry>,
) -> EngineResult<()> {
    if buf.len() != CHUNK_VOLUME {
        return Err(EngineError::InvalidInput(format!(
            "copyFrom buffer length {} != volume {}",
            buf.len(),
            CHUNK_VOLUME
        )));
    }
    for z in 0..CHUNK_SIZE {
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let state = buf[dense_index(x, y, z)];
                set_block(data, x, y, z, state, registry);
            }
        }
    }
    Ok(())
}

/// Materialize the dense `x + y*S + z*S^2` ordered array used by mesh/snapshot
/// consumers.
pub fn copy_blocks(data: &ChunkData, out: &mut [BlockState; CHUNK_VOLUME]) {
    for z in 0..CHUNK_SIZE {
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                out[dense_index(x, y, z)] = get_block(data, x, y, z);
            }
        }
    }
}

pub fn serialize(data: &ChunkData) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 12 + 4 + CHUNK_VOLUME * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&data.coord.x.to_le_bytes());
    out.extend_from_slice(&data.coord.y.to_le_bytes());
    out.extend_from_slice(&data.coord.z.to_le_bytes());
    out.extend_from_slice(&data.world_gen_version.to_le_bytes());
    for z in 0..CHUNK_SIZE {
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let state = get_block(data, x, y, z);
                out.extend_from_slice(bytemuck::bytes_of(&state));
            }
        }
    }
    out
}

/// Accepts the current header (with `worldGenVersion`) and a legacy header
/// that omits it.
pub fn deserialize(bytes: &[u8]) -> EngineResult<ChunkData> {
    if bytes.len() < 4 + 12 {
        return Err(EngineError::Deserialize("chunk data too short".to_string()));
    }
    if &bytes[0..4] != MAGIC {
        return Err(EngineError::Deserialize("bad chunk magic".to_string()));
    }

    let read_i32 = |off: usize| -> i32 {
        i32::from_le_bytes(bytes[off..off + 4].try_into().unwrap())
    };
    let x = read_i32(4);
    let y = read_i32(8);
    let z = read_i32(12);

    let current_header_len = 4 + 12 + 4;
    let legacy_header_len = 4 + 12;
    let payload_len = CHUNK_VOLUME * 4;

    let (world_gen_version, header_len) = if bytes.len() == current_header_len + payload_len {
        (
            u32::from_le_bytes(bytes[16..20].try_into().unwrap()),
            current_header_len,
        )
    } else if bytes.len() == legacy_header_len + payload_len {
        (0u32, legacy_header_len)
    } else {
        return Err(EngineError::Deserialize(format!(
            "unexpected chunk payload length {}",
            bytes.len()
        )));
    };

    let mut chunk = create_chunk(ChunkCoord::new(x, y, z));
    chunk.world_gen_version = world_gen_version;

    let payload = &bytes[header_len..];
    for z in 0..CHUNK_SIZE {
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let off = dense_index(x, y, z) * 4;
                let state: BlockState = *bytemuck::from_bytes(&payload[off..off + 4]);
                set_block(&mut chunk, x, y, z, state, None);
            }
        }
    }
    chunk.dirty = false;
    chunk.persist_dirty = false;
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::core::{BlockId, BlockType, RenderLayer};

    fn registry_with_stone() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        registry
            .register_block(BlockType {
                identifier: "stone".to_string(),
                opaque: true,
                solid: true,
                cull_same_type: true,
                emitted_light: 0,
                light_attenuation: 15,
                render_layer: RenderLayer::Opaque,
                face_textures: std::array::from_fn(|_| "stone".to_string()),
            })
            .unwrap();
        registry
    }

    #[test]
    fn counters_after_fill_minus_one() {
        let registry = registry_with_stone();
        let stone = BlockState::new(BlockId::new(1), 0, 0, 0);
        let mut chunk = create_chunk(ChunkCoord::new(0, 0, 0));
        fill(&mut chunk, stone, Some(&registry));
        set_block(&mut chunk, 0, 0, 0, BlockState::AIR, Some(&registry));

        assert_eq!(chunk.non_air_count as usize, CHUNK_VOLUME - 1);
        assert_eq!(chunk.opaque_count as usize, CHUNK_VOLUME - 1);
    }

    #[test]
    fn counters_match_subchunk_sums() {
        let registry = registry_with_stone();
        let stone = BlockState::new(BlockId::new(1), 0, 0, 0);
        let mut chunk = create_chunk(ChunkCoord::new(0, 0, 0));
        for (x, y, z) in [(0, 0, 0), (17, 0, 0), (0, 17, 0), (5, 5, 20)] {
            set_block(&mut chunk, x, y, z, stone, Some(&registry));
        }
        let sum: u32 = chunk.subchunk_non_air.iter().sum();
        assert_eq!(sum, chunk.non_air_count);
        assert!(chunk.opaque_count <= chunk.non_air_count);
    }

    #[test]
    fn set_block_equal_state_is_noop() {
        let mut chunk = create_chunk(ChunkCoord::new(0, 0, 0));
        let rev = chunk.mesh_revision;
        set_block(&mut chunk, 3, 3, 3, BlockState::AIR, None);
        assert_eq!(chunk.mesh_revision, rev);
    }

    #[test]
    fn subchunk_frees_when_emptied() {
        let stone = BlockState::new(BlockId::new(1), 0, 0, 0);
        let mut chunk = create_chunk(ChunkCoord::new(0, 0, 0));
        set_block(&mut chunk, 0, 0, 0, stone, None);
        assert!(chunk.subchunks[0].is_some());
        set_block(&mut chunk, 0, 0, 0, BlockState::AIR, None);
        assert!(chunk.subchunks[0].is_none());
    }

    #[test]
    fn serialize_round_trip() {
        let stone = BlockState::new(BlockId::new(1), 2, 5, 9);
        let mut chunk = create_chunk(ChunkCoord::new(7, -2, 3));
        chunk.world_gen_version = 42;
        set_block(&mut chunk, 1, 2, 3, stone, None);

        let bytes = serialize(&chunk);
        let restored = deserialize(&bytes).unwrap();

        assert_eq!(restored.coord, chunk.coord);
        assert_eq!(restored.world_gen_version, chunk.world_gen_version);
        assert_eq!(get_block(&restored, 1, 2, 3), stone);
        assert_eq!(restored.non_air_count, chunk.non_air_count);
    }

    #[test]
    fn legacy_header_without_world_gen_version() {
        let mut chunk = create_chunk(ChunkCoord::new(1, 1, 1));
        let bytes = serialize(&chunk);
        chunk.world_gen_version = 0;
        let legacy: Vec<u8> = bytes[0..16].iter().chain(bytes[20..].iter()).copied().collect();
        let restored = deserialize(&legacy).unwrap();
        assert_eq!(restored.coord, chunk.coord);
        assert_eq!(restored.world_gen_version, 0);
    }

    #[test]
    fn copy_from_rejects_wrong_length() {
        let mut chunk = create_chunk(ChunkCoord::new(0, 0, 0));
        let buf = vec![BlockState::AIR; 10];
        assert!(copy_from(&mut chunk, &buf, None).is_err());
    }
}
