//! `PersistenceSource`: the on-disk tier of the voxel source chain.
//!
//! Holds an access clock and two LRU caches (region -> snapshot, chunk ->
//! decoded blocks or negative marker).

use super::types::{ChunkKey, ChunkRegionSnapshot, PersistenceFormat, RegionKey};
use crate::constants::CHUNK_VOLUME;
use crate::world::core::{BlockState, ChunkCoord};
use crate::world::storage::span::{ChunkSpan, ChunkSpanData};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct RegionEntry {
    snapshot: ChunkRegionSnapshot,
    last_access: u64,
}

struct ChunkEntry {
    /// `None` is the negative marker: this chunk is known not to exist.
    blocks: Option<Vec<BlockState>>,
    last_access: u64,
}

struct Caches {
    region: HashMap<RegionKey, RegionEntry>,
    chunk: HashMap<(String, ChunkCoord), ChunkEntry>,
    clock: u64,
}

pub struct PersistenceSource {
    zone: String,
    format: Arc<dyn PersistenceFormat>,
    max_region_entries: usize,
    max_chunk_entries: usize,
    caches: Mutex<Caches>,
}

impl PersistenceSource {
    pub fn new(zone: String, format: Arc<dyn PersistenceFormat>) -> Self {
        Self {
            zone,
            format,
            max_region_entries: 64,
            max_chunk_entries: 512,
            caches: Mutex::new(Caches {
                region: HashMap::new(),
                chunk: HashMap::new(),
                clock: 0,
            }),
        }
    }

    pub fn set_cache_limits(&mut self, max_regions: usize, max_chunks: usize) {
        self.max_region_entries = max_regions;
        self.max_chunk_entries = max_chunks;
    }

    /// Look up a chunk's decoded blocks, loading and decoding its region on a
    /// cache miss. Returns `None` if the chunk is not persisted.
    pub fn try_load_chunk(&self, coord: ChunkCoord, cancel: &AtomicBool) -> Option<Vec<BlockState>> {
        let cache_key = (self.zone.clone(), coord);

        {
            let mut caches = self.caches.lock();
            caches.clock += 1;
            let clock = caches.clock;
            if let Some(entry) = caches.chunk.get_mut(&cache_key) {
                entry.last_access = clock;
                return entry.blocks.clone();
            }
        }

        if cancel.load(Ordering::Relaxed) {
            return None;
        }

        let region_key = self.format.region_for_chunk(&self.zone, coord);
        let region_snapshot = self.load_region_cached(&region_key);

        if cancel.load(Ordering::Relaxed) {
            return None;
        }

        let storage_keys = self.format.storage_keys_for_chunk(&self.zone, coord);
        let mut blocks: Option<Vec<BlockState>> = None;

        for key in &storage_keys {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            let span = self.format.span_for_storage_key(key);
            if let Some(span_data) = find_span_in_region(&region_snapshot, key) {
                let dense = blocks.get_or_insert_with(|| vec![BlockState::AIR; CHUNK_VOLUME]);
                apply_span_to_dense(dense, &span, &span_data);
            }
        }

        let mut caches = self.caches.lock();
        caches.clock += 1;
        let clock = caches.clock;
        caches.chunk.insert(
            cache_key,
            ChunkEntry {
                blocks: blocks.clone(),
                last_access: clock,
            },
        );
        evict_chunk_cache(&mut caches, self.max_chunk_entries);
        blocks
    }

    fn load_region_cached(&self, key: &RegionKey) -> ChunkRegionSnapshot {
        {
            let mut caches = self.caches.lock();
            caches.clock += 1;
            let clock = caches.clock;
            if let Some(entry) = caches.region.get_mut(key) {
                entry.last_access = clock;
                return entry.snapshot.clone();
            }
        }

        // Load with no lock held: the region backend may perform synchronous I/O.
        let snapshot = self
            .format
            .load_region(key)
            .unwrap_or_default();

        let mut caches = self.caches.lock();
        caches.clock += 1;
        let clock = caches.clock;
        caches.region.insert(
            key.clone(),
            RegionEntry {
                snapshot: snapshot.clone(),
                last_access: clock,
            },
        );
        evict_region_cache(&mut caches, self.max_region_entries);
        snapshot
    }

    /// Drop this chunk's decoded-block cache entry and the region cache entry
    /// that would currently be computed for it.
    pub fn invalidate_chunk(&self, coord: ChunkCoord) {
        let mut caches = self.caches.lock();
        caches.chunk.remove(&(self.zone.clone(), coord));
        let region_key = self.format.region_for_chunk(&self.zone, coord);
        caches.region.remove(&region_key);
    }

    pub fn sample_brick(
        &self,
        desc: &crate::world::voxel_source::desc::BrickSampleDesc,
        out: &mut [crate::world::voxel_source::desc::VoxelId],
        cancel: Option<&AtomicBool>,
    ) -> crate::world::voxel_source::desc::BrickSampleStatus {
        let missing = AtomicBool::new(false);
        crate::world::voxel_source::desc::sample_brick_via_lookup(desc, out, cancel, |coord| {
            self.try_load_chunk(coord, cancel.unwrap_or(&missing))
        })
    }
}

fn find_span_in_region<'a>(
    snapshot: &'a ChunkRegionSnapshot,
    key: &ChunkKey,
) -> Option<&'a ChunkSpanData> {
    snapshot
        .chunks
        .iter()
        .find(|s| s.key == *key)
        .map(|s| &s.data)
}

fn apply_span_to_dense(dense: &mut [BlockState], span: &ChunkSpan, data: &ChunkSpanData) {
    let (ox, oy, oz) = span.offset;
    let (sx, sy, sz) = span.size;
    for z in 0..sz {
        for y in 0..sy {
            for x in 0..sx {
                let wx = ox + x;
                let wy = oy + y;
                let wz = oz + z;
                let idx = (wx + wy * crate::constants::CHUNK_SIZE
                    + wz * crate::constants::CHUNK_SIZE * crate::constants::CHUNK_SIZE)
                    as usize;
                dense[idx] = data.get(x, y, z);
            }
        }
    }
}

fn evict_chunk_cache(caches: &mut Caches, max: usize) {
    while caches.chunk.len() > max {
        let Some(victim) = caches
            .chunk
            .iter()
            .min_by_key(|(_, e)| e.last_access)
            .map(|(k, _)| k.clone())
        else {
            break;
        };
        caches.chunk.remove(&victim);
    }
}

fn evict_region_cache(caches: &mut Caches, max: usize) {
    while caches.region.len() > max {
        let Some(victim) = caches
            .region
            .iter()
            .min_by_key(|(_, e)| e.last_access)
            .map(|(k, _)| k.clone())
        else {
            break;
        };
        caches.region.remove(&victim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::core::BlockId;
    use crate::world::storage::span::ChunkSnapshot;

    struct FakeFormat {
        chunk: ChunkCoord,
        blocks: Vec<BlockState>,
    }

    impl PersistenceFormat for FakeFormat {
        fn region_for_chunk(&self, _zone: &str, _coord: ChunkCoord) -> RegionKey {
            RegionKey { zone: "z".to_string(), x: 0, y: 0, z: 0 }
        }

        fn storage_keys_for_chunk(&self, zone: &str, coord: ChunkCoord) -> Vec<ChunkKey> {
            vec![ChunkKey { zone: zone.to_string(), x: coord.x, y: coord.y, z: coord.z }]
        }

        fn span_for_storage_key(&self, _key: &ChunkKey) -> ChunkSpan {
            ChunkSpan::full(self.chunk)
        }

        fn load_region(&self, _key: &RegionKey) -> Result<ChunkRegionSnapshot, super::super::types::PersistenceError> {
            Ok(ChunkRegionSnapshot {
                key: None,
                chunks: vec![ChunkSnapshot {
                    key: ChunkKey { zone: "z".to_string(), x: self.chunk.x, y: self.chunk.y, z: self.chunk.z },
                    data: ChunkSpanData {
                        span: ChunkSpan::full(self.chunk),
                        blocks: self.blocks.clone(),
                    },
                }],
            })
        }
    }

    #[test]
    fn saved_chunk_hits_return_decoded_voxels() {
        let coord = ChunkCoord::new(1, -2, 3);
        let blocks = vec![BlockState::new(BlockId::new(7), 0, 0, 0); CHUNK_VOLUME];
        let format = Arc::new(FakeFormat { chunk: coord, blocks: blocks.clone() });
        let source = PersistenceSource::new("z".to_string(), format);
        let cancel = AtomicBool::new(false);

        let loaded = source.try_load_chunk(coord, &cancel).unwrap();
        assert_eq!(loaded, blocks);
    }

    #[test]
    fn missing_chunk_returns_none() {
        struct EmptyFormat;
        impl PersistenceFormat for EmptyFormat {
            fn region_for_chunk(&self, _zone: &str, _coord: ChunkCoord) -> RegionKey {
                RegionKey { zone: "z".to_string(), x: 0, y: 0, z: 0 }
            }
            fn storage_keys_for_chunk(&self, _zone: &str, _coord: ChunkCoord) -> Vec<ChunkKey> {
                vec![]
            }
            fn span_for_storage_key(&self, _key: &ChunkKey) -> ChunkSpan {
                ChunkSpan::full(ChunkCoord::new(0, 0, 0))
            }
            fn load_region(&self, _key: &RegionKey) -> Result<ChunkRegionSnapshot, super::super::types::PersistenceError> {
                Ok(ChunkRegionSnapshot::default())
            }
        }
        let source = PersistenceSource::new("z".to_string(), Arc::new(EmptyFormat));
        let cancel = AtomicBool::new(false);
        assert!(source.try_load_chunk(ChunkCoord::new(0, 0, 0), &cancel).is_none());
    }

    #[test]
    fn invalidate_drops_cached_entry() {
        let coord = ChunkCoord::new(0, 0, 0);
        let blocks = vec![BlockState::new(BlockId::new(1), 0, 0, 0); CHUNK_VOLUME];
        let format = Arc::new(FakeFormat { chunk: coord, blocks });
        let source = PersistenceSource::new("z".to_string(), format);
        let cancel = AtomicBool::new(false);
        source.try_load_chunk(coord, &cancel);
        source.invalidate_chunk(coord);
        let caches = source.caches.lock();
        assert!(!caches.chunk.contains_key(&("z".to_string(), coord)));
    }
}
