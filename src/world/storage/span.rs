//! Span-scoped chunk payloads, used by the persistence layer to store and
//! reconstruct partial chunk writes. Spans merge by subchunk bit index with
//! a base-fill policy and later-span-wins ordering.

use crate::constants::{CHUNK_SIZE, SUBCHUNK_SIZE};
use crate::error::{EngineError, EngineResult};
use crate::world::core::{BlockRegistry, BlockState, ChunkCoord};
use crate::world::storage::chunk::Chunk;

/// A rectangular sub-volume of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub chunk: ChunkCoord,
    pub offset: (i32, i32, i32),
    pub size: (i32, i32, i32),
}

impl ChunkSpan {
    pub fn full(chunk: ChunkCoord) -> Self {
        Self {
            chunk,
            offset: (0, 0, 0),
            size: (CHUNK_SIZE, CHUNK_SIZE, CHUNK_SIZE),
        }
    }

    pub fn volume(&self) -> usize {
        (self.size.0 * self.size.1 * self.size.2) as usize
    }

    pub fn is_valid(&self) -> bool {
        let (ox, oy, oz) = self.offset;
        let (sx, sy, sz) = self.size;
        ox >= 0
            && oy >= 0
            && oz >= 0
            && sx > 0
            && sy > 0
            && sz > 0
            && ox + sx <= CHUNK_SIZE
            && oy + sy <= CHUNK_SIZE
            && oz + sz <= CHUNK_SIZE
    }

    pub fn is_full(&self) -> bool {
        self.offset == (0, 0, 0) && self.size == (CHUNK_SIZE, CHUNK_SIZE, CHUNK_SIZE)
    }

    /// Whether this span is exactly one of the 8 axis-aligned 16^3 subchunk
    /// volumes, and its subchunk bit index (`sx + sy*2 + sz*4`) if so.
    pub fn subchunk_index(&self) -> Option<usize> {
        let (ox, oy, oz) = self.offset;
        let (sx, sy, sz) = self.size;
        if sx != SUBCHUNK_SIZE || sy != SUBCHUNK_SIZE || sz != SUBCHUNK_SIZE {
            return None;
        }
        if ox % SUBCHUNK_SIZE != 0 || oy % SUBCHUNK_SIZE != 0 || oz % SUBCHUNK_SIZE != 0 {
            return None;
        }
        let bx = ox / SUBCHUNK_SIZE;
        let by = oy / SUBCHUNK_SIZE;
        let bz = oz / SUBCHUNK_SIZE;
        Some((bx + by * 2 + bz * 4) as usize)
    }
}

/// Block data scoped to a `ChunkSpan`, laid out `x + z*sizeX + y*sizeX*sizeZ`
/// (Y outermost, matching the persistence convention — distinct from the
/// `Chunk::serialize` ordering).
#[derive(Debug, Clone)]
pub struct ChunkSpanData {
    pub span: ChunkSpan,
    pub blocks: Vec<BlockState>,
}

impl ChunkSpanData {
    pub fn index(&self, x: i32, y: i32, z: i32) -> usize {
        let (sx, _sy, sz) = self.span.size;
        (x + z * sx + y * sx * sz) as usize
    }

    pub fn get(&self, x: i32, y: i32, z: i32) -> BlockState {
        self.blocks[self.index(x, y, z)]
    }
}

/// A saved chunk fragment identified by its storage key.
#[derive(Debug, Clone)]
pub struct ChunkSnapshot {
    pub key: crate::persistence::types::ChunkKey,
    pub data: ChunkSpanData,
}

/// Result of `merge_chunk_spans`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeResult {
    pub loaded_from_disk: bool,
    pub full_span: bool,
    pub subchunk_mask: u8,
    pub applied_base: bool,
}

/// Apply one `ChunkSpanData` onto a chunk.
fn apply_chunk_data(chunk: &mut Chunk, data: &ChunkSpanData, registry: Option<&BlockRegistry>) {
    let (ox, oy, oz) = data.span.offset;
    let (sx, sy, sz) = data.span.size;
    for z in 0..sz {
        for y in 0..sy {
            for x in 0..sx {
                let state = data.get(x, y, z);
                chunk.set_block(ox + x, oy + y, oz + z, state, registry);
            }
        }
    }
}

/// Compose a chunk from zero or more span snapshots. If no full span exists
/// and the subchunk mask isn't `0xFF`, `base_fill` is invoked first to fill
/// regions no span covers (typically world generation). Every span is then
/// applied in input order; later writes win.
pub fn merge_chunk_spans(
    chunk: &mut Chunk,
    registry: Option<&BlockRegistry>,
    spans: &[ChunkSnapshot],
    base_fill: Option<&dyn Fn(&mut Chunk, Option<&BlockRegistry>)>,
) -> EngineResult<MergeResult> {
    let mut result = MergeResult::default();

    for snapshot in spans {
        if !snapshot.data.span.is_valid() {
            return Err(EngineError::InvalidInput(format!(
                "invalid chunk span: offset={:?} size={:?}",
                snapshot.data.span.offset, snapshot.data.span.size
            )));
        }
        if snapshot.data.span.is_full() {
            result.full_span = true;
        }
        if let Some(bit) = snapshot.data.span.subchunk_index() {
            result.subchunk_mask |= 1 << bit;
        }
    }

    if !result.full_span && result.subchunk_mask != 0xFF {
        if let Some(base_fill) = base_fill {
            base_fill(chunk, registry);
            result.applied_base = true;
        }
    }

    for snapshot in spans {
        apply_chunk_data(chunk, &snapshot.data, registry);
        result.loaded_from_disk = true;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::types::ChunkKey;
    use crate::world::core::BlockId;

    fn snapshot(span: ChunkSpan, fill: BlockState) -> ChunkSnapshot {
        ChunkSnapshot {
            key: ChunkKey {
                zone: "overworld".to_string(),
                x: span.chunk.x,
                y: span.chunk.y,
                z: span.chunk.z,
            },
            data: ChunkSpanData {
                span,
                blocks: vec![fill; span.volume()],
            },
        }
    }

    #[test]
    fn subchunk_span_bit_index() {
        let span = ChunkSpan {
            chunk: ChunkCoord::new(0, 0, 0),
            offset: (16, 0, 16),
            size: (16, 16, 16),
        };
        // sx=1, sy=0, sz=1 -> bit = 1 + 0*2 + 1*4 = 5
        assert_eq!(span.subchunk_index(), Some(5));
    }

    #[test]
    fn full_span_skips_base_fill() {
        let coord = ChunkCoord::new(0, 0, 0);
        let mut chunk = Chunk::new(coord);
        let full = snapshot(ChunkSpan::full(coord), BlockState::new(BlockId::new(1), 0, 0, 0));

        let called = std::cell::Cell::new(false);
        let base_fill = |_: &mut Chunk, _: Option<&BlockRegistry>| called.set(true);

        let result = merge_chunk_spans(&mut chunk, None, &[full], Some(&base_fill)).unwrap();
        assert!(result.full_span);
        assert!(!result.applied_base);
        assert!(!called.get());
    }

    #[test]
    fn partial_coverage_invokes_base_fill() {
        let coord = ChunkCoord::new(0, 0, 0);
        let mut chunk = Chunk::new(coord);
        let partial_span = ChunkSpan {
            chunk: coord,
            offset: (0, 0, 0),
            size: (16, 16, 16),
        };
        let partial = snapshot(partial_span, BlockState::new(BlockId::new(1), 0, 0, 0));

        let called = std::cell::Cell::new(false);
        let base_fill = |_: &mut Chunk, _: Option<&BlockRegistry>| called.set(true);

        let result = merge_chunk_spans(&mut chunk, None, &[partial], Some(&base_fill)).unwrap();
        assert!(result.applied_base);
        assert!(called.get());
        assert_ne!(result.subchunk_mask, 0xFF);
    }

    #[test]
    fn invalid_span_errors() {
        let coord = ChunkCoord::new(0, 0, 0);
        let mut chunk = Chunk::new(coord);
        let bad_span = ChunkSpan {
            chunk: coord,
            offset: (30, 0, 0),
            size: (16, 16, 16),
        };
        let bad = snapshot(bad_span, BlockState::AIR);
        assert!(merge_chunk_spans(&mut chunk, None, &[bad], None).is_err());
    }
}
