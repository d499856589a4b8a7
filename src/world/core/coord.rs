//! Chunk-space coordinate math.

use crate::constants::CHUNK_SIZE;
use std::hash::{Hash, Hasher};

/// Signed 3-vector of chunk indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Hasher matching the spatial-hash primes used by the persistence/region layer
/// upstream of this core; keeps `ChunkCoord` usable as a `HashMap`/`HashSet` key
/// with good spatial distribution instead of the default SipHash.
impl Hash for ChunkCoord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        const PX: i64 = 73_856_093;
        const PY: i64 = 19_349_663;
        const PZ: i64 = 83_492_791;
        let h = (self.x as i64).wrapping_mul(PX)
            ^ (self.y as i64).wrapping_mul(PY)
            ^ (self.z as i64).wrapping_mul(PZ);
        state.write_i64(h);
    }
}

/// Floor division, unlike Rust's default truncating `/`.
fn floor_div(a: i32, b: i32) -> i32 {
    let q = a / b;
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// Non-negative modulo, unlike Rust's default truncating `%`.
fn pos_mod(a: i32, b: i32) -> i32 {
    let r = a % b;
    if r < 0 {
        r + b
    } else {
        r
    }
}

/// World block coordinate to the chunk that contains it.
pub fn world_to_chunk(x: i32, y: i32, z: i32) -> ChunkCoord {
    ChunkCoord::new(
        floor_div(x, CHUNK_SIZE),
        floor_div(y, CHUNK_SIZE),
        floor_div(z, CHUNK_SIZE),
    )
}

/// World block coordinate to its local offset within its chunk, in `[0, CHUNK_SIZE)`.
pub fn world_to_local(x: i32, y: i32, z: i32) -> (i32, i32, i32) {
    (
        pos_mod(x, CHUNK_SIZE),
        pos_mod(y, CHUNK_SIZE),
        pos_mod(z, CHUNK_SIZE),
    )
}

/// Chunk-local coordinate back to world space.
pub fn local_to_world(chunk: ChunkCoord, lx: i32, ly: i32, lz: i32) -> (i32, i32, i32) {
    (
        chunk.x * CHUNK_SIZE + lx,
        chunk.y * CHUNK_SIZE + ly,
        chunk.z * CHUNK_SIZE + lz,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_world_coord_floors_toward_lower_chunk() {
        assert_eq!(world_to_chunk(-1, 0, 0), ChunkCoord::new(-1, 0, 0));
        assert_eq!(world_to_local(-1, 0, 0), (31, 0, 0));
    }

    #[test]
    fn round_trip() {
        for x in [-65, -33, -1, 0, 1, 33, 65] {
            let c = world_to_chunk(x, 0, 0);
            let (lx, _, _) = world_to_local(x, 0, 0);
            let (wx, _, _) = local_to_world(c, lx, 0, 0);
            assert_eq!(wx, x);
        }
    }

    #[test]
    fn chunk_hash_distinguishes_neighbors() {
        use std::collections::hash_map::DefaultHasher;
        let hash_of = |c: ChunkCoord| {
            let mut h = DefaultHasher::new();
            c.hash(&mut h);
            h.finish()
        };
        assert_ne!(hash_of(ChunkCoord::new(0, 0, 0)), hash_of(ChunkCoord::new(1, 0, 0)));
    }
}
