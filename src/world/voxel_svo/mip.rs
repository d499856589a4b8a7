//! Mip pyramid over a page-sized voxel brick: each level collapses 8 child
//! cells into one, tracking whether the collapse is exact (uniform) or a
//! dominant-value approximation.

use crate::world::voxel_source::VoxelId;

const UNIFORM_MASK: u32 = 0x8000_0000;
const VALUE_MASK: u32 = 0x0000_FFFF;

pub fn pack(uniform: bool, value: VoxelId) -> u32 {
    (if uniform { UNIFORM_MASK } else { 0 }) | (value as u32)
}

pub fn is_uniform(packed: u32) -> bool {
    packed & UNIFORM_MASK != 0
}

pub fn value(packed: u32) -> VoxelId {
    (packed & VALUE_MASK) as VoxelId
}

#[derive(Debug, Clone)]
pub struct VoxelMipLevel {
    pub dim: i32,
    pub cells: Vec<u32>,
}

impl VoxelMipLevel {
    pub fn is_empty(&self) -> bool {
        self.dim <= 0 || self.cells.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoxelMipPyramid {
    pub base_dim: i32,
    /// `levels[0]` is L0 (finest); `levels.last()` is the 1^3 root.
    pub levels: Vec<VoxelMipLevel>,
}

impl VoxelMipPyramid {
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

fn is_pow2(v: i32) -> bool {
    v > 0 && (v & (v - 1)) == 0
}

fn cell_index(x: i32, y: i32, z: i32, dim: i32) -> usize {
    (x + y * dim + z * dim * dim) as usize
}

/// Plurality vote over 8 child values; ties resolve to the first value (in
/// fixed child enumeration order) that attains the winning count.
fn dominant_value(values: [VoxelId; 8]) -> VoxelId {
    let mut best = values[0];
    let mut best_count = 1usize;
    for &candidate in &values {
        let count = values.iter().filter(|&&v| v == candidate).count();
        if count > best_count {
            best_count = count;
            best = candidate;
        }
    }
    best
}

/// Builds a pyramid from `l0` (`base_dim`^3 values). Returns an empty pyramid
/// if `base_dim` isn't a power of two or `l0`'s length doesn't match.
pub fn build_mip_pyramid(l0: &[VoxelId], base_dim: i32) -> VoxelMipPyramid {
    let mut out = VoxelMipPyramid::default();
    if base_dim <= 0 || !is_pow2(base_dim) {
        return out;
    }
    let expected = (base_dim as usize).pow(3);
    if l0.len() != expected {
        return out;
    }

    out.base_dim = base_dim;

    let level0 = VoxelMipLevel {
        dim: base_dim,
        cells: l0.iter().map(|&v| pack(true, v)).collect(),
    };
    out.levels.push(level0);

    let mut prev_dim = base_dim;
    while prev_dim > 1 {
        let prev = out.levels.last().unwrap();
        let next_dim = prev_dim / 2;
        let mut cells = vec![0u32; (next_dim as usize).pow(3)];

        for z in 0..next_dim {
            for y in 0..next_dim {
                for x in 0..next_dim {
                    let (bx, by, bz) = (x * 2, y * 2, z * 2);
                    let child_packed = [
                        prev.cells[cell_index(bx, by, bz, prev_dim)],
                        prev.cells[cell_index(bx + 1, by, bz, prev_dim)],
                        prev.cells[cell_index(bx, by + 1, bz, prev_dim)],
                        prev.cells[cell_index(bx + 1, by + 1, bz, prev_dim)],
                        prev.cells[cell_index(bx, by, bz + 1, prev_dim)],
                        prev.cells[cell_index(bx + 1, by, bz + 1, prev_dim)],
                        prev.cells[cell_index(bx, by + 1, bz + 1, prev_dim)],
                        prev.cells[cell_index(bx + 1, by + 1, bz + 1, prev_dim)],
                    ];
                    let all_uniform = child_packed.iter().all(|&p| is_uniform(p));
                    let child_values: [VoxelId; 8] = std::array::from_fn(|i| value(child_packed[i]));
                    let same_value = child_values[1..].iter().all(|&v| v == child_values[0]);

                    let uniform = all_uniform && same_value;
                    let cell_value = if uniform { child_values[0] } else { dominant_value(child_values) };
                    cells[cell_index(x, y, z, next_dim)] = pack(uniform, cell_value);
                }
            }
        }

        out.levels.push(VoxelMipLevel { dim: next_dim, cells });
        prev_dim = next_dim;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dims_return_empty() {
        assert!(build_mip_pyramid(&[1, 2, 3], 3).is_empty());
        assert!(build_mip_pyramid(&[1, 2, 3, 4], 2).is_empty());
    }

    #[test]
    fn uniform_brick_collapses_to_one_root_cell() {
        let l0 = vec![7u16; 8 * 8 * 8];
        let pyramid = build_mip_pyramid(&l0, 8);
        assert_eq!(pyramid.levels.len(), 4); // dims 8,4,2,1
        let root = pyramid.levels.last().unwrap();
        assert_eq!(root.dim, 1);
        assert!(is_uniform(root.cells[0]));
        assert_eq!(value(root.cells[0]), 7);
    }

    #[test]
    fn mixed_brick_uses_dominant_value_tie_break() {
        // 2^3 brick, values tied 4-4 between 1 and 2; first-seen (index 0) wins.
        let l0 = [1u16, 2, 1, 2, 1, 2, 1, 2];
        let pyramid = build_mip_pyramid(&l0, 2);
        let root = &pyramid.levels[1];
        assert_eq!(root.dim, 1);
        assert!(!is_uniform(root.cells[0]));
        assert_eq!(value(root.cells[0]), 1);
    }
}
