//! Adaptive voxel SVO built over a page's mip pyramid: uniform mip cells
//! collapse to Empty/Solid leaves, mixed regions subdivide down to
//! `min_leaf_voxels` before falling back to a coarse representative leaf.

use super::mip::{is_uniform, value};
use super::page::{VoxelPageCpu, VoxelPageKey};
use crate::world::voxel_source::VoxelId;

pub const INVALID_CHILD: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoxelSvoNodeKind {
    Empty,
    Solid,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoxelMaterialClass {
    Air,
    Opaque,
    Cutout,
    Transparent,
}

#[derive(Debug, Clone, Copy)]
pub struct VoxelSvoNode {
    pub kind: VoxelSvoNodeKind,
    pub material_class: VoxelMaterialClass,
    pub material_id: VoxelId,
    /// Power-of-two L0 voxel extent for leaf nodes.
    pub leaf_size_voxels: u16,
    pub child_mask: u8,
    pub children: [u32; 8],
}

impl VoxelSvoNode {
    fn leaf(kind: VoxelSvoNodeKind, material: VoxelId, leaf_size: u16, material_class: VoxelMaterialClass) -> Self {
        Self {
            kind,
            material_class,
            material_id: material,
            leaf_size_voxels: leaf_size,
            child_mask: 0,
            children: [INVALID_CHILD; 8],
        }
    }

    fn mixed() -> Self {
        Self {
            kind: VoxelSvoNodeKind::Mixed,
            material_class: VoxelMaterialClass::Air,
            material_id: 0,
            leaf_size_voxels: 0,
            child_mask: 0,
            children: [INVALID_CHILD; 8],
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind != VoxelSvoNodeKind::Mixed
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoxelPageTree {
    pub key: VoxelPageKey,
    pub dim: i32,
    pub min_leaf_voxels: i32,
    pub root: u32,
    pub nodes: Vec<VoxelSvoNode>,
}

impl VoxelPageTree {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.root == INVALID_CHILD
    }

    pub fn cpu_bytes(&self) -> usize {
        self.nodes.len() * std::mem::size_of::<VoxelSvoNode>()
    }
}

pub trait VoxelMaterialClassifier {
    fn classify(&self, id: VoxelId) -> VoxelMaterialClass;
}

impl<F: Fn(VoxelId) -> VoxelMaterialClass> VoxelMaterialClassifier for F {
    fn classify(&self, id: VoxelId) -> VoxelMaterialClass {
        self(id)
    }
}

fn classify_or_default(classify: Option<&dyn VoxelMaterialClassifier>, id: VoxelId) -> VoxelMaterialClass {
    match classify {
        Some(c) => c.classify(id),
        None => {
            if id == 0 {
                VoxelMaterialClass::Air
            } else {
                VoxelMaterialClass::Opaque
            }
        }
    }
}

fn clamp_pow2(value: i32, min_value: i32) -> i32 {
    let v = value.max(min_value);
    let mut p = 1;
    while p < v {
        p <<= 1;
    }
    p
}

fn log2_pow2(value: i32) -> i32 {
    let mut v = value;
    let mut log = 0;
    while v > 1 {
        v >>= 1;
        log += 1;
    }
    log
}

fn cell_index(x: i32, y: i32, z: i32, dim: i32) -> usize {
    (x + y * dim + z * dim * dim) as usize
}

/// Builds an SVO over `page`'s mip pyramid. Empty regions are omitted from
/// the tree, except when the whole page is empty, in which case the root is
/// a single Empty leaf.
pub fn build_voxel_page_tree(
    page: &VoxelPageCpu,
    min_leaf_voxels: i32,
    classify: Option<&dyn VoxelMaterialClassifier>,
) -> VoxelPageTree {
    let mut out = VoxelPageTree {
        key: page.key,
        dim: page.dim,
        min_leaf_voxels: clamp_pow2(min_leaf_voxels, 1),
        root: INVALID_CHILD,
        nodes: Vec::new(),
    };
    if out.min_leaf_voxels > out.dim {
        out.min_leaf_voxels = out.dim;
    }

    if page.dim <= 0 || page.mips.is_empty() || page.mips.base_dim != page.dim {
        return out;
    }

    let base_dim = page.mips.base_dim;
    let max_mip = page.mips.levels.len() as i32 - 1;
    if max_mip < 0 {
        return out;
    }

    let root_mip = log2_pow2(base_dim);
    if root_mip != max_mip {
        return out;
    }

    fn build_region(
        out: &mut VoxelPageTree,
        page: &VoxelPageCpu,
        classify: Option<&dyn VoxelMaterialClassifier>,
        x0: i32,
        y0: i32,
        z0: i32,
        size: i32,
        is_root: bool,
    ) -> u32 {
        let mip = log2_pow2(size);
        let level = &page.mips.levels[mip as usize];
        let cell_x = x0 >> mip;
        let cell_y = y0 >> mip;
        let cell_z = z0 >> mip;
        let packed = level.cells[cell_index(cell_x, cell_y, cell_z, level.dim)];
        let uniform = is_uniform(packed);
        let rep = value(packed);

        let make_leaf = |out: &mut VoxelPageTree, kind: VoxelSvoNodeKind, material: VoxelId, leaf_size: u16| -> u32 {
            let material_class = if kind == VoxelSvoNodeKind::Solid {
                classify_or_default(classify, material)
            } else {
                VoxelMaterialClass::Air
            };
            let node = VoxelSvoNode::leaf(kind, material, leaf_size, material_class);
            let index = out.nodes.len() as u32;
            out.nodes.push(node);
            index
        };

        if uniform {
            if rep == 0 {
                return if is_root {
                    make_leaf(out, VoxelSvoNodeKind::Empty, 0, size as u16)
                } else {
                    INVALID_CHILD
                };
            }
            return make_leaf(out, VoxelSvoNodeKind::Solid, rep, size as u16);
        }

        if size <= out.min_leaf_voxels {
            if rep == 0 {
                return if is_root {
                    make_leaf(out, VoxelSvoNodeKind::Empty, 0, size as u16)
                } else {
                    INVALID_CHILD
                };
            }
            return make_leaf(out, VoxelSvoNodeKind::Solid, rep, size as u16);
        }

        let half = size / 2;
        let mut child_mask = 0u8;
        let mut children = [INVALID_CHILD; 8];

        for child in 0..8u32 {
            let dx = if child & 1 != 0 { half } else { 0 };
            let dy = if child & 2 != 0 { half } else { 0 };
            let dz = if child & 4 != 0 { half } else { 0 };
            let child_index = build_region(out, page, classify, x0 + dx, y0 + dy, z0 + dz, half, false);
            if child_index == INVALID_CHILD {
                continue;
            }
            child_mask |= 1 << child;
            children[child as usize] = child_index;
        }

        if child_mask == 0 {
            return if is_root {
                make_leaf(out, VoxelSvoNodeKind::Empty, 0, size as u16)
            } else {
                INVALID_CHILD
            };
        }

        let mut node = VoxelSvoNode::mixed();
        node.child_mask = child_mask;
        node.children = children;
        let index = out.nodes.len() as u32;
        out.nodes.push(node);
        index
    }

    out.root = build_region(&mut out, page, classify, 0, 0, 0, base_dim, true);
    if out.root == INVALID_CHILD {
        out.nodes.clear();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::voxel_svo::page::build_voxel_page_cpu;

    #[test]
    fn fully_empty_page_yields_single_empty_root() {
        let l0 = vec![0u16; 8 * 8 * 8];
        let page = build_voxel_page_cpu(VoxelPageKey::default(), &l0, 8);
        let tree = build_voxel_page_tree(&page, 1, None);
        assert!(!tree.is_empty());
        assert_eq!(tree.nodes.len(), 1);
        let root = &tree.nodes[tree.root as usize];
        assert_eq!(root.kind, VoxelSvoNodeKind::Empty);
    }

    #[test]
    fn fully_solid_page_yields_single_solid_root() {
        let l0 = vec![5u16; 8 * 8 * 8];
        let page = build_voxel_page_cpu(VoxelPageKey::default(), &l0, 8);
        let tree = build_voxel_page_tree(&page, 1, None);
        let root = &tree.nodes[tree.root as usize];
        assert_eq!(root.kind, VoxelSvoNodeKind::Solid);
        assert_eq!(root.material_id, 5);
        assert_eq!(root.leaf_size_voxels, 8);
    }

    #[test]
    fn mixed_page_subdivides_to_the_solid_octant_only() {
        let mut l0 = vec![0u16; 8 * 8 * 8];
        l0[0] = 9; // single solid voxel at (0,0,0)
        let page = build_voxel_page_cpu(VoxelPageKey::default(), &l0, 8);
        let tree = build_voxel_page_tree(&page, 1, None);
        assert!(!tree.is_empty());
        let root = &tree.nodes[tree.root as usize];
        assert_eq!(root.kind, VoxelSvoNodeKind::Mixed);
        // Only the octant containing the solid voxel should be present.
        assert_eq!(root.child_mask.count_ones(), 1);
    }

    #[test]
    fn forced_termination_respects_min_leaf_voxels() {
        let mut l0 = vec![0u16; 8 * 8 * 8];
        l0[0] = 9;
        let page = build_voxel_page_cpu(VoxelPageKey::default(), &l0, 8);
        let tree = build_voxel_page_tree(&page, 4, None);
        // No leaf in this tree should be smaller than minLeafVoxels.
        for node in &tree.nodes {
            if node.is_leaf() {
                assert!(node.leaf_size_voxels as i32 >= 4 || node.leaf_size_voxels == 0);
            }
        }
    }
}
