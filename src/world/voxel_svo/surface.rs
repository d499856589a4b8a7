//! Far-LOD surface extraction over a page's mip pyramid: macro-voxel grid,
//! per-face quad emission, and greedy quad merging.

use super::mip::value;
use super::page::VoxelPageCpu;
use crate::world::voxel_source::VoxelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Direction {
    const ALL: [Direction; 6] = [
        Direction::PosX,
        Direction::NegX,
        Direction::PosY,
        Direction::NegY,
        Direction::PosZ,
        Direction::NegZ,
    ];

    fn axis(self) -> usize {
        match self {
            Direction::PosX | Direction::NegX => 0,
            Direction::PosY | Direction::NegY => 1,
            Direction::PosZ | Direction::NegZ => 2,
        }
    }

    fn sign(self) -> i32 {
        match self {
            Direction::PosX | Direction::PosY | Direction::PosZ => 1,
            Direction::NegX | Direction::NegY | Direction::NegZ => -1,
        }
    }

    fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::PosX => (1, 0, 0),
            Direction::NegX => (-1, 0, 0),
            Direction::PosY => (0, 1, 0),
            Direction::NegY => (0, -1, 0),
            Direction::PosZ => (0, 0, 1),
            Direction::NegZ => (0, 0, -1),
        }
    }

    pub fn normal(self) -> [f32; 3] {
        let (x, y, z) = self.offset();
        [x as f32, y as f32, z as f32]
    }

    /// Macro-cell axes spanning the face plane, excluding the normal axis.
    fn plane_axes(self) -> (usize, usize) {
        match self.axis() {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryPolicy {
    OutsideEmpty,
    OutsideSolid,
}

#[derive(Debug, Clone, Default)]
pub struct MacroVoxelGrid {
    pub dims: (i32, i32, i32),
    pub cell_size_voxels: i32,
    pub cells: Vec<VoxelId>,
}

impl MacroVoxelGrid {
    pub fn is_empty(&self) -> bool {
        self.dims.0 <= 0 || self.dims.1 <= 0 || self.dims.2 <= 0 || self.cells.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        if self.dims.0 <= 0 || self.dims.1 <= 0 || self.dims.2 <= 0 {
            return 0;
        }
        (self.dims.0 as usize) * (self.dims.1 as usize) * (self.dims.2 as usize)
    }

    fn index(&self, x: i32, y: i32, z: i32) -> usize {
        (x + y * self.dims.0 + z * self.dims.0 * self.dims.1) as usize
    }

    fn get(&self, x: i32, y: i32, z: i32) -> Option<VoxelId> {
        if x < 0 || y < 0 || z < 0 || x >= self.dims.0 || y >= self.dims.1 || z >= self.dims.2 {
            return None;
        }
        Some(self.cells[self.index(x, y, z)])
    }

    fn dim(&self, axis: usize) -> i32 {
        match axis {
            0 => self.dims.0,
            1 => self.dims.1,
            _ => self.dims.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceQuad {
    pub normal: Direction,
    /// Macro-cell coordinate of the quad's minimum corner.
    pub cell_min: (i32, i32, i32),
    /// Span in macro cells (u, v) along the face plane.
    pub span: (i32, i32),
    pub material: VoxelId,
}

#[derive(Default)]
pub struct MacroVoxelNeighbors<'a> {
    pub neg_x: Option<&'a MacroVoxelGrid>,
    pub pos_x: Option<&'a MacroVoxelGrid>,
    pub neg_y: Option<&'a MacroVoxelGrid>,
    pub pos_y: Option<&'a MacroVoxelGrid>,
    pub neg_z: Option<&'a MacroVoxelGrid>,
    pub pos_z: Option<&'a MacroVoxelGrid>,
}

fn is_solid(id: VoxelId) -> bool {
    id != 0
}

fn is_pow2(v: i32) -> bool {
    v > 0 && (v & (v - 1)) == 0
}

/// Builds a macro-voxel grid from `page`'s mip pyramid at `cell_size_voxels`
/// resolution. Non-uniform mip cells use their dominant-value
/// representative, which "fills holes" at far resolution.
pub fn build_macro_grid_from_page(page: &VoxelPageCpu, cell_size_voxels: i32) -> MacroVoxelGrid {
    let mut out = MacroVoxelGrid::default();
    if page.dim <= 0 || page.mips.is_empty() {
        return out;
    }

    let clamped_cell = cell_size_voxels.max(1);
    if page.dim % clamped_cell != 0 || !is_pow2(clamped_cell) {
        return out;
    }

    let mut mip = 0;
    let mut s = clamped_cell;
    while s > 1 {
        s >>= 1;
        mip += 1;
    }

    if mip >= page.mips.levels.len() {
        return out;
    }

    let level = &page.mips.levels[mip];
    if level.is_empty() {
        return out;
    }

    out.dims = (level.dim, level.dim, level.dim);
    out.cell_size_voxels = clamped_cell;
    out.cells = level.cells.iter().map(|&packed| value(packed)).collect();
    out
}

fn sample(
    grid: &MacroVoxelGrid,
    neighbors: Option<&MacroVoxelNeighbors>,
    x: i32,
    y: i32,
    z: i32,
    policy: BoundaryPolicy,
) -> VoxelId {
    if let Some(id) = grid.get(x, y, z) {
        return id;
    }

    if let Some(neighbors) = neighbors {
        let (dims_x, dims_y, dims_z) = grid.dims;
        if x < 0 {
            if let Some(n) = neighbors.neg_x {
                return n.get(n.dims.0 - 1, y, z).unwrap_or(0);
            }
        } else if x >= dims_x {
            if let Some(n) = neighbors.pos_x {
                return n.get(0, y, z).unwrap_or(0);
            }
        } else if y < 0 {
            if let Some(n) = neighbors.neg_y {
                return n.get(x, n.dims.1 - 1, z).unwrap_or(0);
            }
        } else if y >= dims_y {
            if let Some(n) = neighbors.pos_y {
                return n.get(x, 0, z).unwrap_or(0);
            }
        } else if z < 0 {
            if let Some(n) = neighbors.neg_z {
                return n.get(x, y, n.dims.2 - 1).unwrap_or(0);
            }
        } else if z >= dims_z {
            if let Some(n) = neighbors.pos_z {
                return n.get(x, y, 0).unwrap_or(0);
            }
        }
    }

    match policy {
        BoundaryPolicy::OutsideEmpty => 0,
        BoundaryPolicy::OutsideSolid => 1,
    }
}

/// Emits one unit quad per macro-cell face at solid/empty boundaries.
pub fn extract_surface_quads(grid: &MacroVoxelGrid, policy: BoundaryPolicy) -> Vec<SurfaceQuad> {
    let mut out = Vec::new();
    if grid.is_empty() {
        return out;
    }

    let (dx, dy, dz) = grid.dims;
    for z in 0..dz {
        for y in 0..dy {
            for x in 0..dx {
                let id = sample(grid, None, x, y, z, policy);
                if !is_solid(id) {
                    continue;
                }
                for dir in Direction::ALL {
                    let (ox, oy, oz) = dir.offset();
                    if !is_solid(sample(grid, None, x + ox, y + oy, z + oz, policy)) {
                        out.push(SurfaceQuad { normal: dir, cell_min: (x, y, z), span: (1, 1), material: id });
                    }
                }
            }
        }
    }
    out
}

fn greedy_merge(
    grid: &MacroVoxelGrid,
    neighbors: Option<&MacroVoxelNeighbors>,
    policy: BoundaryPolicy,
) -> Vec<SurfaceQuad> {
    let mut out = Vec::new();
    if grid.is_empty() {
        return out;
    }

    let (dx, dy, dz) = grid.dims;
    for z in 0..dz {
        for y in 0..dy {
            for x in 0..dx {
                let id = sample(grid, neighbors, x, y, z, policy);
                if !is_solid(id) {
                    continue;
                }
                for dir in Direction::ALL {
                    let (ox, oy, oz) = dir.offset();
                    if !is_solid(sample(grid, neighbors, x + ox, y + oy, z + oz, policy)) {
                        out.push(SurfaceQuad { normal: dir, cell_min: (x, y, z), span: (1, 1), material: id });
                    }
                }
            }
        }
    }

    merge_coplanar_quads(grid, &out)
}

fn coord(axis: usize, layer: i32, u_axis: usize, u: i32, v_axis: usize, v: i32) -> (i32, i32, i32) {
    let mut parts = [0i32; 3];
    parts[axis] = layer;
    parts[u_axis] = u;
    parts[v_axis] = v;
    (parts[0], parts[1], parts[2])
}

/// Standard greedy meshing: group the unit quads emitted by the non-greedy
/// pass by (normal, layer), build a 2-D material mask per slice, then sweep
/// the mask merging maximal axis-aligned rectangles.
fn merge_coplanar_quads(grid: &MacroVoxelGrid, quads: &[SurfaceQuad]) -> Vec<SurfaceQuad> {
    let mut merged = Vec::new();

    for &dir in &Direction::ALL {
        let axis = dir.axis();
        let (u_axis, v_axis) = dir.plane_axes();
        let u_size = grid.dim(u_axis);
        let v_size = grid.dim(v_axis);
        if u_size <= 0 || v_size <= 0 {
            continue;
        }

        let layer_count = grid.dim(axis).max(0);
        for layer in 0..layer_count {
            let mut mask: Vec<Option<VoxelId>> = vec![None; (u_size as usize) * (v_size as usize)];
            for q in quads.iter().filter(|q| q.normal == dir) {
                let parts = [q.cell_min.0, q.cell_min.1, q.cell_min.2];
                if parts[axis] != layer {
                    continue;
                }
                let u = parts[u_axis];
                let v = parts[v_axis];
                mask[(v * u_size + u) as usize] = Some(q.material);
            }

            for v0 in 0..v_size {
                let mut u0 = 0;
                while u0 < u_size {
                    let idx = (v0 * u_size + u0) as usize;
                    let Some(material) = mask[idx] else {
                        u0 += 1;
                        continue;
                    };

                    let mut w = 1;
                    while u0 + w < u_size && mask[(v0 * u_size + u0 + w) as usize] == Some(material) {
                        w += 1;
                    }

                    let mut h = 1;
                    'grow_v: while v0 + h < v_size {
                        for k in 0..w {
                            if mask[((v0 + h) * u_size + u0 + k) as usize] != Some(material) {
                                break 'grow_v;
                            }
                        }
                        h += 1;
                    }

                    for dv in 0..h {
                        for du in 0..w {
                            mask[((v0 + dv) * u_size + u0 + du) as usize] = None;
                        }
                    }

                    merged.push(SurfaceQuad {
                        normal: dir,
                        cell_min: coord(axis, layer, u_axis, u0, v_axis, v0),
                        span: (w, h),
                        material,
                    });

                    u0 += w;
                }
            }
        }
    }

    merged
}

/// Per-plane greedy merge with no page-seam awareness (the grid's own
/// boundary policy applies at every edge).
pub fn extract_surface_quads_greedy(grid: &MacroVoxelGrid, policy: BoundaryPolicy) -> Vec<SurfaceQuad> {
    greedy_merge(grid, None, policy)
}

/// Greedy merge that samples neighbor grids across page seams instead of
/// falling back to `policy`, preventing double-faced quads at page edges.
pub fn extract_surface_quads_greedy_with_neighbors(
    grid: &MacroVoxelGrid,
    neighbors: &MacroVoxelNeighbors,
    policy: BoundaryPolicy,
) -> Vec<SurfaceQuad> {
    greedy_merge(grid, Some(neighbors), policy)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodVertex {
    pub position: [f32; 3],
    pub normal_index: u8,
    pub ao: u8,
    pub texture_layer: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkMesh {
    pub vertices: Vec<LodVertex>,
    pub indices: Vec<u32>,
}

fn normal_index(dir: Direction) -> u8 {
    match dir {
        Direction::PosX => 0,
        Direction::NegX => 1,
        Direction::PosY => 2,
        Direction::NegY => 3,
        Direction::PosZ => 4,
        Direction::NegZ => 5,
    }
}

/// Fixed per-normal corner order for the 4 vertices of a quad, in
/// (axis, u, v) space relative to `cell_min` with the quad's `span`.
fn quad_corners(dir: Direction, span: (i32, i32)) -> [(i32, i32); 4] {
    let (w, h) = span;
    match dir.sign() {
        1 => [(0, 0), (w, 0), (w, h), (0, h)],
        _ => [(0, 0), (0, h), (w, h), (w, 0)],
    }
}

/// Unoccluded AO level for LOD meshes (near-field meshing computes real AO;
/// far LOD has no per-voxel neighbor data to sample).
pub const LOD_AO_UNOCCLUDED: u8 = 3;

/// Builds a renderable mesh from extracted quads. `face_layer` maps a
/// quad's material and facing direction to its texture array layer.
pub fn build_surface_mesh_from_quads(
    quads: &[SurfaceQuad],
    cell_size_voxels: i32,
    face_layer: impl Fn(VoxelId, Direction) -> u32,
) -> ChunkMesh {
    let mut mesh = ChunkMesh::default();
    let scale = cell_size_voxels.max(1) as f32;

    for quad in quads {
        let axis = quad.normal.axis();
        let (u_axis, v_axis) = quad.normal.plane_axes();
        let depth = if quad.normal.sign() > 0 {
            quad.cell_min_axis(axis) + 1
        } else {
            quad.cell_min_axis(axis)
        };

        let base_index = mesh.vertices.len() as u32;
        let layer = face_layer(quad.material, quad.normal);

        for (cu, cv) in quad_corners(quad.normal, quad.span) {
            let u = quad.cell_min_axis(u_axis) + cu;
            let v = quad.cell_min_axis(v_axis) + cv;
            let (x, y, z) = coord(axis, depth, u_axis, u, v_axis, v);
            mesh.vertices.push(LodVertex {
                position: [x as f32 * scale, y as f32 * scale, z as f32 * scale],
                normal_index: normal_index(quad.normal),
                ao: LOD_AO_UNOCCLUDED,
                texture_layer: layer,
            });
        }

        mesh.indices.extend_from_slice(&[base_index, base_index + 1, base_index + 2, base_index, base_index + 2, base_index + 3]);
    }

    mesh
}

impl SurfaceQuad {
    fn cell_min_axis(&self, axis: usize) -> i32 {
        match axis {
            0 => self.cell_min.0,
            1 => self.cell_min.1,
            _ => self.cell_min.2,
        }
    }
}
