//! LOD Transition Data - Pure DOP
//!
//! NO METHODS beyond trivial constructors. Transformations happen in
//! `lod_transition_operations.rs`.

/// Precomputed world-space distance thresholds for one LOD crossover.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LodDistanceBands {
    pub near_enter_world: f32,
    pub near_exit_world: f32,
    pub far_enter_world: f32,
    pub far_exit_world: f32,
    pub render_distance_world: f32,
}

/// A coarse grid cell used to batch chunk-store dirty edits into page
/// pipeline invalidations. `level` mirrors `VoxelPageKey::level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LodCellKey {
    pub level: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl LodCellKey {
    pub fn new(level: i32, x: i32, y: i32, z: i32) -> Self {
        Self { level, x, y, z }
    }
}
