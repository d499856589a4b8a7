//! LOD Transition Operations - Pure DOP Functions
//!
//! All functions are pure: take data, return results, no side effects.
//! `transitionBandChunks` sets an explicit fade width straddling
//! `nearRadiusWorld`; `startRadiusChunks` (see `VoxelSvoConfig`) is a
//! separate, wider clipmap seeding radius and plays no part in the fade
//! band itself.

use super::lod_transition_data::{LodCellKey, LodDistanceBands};
use crate::constants::CHUNK_SIZE;
use crate::world::core::ChunkCoord;
use crate::world::voxel_svo::VoxelSvoConfig;
use std::collections::HashSet;

/// Builds the near/far distance bands for one frame from the current config.
pub fn make_lod_distance_bands(config: &VoxelSvoConfig, render_distance_world: f32) -> LodDistanceBands {
    let chunk_world = CHUNK_SIZE as f32;
    let near_radius = (config.near_mesh_radius_chunks.max(0) as f32) * chunk_world;
    let band = (config.transition_band_chunks.max(0) as f32) * chunk_world;

    let far_fade_start = (near_radius - band).max(0.0);
    let far_fade_end = far_fade_start.max(near_radius + band);

    LodDistanceBands {
        near_enter_world: near_radius,
        near_exit_world: far_fade_end,
        far_enter_world: far_fade_start,
        far_exit_world: near_radius,
        render_distance_world: render_distance_world.max(0.0),
    }
}

/// Fade ratio for far-LOD geometry: 0 at `far_enter_world`, 1 at
/// `near_exit_world` (`= farFadeEndWorld`). A degenerate (near-zero-width)
/// band collapses to fully visible.
pub fn compute_far_fade(distance_world: f32, bands: &LodDistanceBands) -> f32 {
    let start = bands.far_enter_world;
    let end = bands.near_exit_world;
    let width = end - start;
    if width <= f32::EPSILON {
        return 1.0;
    }
    ((distance_world - start) / width).clamp(0.0, 1.0)
}

/// Hysteresis visibility test for the near mesh.
pub fn should_render_near(distance_sq_world: f32, was_visible: bool, bands: &LodDistanceBands) -> bool {
    if bands.render_distance_world > 0.0 {
        let render_sq = bands.render_distance_world * bands.render_distance_world;
        if distance_sq_world > render_sq {
            return false;
        }
    }

    let near_enter_sq = bands.near_enter_world * bands.near_enter_world;
    if distance_sq_world <= near_enter_sq {
        return true;
    }
    if !was_visible {
        return false;
    }

    let near_exit_sq = bands.near_exit_world * bands.near_exit_world;
    distance_sq_world <= near_exit_sq
}

/// Hysteresis visibility test for the far LOD, symmetric to `should_render_near`.
pub fn should_render_far_lod(distance_sq_world: f32, was_visible: bool, bands: &LodDistanceBands) -> bool {
    if bands.render_distance_world > 0.0 {
        let render_sq = bands.render_distance_world * bands.render_distance_world;
        if distance_sq_world > render_sq {
            return false;
        }
    }

    let far_enter_sq = bands.far_enter_world * bands.far_enter_world;
    if distance_sq_world >= far_enter_sq {
        return true;
    }
    if !was_visible {
        return false;
    }

    let far_exit_sq = bands.far_exit_world * bands.far_exit_world;
    distance_sq_world >= far_exit_sq
}

fn floor_div(a: i32, b: i32) -> i32 {
    let q = a / b;
    let r = a % b;
    if r != 0 && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn pos_mod(a: i32, b: i32) -> i32 {
    let r = a % b;
    if r < 0 {
        r + b
    } else {
        r
    }
}

/// The LOD cell a chunk falls into at `span_chunks` granularity.
pub fn chunk_to_lod_cell(coord: ChunkCoord, span_chunks: i32, lod_level: i32) -> LodCellKey {
    let span = span_chunks.max(1);
    LodCellKey::new(
        lod_level,
        floor_div(coord.x, span),
        floor_div(coord.y, span),
        floor_div(coord.z, span),
    )
}

/// LOD cells touched by an edit to `coord`: the chunk's own cell, plus
/// neighboring cells across any boundary face (or corner) the chunk sits on.
pub fn touched_lod_cells_for_chunk(coord: ChunkCoord, span_chunks: i32, lod_level: i32) -> Vec<LodCellKey> {
    let span = span_chunks.max(1);
    let base = chunk_to_lod_cell(coord, span, lod_level);

    let mut x_offsets = vec![0];
    let mut y_offsets = vec![0];
    let mut z_offsets = vec![0];

    let local_x = pos_mod(coord.x, span);
    let local_y = pos_mod(coord.y, span);
    let local_z = pos_mod(coord.z, span);

    if local_x == 0 {
        x_offsets.push(-1);
    }
    if local_x == span - 1 {
        x_offsets.push(1);
    }
    if local_y == 0 {
        y_offsets.push(-1);
    }
    if local_y == span - 1 {
        y_offsets.push(1);
    }
    if local_z == 0 {
        z_offsets.push(-1);
    }
    if local_z == span - 1 {
        z_offsets.push(1);
    }

    let mut unique = HashSet::new();
    for &dx in &x_offsets {
        for &dy in &y_offsets {
            for &dz in &z_offsets {
                unique.insert(LodCellKey::new(base.level, base.x + dx, base.y + dy, base.z + dz));
            }
        }
    }

    let mut out: Vec<LodCellKey> = unique.into_iter().collect();
    out.sort_by_key(|k| (k.level, k.x, k.y, k.z));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> VoxelSvoConfig {
        VoxelSvoConfig {
            near_mesh_radius_chunks: 8,
            transition_band_chunks: 2,
            ..VoxelSvoConfig::default()
        }
    }

    #[test]
    fn fade_bands_straddle_near_radius_by_transition_band() {
        let bands = make_lod_distance_bands(&test_config(), 0.0);
        assert_eq!(bands.near_enter_world, 256.0);
        assert_eq!(bands.far_enter_world, 192.0);
        assert_eq!(bands.near_exit_world, 320.0);
        assert_eq!(compute_far_fade(256.0, &bands), 0.5);
    }

    #[test]
    fn degenerate_band_collapses_to_fully_visible() {
        let mut cfg = test_config();
        cfg.transition_band_chunks = 0;
        let bands = make_lod_distance_bands(&cfg, 0.0);
        assert_eq!(compute_far_fade(1000.0, &bands), 1.0);
    }

    #[test]
    fn near_hysteresis_extends_with_prior_visibility() {
        let bands = make_lod_distance_bands(&test_config(), 0.0);
        let just_past_enter = bands.near_enter_world + 1.0;
        let dist_sq = just_past_enter * just_past_enter;
        assert!(!should_render_near(dist_sq, false, &bands));
        assert!(should_render_near(dist_sq, true, &bands));
    }

    #[test]
    fn corner_chunk_touches_eight_cells() {
        // span=4: local (3,3,3) sits on the +x/+y/+z boundary of its cell.
        let cells = touched_lod_cells_for_chunk(ChunkCoord::new(3, 3, 3), 4, 0);
        assert_eq!(cells.len(), 8);
    }

    #[test]
    fn interior_chunk_touches_only_its_own_cell() {
        let cells = touched_lod_cells_for_chunk(ChunkCoord::new(1, 1, 1), 4, 0);
        assert_eq!(cells, vec![LodCellKey::new(0, 0, 0, 0)]);
    }
}
