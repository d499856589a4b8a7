//! LOD distance-band math shared with the voxel SVO pipeline.
//!
//! GL/GPU upload, the render graph, and windowing are external collaborators
//! per the core's scope and are not part of this crate.

pub mod lod_transition_data;
pub mod lod_transition_operations;

pub use lod_transition_data::{LodCellKey, LodDistanceBands};
pub use lod_transition_operations::{
    chunk_to_lod_cell, compute_far_fade, make_lod_distance_bands, should_render_far_lod,
    should_render_near, touched_lod_cells_for_chunk,
};
