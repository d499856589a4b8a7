//! Configuration for the voxel SVO pipeline.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelSvoConfig {
    pub enabled: bool,

    pub near_mesh_radius_chunks: i32,
    /// Radius at which the adaptive clipmap begins taking over from the
    /// near-field mesher.
    pub start_radius_chunks: i32,
    pub max_radius_chunks: i32,
    pub transition_band_chunks: i32,

    pub levels: i32,
    pub page_size_voxels: i32,
    pub min_leaf_voxels: i32,

    pub build_budget_pages_per_frame: i32,
    pub apply_budget_pages_per_frame: i32,
    pub upload_budget_pages_per_frame: i32,

    pub max_resident_pages: i32,
    pub max_cpu_bytes: i64,
    pub max_gpu_bytes: i64,

    pub build_threads: usize,
}

impl Default for VoxelSvoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            near_mesh_radius_chunks: 8,
            start_radius_chunks: 16,
            max_radius_chunks: 64,
            transition_band_chunks: 2,
            levels: 4,
            page_size_voxels: 64,
            min_leaf_voxels: 1,
            build_budget_pages_per_frame: 1,
            apply_budget_pages_per_frame: 1,
            upload_budget_pages_per_frame: 1,
            max_resident_pages: 512,
            max_cpu_bytes: 256 * 1024 * 1024,
            max_gpu_bytes: 256 * 1024 * 1024,
            build_threads: 2,
        }
    }
}

fn next_pow2(v: i32) -> i32 {
    let mut p = 1;
    while p < v {
        p <<= 1;
    }
    p
}

impl VoxelSvoConfig {
    /// Clamps out-of-range fields in place, logging each field it changes.
    /// Never panics on bad input.
    pub fn sanitize(&mut self) {
        if self.levels < 1 {
            log::warn!("[VOXEL_SVO_CONFIG] levels {} < 1, clamped to 1", self.levels);
            self.levels = 1;
        } else if self.levels > 16 {
            log::warn!("[VOXEL_SVO_CONFIG] levels {} > 16, clamped to 16", self.levels);
            self.levels = 16;
        }

        let page_size = self.page_size_voxels.clamp(8, 256);
        let page_size = next_pow2(page_size).min(256);
        if page_size != self.page_size_voxels {
            log::warn!(
                "[VOXEL_SVO_CONFIG] pageSizeVoxels {} rounded to {}",
                self.page_size_voxels,
                page_size
            );
            self.page_size_voxels = page_size;
        }

        let min_leaf = next_pow2(self.min_leaf_voxels.max(1)).min(self.page_size_voxels);
        if min_leaf != self.min_leaf_voxels {
            log::warn!(
                "[VOXEL_SVO_CONFIG] minLeafVoxels {} rounded/clamped to {}",
                self.min_leaf_voxels,
                min_leaf
            );
            self.min_leaf_voxels = min_leaf;
        }

        self.near_mesh_radius_chunks = self.near_mesh_radius_chunks.max(0);
        self.transition_band_chunks = self.transition_band_chunks.max(0);

        if self.start_radius_chunks < self.near_mesh_radius_chunks {
            log::warn!(
                "[VOXEL_SVO_CONFIG] startRadiusChunks {} < nearMeshRadiusChunks {}, clamped",
                self.start_radius_chunks,
                self.near_mesh_radius_chunks
            );
            self.start_radius_chunks = self.near_mesh_radius_chunks;
        }
        if self.max_radius_chunks < self.start_radius_chunks {
            log::warn!(
                "[VOXEL_SVO_CONFIG] maxRadiusChunks {} < startRadiusChunks {}, clamped",
                self.max_radius_chunks,
                self.start_radius_chunks
            );
            self.max_radius_chunks = self.start_radius_chunks;
        }

        self.build_budget_pages_per_frame = self.build_budget_pages_per_frame.max(0);
        self.apply_budget_pages_per_frame = self.apply_budget_pages_per_frame.max(0);
        self.upload_budget_pages_per_frame = self.upload_budget_pages_per_frame.max(0);
        self.max_resident_pages = self.max_resident_pages.max(0);
        self.max_cpu_bytes = self.max_cpu_bytes.max(0);
        self.max_gpu_bytes = self.max_gpu_bytes.max(0);
        self.build_threads = self.build_threads.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rounds_page_size_to_power_of_two() {
        let mut cfg = VoxelSvoConfig { page_size_voxels: 60, ..VoxelSvoConfig::default() };
        cfg.sanitize();
        assert_eq!(cfg.page_size_voxels, 64);
    }

    #[test]
    fn sanitize_enforces_radius_ordering() {
        let mut cfg = VoxelSvoConfig {
            near_mesh_radius_chunks: 10,
            start_radius_chunks: 4,
            max_radius_chunks: 2,
            ..VoxelSvoConfig::default()
        };
        cfg.sanitize();
        assert!(cfg.max_radius_chunks >= cfg.start_radius_chunks);
        assert!(cfg.start_radius_chunks >= cfg.near_mesh_radius_chunks);
    }

    #[test]
    fn sanitize_clamps_min_leaf_to_page_size() {
        let mut cfg = VoxelSvoConfig {
            page_size_voxels: 8,
            min_leaf_voxels: 64,
            ..VoxelSvoConfig::default()
        };
        cfg.sanitize();
        assert!(cfg.min_leaf_voxels <= cfg.page_size_voxels);
    }
}
