//! Per-frame build/apply/evict pipeline over voxel pages: seeds a desired
//! page set from camera position, dispatches builds to a worker pool, drains
//! completions through a lock-free queue, and enforces residency budgets.
//!
//! The worker pool uses a dedicated `rayon::ThreadPool` (not the global pool)
//! so it can be resized and joined deterministically on `reset()`, with
//! `crossbeam_channel` as the completion queue.

use super::config::VoxelSvoConfig;
use super::mip::build_mip_pyramid;
use super::page::{VoxelPageCpu, VoxelPageKey};
use super::page_tree::{build_voxel_page_tree, VoxelMaterialClass, VoxelPageTree};
use crate::world::voxel_source::desc::BrickSampleDesc;
use crate::world::voxel_source::generator::GeneratorSource;
use crate::world::voxel_source::loaded::LoadedChunkSource;
use crate::world::voxel_source::{to_voxel_id, BrickSampleStatus, VoxelId, VoxelSourceChain, VOXEL_AIR};
use crate::world::core::BlockRegistry;
use crate::world::management::ChunkManager;
use crate::persistence::PersistenceSource;

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const MAX_LEVELS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Missing,
    QueuedSample,
    BuildingCpu,
    ReadyCpu,
}

pub struct PageRecord {
    pub key: VoxelPageKey,
    pub state: PageState,
    pub desired_revision: u64,
    pub queued_revision: u64,
    pub applied_revision: u64,
    pub node_count: u32,
    pub leaf_min_voxels: u16,
    pub last_touched_frame: u64,
    pub cancel: Arc<AtomicBool>,
    pub cpu: VoxelPageCpu,
    pub tree: VoxelPageTree,
}

impl PageRecord {
    fn new(key: VoxelPageKey, leaf_min_voxels: u16, frame: u64) -> Self {
        Self {
            key,
            state: PageState::Missing,
            desired_revision: 1,
            queued_revision: 0,
            applied_revision: 0,
            node_count: 0,
            leaf_min_voxels,
            last_touched_frame: frame,
            cancel: Arc::new(AtomicBool::new(false)),
            cpu: VoxelPageCpu::default(),
            tree: VoxelPageTree::default(),
        }
    }

    fn to_info(&self) -> VoxelSvoPageInfo {
        VoxelSvoPageInfo {
            key: self.key,
            state: self.state,
            desired_revision: self.desired_revision,
            queued_revision: self.queued_revision,
            applied_revision: self.applied_revision,
            node_count: self.node_count,
            leaf_min_voxels: self.leaf_min_voxels,
            last_touched_frame: self.last_touched_frame,
            cpu_bytes: self.cpu.cpu_bytes(),
        }
    }
}

/// Copied, externally-observable view of a `PageRecord`: no cancel handle and
/// no CPU/tree buffers, so reading it never aliases pipeline-internal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelSvoPageInfo {
    pub key: VoxelPageKey,
    pub state: PageState,
    pub desired_revision: u64,
    pub queued_revision: u64,
    pub applied_revision: u64,
    pub node_count: u32,
    pub leaf_min_voxels: u16,
    pub last_touched_frame: u64,
    pub cpu_bytes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct VoxelSvoTelemetry {
    pub update_calls: u64,
    pub upload_calls: u64,
    pub bricks_sampled: u64,
    pub voxels_sampled: u64,
    pub loaded_hits: u64,
    pub persistence_hits: u64,
    pub generator_hits: u64,
    pub mip_build_micros: u64,
    pub active_pages: u32,
    pub pages_queued: u32,
    pub pages_building: u32,
    pub pages_ready_cpu: u32,
    pub pages_uploaded: u32,
    pub ready_cpu_pages_per_level: [u32; MAX_LEVELS],
    pub ready_cpu_nodes_per_level: [u64; MAX_LEVELS],
    pub cpu_bytes_current: u64,
    pub gpu_bytes_current: u64,
}

struct PageBuildOutput {
    key: VoxelPageKey,
    revision: u64,
    leaf_min_voxels: u16,
    sample_status: BrickSampleStatus,
    sampled_voxels: usize,
    mip_build_micros: u64,
    loaded_hit: bool,
    persistence_hit: bool,
    generator_hit: bool,
    cpu: VoxelPageCpu,
    tree: VoxelPageTree,
}

type Classifier = dyn Fn(VoxelId) -> VoxelMaterialClass + Send + Sync;

/// Owns the resident page table and the build worker pool. Only the thread
/// that calls `update` may mutate `PageRecord`s; worker threads only read
/// immutable, per-build snapshots handed to them at enqueue time.
pub struct VoxelSvoPipeline {
    config: VoxelSvoConfig,
    telemetry: VoxelSvoTelemetry,
    pages: HashMap<VoxelPageKey, PageRecord>,
    build_queued: HashSet<VoxelPageKey>,
    frame_counter: u64,
    pool: Option<rayon::ThreadPool>,
    complete_tx: Sender<PageBuildOutput>,
    complete_rx: Receiver<PageBuildOutput>,
    classify: Arc<Classifier>,
    generator: Option<Arc<GeneratorSource>>,
    persistence: Option<Arc<PersistenceSource>>,
}

impl VoxelSvoPipeline {
    pub fn new(mut config: VoxelSvoConfig) -> Self {
        config.sanitize();
        let (tx, rx) = unbounded();
        Self {
            config,
            telemetry: VoxelSvoTelemetry::default(),
            pages: HashMap::new(),
            build_queued: HashSet::new(),
            frame_counter: 0,
            pool: None,
            complete_tx: tx,
            complete_rx: rx,
            classify: Arc::new(|id| if id == 0 { VoxelMaterialClass::Air } else { VoxelMaterialClass::Opaque }),
            generator: None,
            persistence: None,
        }
    }

    pub fn config(&self) -> &VoxelSvoConfig {
        &self.config
    }

    pub fn set_config(&mut self, mut config: VoxelSvoConfig) {
        config.sanitize();
        if config.build_threads != self.config.build_threads {
            self.pool = None;
        }
        self.config = config;
    }

    /// Resizes the build worker pool, taking effect on the next `update`.
    pub fn set_build_threads(&mut self, threads: usize) {
        let threads = threads.max(1);
        if threads != self.config.build_threads {
            self.config.build_threads = threads;
            self.pool = None;
            log::info!("[VOXEL_SVO] build_threads set to {threads}, pool will rebuild next update");
        }
    }

    pub fn set_classifier(&mut self, classify: Arc<Classifier>) {
        self.classify = classify;
    }

    pub fn set_generator(&mut self, generator: Option<Arc<GeneratorSource>>) {
        self.generator = generator;
    }

    pub fn set_persistence(&mut self, persistence: Option<Arc<PersistenceSource>>) {
        self.persistence = persistence;
    }

    pub fn telemetry(&self) -> &VoxelSvoTelemetry {
        &self.telemetry
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_info(&self, key: &VoxelPageKey) -> Option<VoxelSvoPageInfo> {
        self.pages.get(key).map(PageRecord::to_info)
    }

    /// Appends a copied view of every resident page, for debug overlays.
    pub fn collect_debug_pages(&self, out: &mut Vec<VoxelSvoPageInfo>) {
        out.clear();
        out.extend(self.pages.values().map(PageRecord::to_info));
    }

    fn ensure_build_pool(&mut self) {
        if self.pool.is_none() {
            let threads = self.config.build_threads;
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => self.pool = Some(pool),
                Err(err) => log::error!("[VOXEL_SVO] failed to build worker pool: {err}"),
            }
        }
    }

    /// Eagerly builds the worker pool so the first `update` does not pay for
    /// it mid-frame.
    pub fn initialize(&mut self) {
        self.ensure_build_pool();
        log::info!("[VOXEL_SVO] pipeline initialized with {} build threads", self.config.build_threads);
    }

    /// Binds the pipeline to its collaborators for this call: refreshes the
    /// material classifier from the current registry contents, then enqueues
    /// builds for the desired set seeded by the most recent `update`. Takes
    /// plain references, not stored `Arc`s — nothing here outlives the call
    /// except the owned classifier snapshot captured by value below.
    pub fn bind(&mut self, chunk_manager: &ChunkManager, registry: &BlockRegistry) {
        self.refresh_classifier(registry);
        self.enqueue_builds(chunk_manager);
    }

    fn refresh_classifier(&mut self, registry: &BlockRegistry) {
        let table: HashMap<VoxelId, VoxelMaterialClass> = registry
            .get_registrations()
            .iter()
            .map(|reg| {
                let id = to_voxel_id(reg.id);
                let class = if reg.block_type.opaque { VoxelMaterialClass::Opaque } else { VoxelMaterialClass::Transparent };
                (id, class)
            })
            .collect();

        self.classify = Arc::new(move |id| {
            if id == VOXEL_AIR {
                VoxelMaterialClass::Air
            } else {
                table.get(&id).copied().unwrap_or(VoxelMaterialClass::Opaque)
            }
        });
    }

    /// Drops the worker pool and clears all page state. The pool's threads
    /// are joined as part of dropping it.
    pub fn reset(&mut self) {
        self.pool = None;
        self.pages.clear();
        self.build_queued.clear();
        self.telemetry = VoxelSvoTelemetry::default();
        log::info!("[VOXEL_SVO] pipeline reset");
    }

    /// Seeds the desired page set for each configured level from the camera
    /// position. Keys inside `[start_radius, max_radius]` at each level are
    /// desired; a page's `desired_revision` is bumped whenever it enters the
    /// desired set for the first time (or is touched again this frame).
    pub fn seed_desired_pages(&mut self, camera_pos: (f32, f32, f32)) {
        self.frame_counter += 1;
        let frame = self.frame_counter;
        let page_size = self.config.page_size_voxels;
        let chunk_size = crate::constants::CHUNK_SIZE as f32;

        for level in 0..self.config.levels {
            let world_cell = (page_size as f32) * (1i32 << level) as f32;
            let radius_chunks = self.config.max_radius_chunks as f32;
            let radius_world = radius_chunks * chunk_size;
            let cells_radius = (radius_world / world_cell).ceil() as i32;

            let cam_cx = (camera_pos.0 / world_cell).floor() as i32;
            let cam_cy = (camera_pos.1 / world_cell).floor() as i32;
            let cam_cz = (camera_pos.2 / world_cell).floor() as i32;

            for dz in -cells_radius..=cells_radius {
                for dy in -cells_radius..=cells_radius {
                    for dx in -cells_radius..=cells_radius {
                        let key = VoxelPageKey::new(level, cam_cx + dx, cam_cy + dy, cam_cz + dz);
                        let entry = self
                            .pages
                            .entry(key)
                            .or_insert_with(|| PageRecord::new(key, self.config.min_leaf_voxels as u16, frame));
                        if entry.last_touched_frame != frame {
                            entry.last_touched_frame = frame;
                            if entry.state == PageState::Missing {
                                entry.desired_revision += 1;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Enqueues builds for Missing or stale records, bounded by
    /// `build_budget_pages_per_frame`. Resident-chunk snapshots are taken on
    /// this (the main) thread, since `ChunkManager` is not thread-safe.
    pub fn enqueue_builds(&mut self, chunk_manager: &ChunkManager) {
        self.ensure_build_pool();
        let Some(pool) = self.pool.as_ref() else { return };

        let mut candidates: Vec<VoxelPageKey> = self
            .pages
            .values()
            .filter(|r| r.queued_revision < r.desired_revision)
            .map(|r| r.key)
            .collect();
        candidates.sort_by_key(|k| (k.level, k.x, k.y, k.z));

        let budget = self.config.build_budget_pages_per_frame as usize;
        let page_size = self.config.page_size_voxels;
        for key in candidates.into_iter().take(budget) {
            if self.build_queued.contains(&key) {
                continue;
            }
            let record = self.pages.get_mut(&key).expect("seeded above");
            let revision = record.desired_revision;
            record.state = PageState::QueuedSample;
            record.queued_revision = revision;
            record.cancel = Arc::new(AtomicBool::new(false));
            let cancel = Arc::clone(&record.cancel);
            let leaf_min_voxels = record.leaf_min_voxels;

            self.build_queued.insert(key);

            let step = 1i32 << key.level;
            let desc = BrickSampleDesc {
                world_min_voxel: (key.x * page_size * step, key.y * page_size * step, key.z * page_size * step),
                brick_dims_voxels: (page_size * step, page_size * step, page_size * step),
                step_voxels: step,
            };
            let snapshot = LoadedChunkSource::snapshot_for_brick(chunk_manager, &desc);
            let loaded = Arc::new(LoadedChunkSource::new(snapshot));

            let generator = self.generator.clone();
            let persistence = self.persistence.clone();
            let classify = Arc::clone(&self.classify);
            let tx = self.complete_tx.clone();

            pool.spawn(move || {
                let output = build_page(key, revision, leaf_min_voxels, page_size, &Some(loaded), &generator, &persistence, &classify, &cancel);
                let _ = tx.send(output);
            });
        }
    }

    /// Drains up to `apply_budget_pages_per_frame` completions, installing
    /// fresh results and discarding stale ones.
    pub fn drain_completions(&mut self) {
        let budget = self.config.apply_budget_pages_per_frame;
        let mut applied = 0;
        while applied < budget {
            let output = match self.complete_rx.try_recv() {
                Ok(output) => output,
                Err(_) => break,
            };
            self.build_queued.remove(&output.key);

            self.telemetry.bricks_sampled += (output.sample_status == BrickSampleStatus::Hit) as u64;
            self.telemetry.voxels_sampled += output.sampled_voxels as u64;
            self.telemetry.loaded_hits += output.loaded_hit as u64;
            self.telemetry.persistence_hits += output.persistence_hit as u64;
            self.telemetry.generator_hits += output.generator_hit as u64;
            self.telemetry.mip_build_micros += output.mip_build_micros;

            let Some(record) = self.pages.get_mut(&output.key) else { continue };
            if output.revision < record.desired_revision {
                // A newer revision was requested while this build ran; discard
                // and let the next enqueue pass pick it up again.
                record.state = PageState::Missing;
                applied += 1;
                continue;
            }

            match output.sample_status {
                BrickSampleStatus::Hit => {
                    record.node_count = output.tree.nodes.len() as u32;
                    record.applied_revision = output.revision;
                    record.cpu = output.cpu;
                    record.tree = output.tree;
                    record.state = PageState::ReadyCpu;
                }
                BrickSampleStatus::Miss | BrickSampleStatus::Cancelled => {
                    record.state = PageState::Missing;
                }
            }
            applied += 1;
        }
    }

    /// Evicts records whose `last_touched_frame` is oldest until the page
    /// count and CPU byte budgets are satisfied. Records touched this frame
    /// are never evicted.
    pub fn enforce_page_limit(&mut self) {
        let frame = self.frame_counter;
        let max_pages = self.config.max_resident_pages as usize;
        let max_bytes = self.config.max_cpu_bytes as u64;

        loop {
            let cpu_bytes: u64 = self.pages.values().map(|r| r.cpu.cpu_bytes() as u64).sum();
            if self.pages.len() <= max_pages && cpu_bytes <= max_bytes {
                break;
            }
            let victim = self
                .pages
                .values()
                .filter(|r| r.last_touched_frame != frame)
                .min_by_key(|r| r.last_touched_frame)
                .map(|r| r.key);
            let Some(victim) = victim else { break };
            if let Some(record) = self.pages.remove(&victim) {
                record.cancel.store(true, Ordering::Relaxed);
            }
            self.build_queued.remove(&victim);
        }
    }

    /// Recomputes the gauge-style telemetry fields after apply/evict.
    pub fn update_telemetry(&mut self) {
        self.telemetry.update_calls += 1;
        self.telemetry.active_pages = self.pages.len() as u32;
        self.telemetry.pages_queued = self.pages.values().filter(|r| r.state == PageState::QueuedSample).count() as u32;
        self.telemetry.pages_building = self.pages.values().filter(|r| r.state == PageState::BuildingCpu).count() as u32;
        self.telemetry.pages_ready_cpu = self.pages.values().filter(|r| r.state == PageState::ReadyCpu).count() as u32;
        self.telemetry.cpu_bytes_current = self.pages.values().map(|r| r.cpu.cpu_bytes() as u64).sum();

        let mut per_level_pages = [0u32; MAX_LEVELS];
        let mut per_level_nodes = [0u64; MAX_LEVELS];
        for record in self.pages.values() {
            if record.state != PageState::ReadyCpu {
                continue;
            }
            let level = record.key.level as usize;
            if level < MAX_LEVELS {
                per_level_pages[level] += 1;
                per_level_nodes[level] += record.node_count as u64;
            }
        }
        self.telemetry.ready_cpu_pages_per_level = per_level_pages;
        self.telemetry.ready_cpu_nodes_per_level = per_level_nodes;
    }

    /// One camera-driven frame step: seed, drain, evict, telemetry. Does not
    /// touch `ChunkManager`; call `bind` (before or after, per frame) to
    /// enqueue builds against the desired set this seeds.
    pub fn update(&mut self, camera_pos: (f32, f32, f32)) {
        self.seed_desired_pages(camera_pos);
        self.drain_completions();
        self.enforce_page_limit();
        self.update_telemetry();
    }

    /// Counts GPU bytes and upload calls only; no GPU resources exist in
    /// this CPU-only core.
    pub fn upload_render_resources(&mut self) {
        self.telemetry.upload_calls += 1;
        self.telemetry.pages_uploaded = self.telemetry.pages_ready_cpu;
    }

    /// Releases render-side resources; resets the upload gauges since no
    /// real GPU resources exist in this CPU-only core.
    pub fn release_render_resources(&mut self) {
        self.telemetry.pages_uploaded = 0;
        self.telemetry.gpu_bytes_current = 0;
    }
}

#[allow(clippy::too_many_arguments)]
fn build_page(
    key: VoxelPageKey,
    revision: u64,
    leaf_min_voxels: u16,
    page_size: i32,
    loaded: &Option<Arc<LoadedChunkSource>>,
    generator: &Option<Arc<GeneratorSource>>,
    persistence: &Option<Arc<PersistenceSource>>,
    classify: &Arc<Classifier>,
    cancel: &Arc<AtomicBool>,
) -> PageBuildOutput {
    let step = 1i32 << key.level;
    let desc = BrickSampleDesc {
        world_min_voxel: (key.x * page_size * step, key.y * page_size * step, key.z * page_size * step),
        brick_dims_voxels: (page_size * step, page_size * step, page_size * step),
        step_voxels: step,
    };

    let mut chain = VoxelSourceChain::new();
    if let Some(l) = loaded {
        chain.set_loaded(Some(l.as_ref()));
    }
    if let Some(p) = persistence {
        chain.set_persistence(Some(p.as_ref()));
    }
    if let Some(g) = generator {
        chain.set_generator(Some(g.as_ref()));
    }

    let mut out = vec![0u16; desc.out_voxel_count()];
    let status = chain.sample_brick(&desc, &mut out, Some(cancel.as_ref()));
    let telem = chain.telemetry();

    if status != BrickSampleStatus::Hit {
        return PageBuildOutput {
            key,
            revision,
            leaf_min_voxels,
            sample_status: status,
            sampled_voxels: 0,
            mip_build_micros: 0,
            loaded_hit: false,
            persistence_hit: false,
            generator_hit: false,
            cpu: VoxelPageCpu::default(),
            tree: VoxelPageTree::default(),
        };
    }

    let build_start = std::time::Instant::now();
    let mips = build_mip_pyramid(&out, page_size);
    let mip_build_micros = build_start.elapsed().as_micros() as u64;
    let cpu = VoxelPageCpu { key, dim: page_size, l0: out, mips };

    let classifier = classify.as_ref();
    let tree = build_voxel_page_tree(&cpu, leaf_min_voxels as i32, Some(&|id: VoxelId| classifier(id)));

    PageBuildOutput {
        key,
        revision,
        leaf_min_voxels,
        sample_status: BrickSampleStatus::Hit,
        sampled_voxels: desc.out_voxel_count(),
        mip_build_micros,
        loaded_hit: telem.loaded_hits > 0,
        persistence_hit: telem.persistence_hits > 0,
        generator_hit: telem.generator_hits > 0,
        cpu,
        tree,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::core::BlockId;
    use crate::world::voxel_source::generator::GeneratorSource;

    fn test_config() -> VoxelSvoConfig {
        VoxelSvoConfig {
            page_size_voxels: 8,
            levels: 1,
            max_radius_chunks: 1,
            start_radius_chunks: 1,
            near_mesh_radius_chunks: 1,
            build_threads: 1,
            build_budget_pages_per_frame: 64,
            apply_budget_pages_per_frame: 64,
            max_resident_pages: 4096,
            ..VoxelSvoConfig::default()
        }
    }

    #[test]
    fn update_builds_and_applies_pages_from_generator() {
        let mut pipeline = VoxelSvoPipeline::new(test_config());
        let generator = Arc::new(GeneratorSource::new(Box::new(|_coord, blocks, _cancel| {
            blocks.iter_mut().for_each(|b| *b = crate::world::core::BlockState::new(BlockId::new(3), 0, 0, 0));
        })));
        pipeline.set_generator(Some(generator));

        let chunk_manager = ChunkManager::new();
        let registry = crate::world::core::BlockRegistry::new();
        for _ in 0..4 {
            pipeline.update((0.0, 0.0, 0.0));
            pipeline.bind(&chunk_manager, &registry);
            if pipeline.telemetry().pages_ready_cpu > 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert!(pipeline.telemetry().pages_ready_cpu > 0);
        assert!(pipeline.telemetry().generator_hits > 0);
    }

    #[test]
    fn reset_clears_page_table() {
        let mut pipeline = VoxelSvoPipeline::new(test_config());
        pipeline.seed_desired_pages((0.0, 0.0, 0.0));
        assert!(pipeline.page_count() > 0);
        pipeline.reset();
        assert_eq!(pipeline.page_count(), 0);
    }

    #[test]
    fn page_info_copies_fields_for_a_seeded_page() {
        let mut pipeline = VoxelSvoPipeline::new(test_config());
        pipeline.seed_desired_pages((0.0, 0.0, 0.0));
        let key = VoxelPageKey::new(0, 0, 0, 0);
        let info = pipeline.page_info(&key).expect("seeded at the origin");
        assert_eq!(info.key, key);
        assert_eq!(info.state, PageState::Missing);
    }

    #[test]
    fn collect_debug_pages_matches_page_count() {
        let mut pipeline = VoxelSvoPipeline::new(test_config());
        pipeline.seed_desired_pages((0.0, 0.0, 0.0));
        let mut out = Vec::new();
        pipeline.collect_debug_pages(&mut out);
        assert_eq!(out.len(), pipeline.page_count());
    }

    #[test]
    fn set_build_threads_invalidates_the_existing_pool() {
        let mut pipeline = VoxelSvoPipeline::new(test_config());
        pipeline.initialize();
        assert!(pipeline.pool.is_some());
        pipeline.set_build_threads(4);
        assert!(pipeline.pool.is_none());
        assert_eq!(pipeline.config().build_threads, 4);
    }

    #[test]
    fn bind_classifies_registered_opaque_blocks() {
        let mut pipeline = VoxelSvoPipeline::new(test_config());
        let chunk_manager = ChunkManager::new();
        let mut registry = crate::world::core::BlockRegistry::new();
        let id = registry
            .register_block(crate::world::core::BlockType {
                identifier: "stone".to_string(),
                opaque: true,
                solid: true,
                cull_same_type: true,
                emitted_light: 0,
                light_attenuation: 15,
                render_layer: crate::world::core::RenderLayer::Opaque,
                face_textures: Default::default(),
            })
            .expect("register succeeds");

        pipeline.bind(&chunk_manager, &registry);
        let voxel_id = to_voxel_id(id);
        assert_eq!((pipeline.classify)(voxel_id), VoxelMaterialClass::Opaque);
        assert_eq!((pipeline.classify)(VOXEL_AIR), VoxelMaterialClass::Air);
    }
}
