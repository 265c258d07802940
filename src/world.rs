//! World bundle: configuration, RNG manager, terrain generator and the
//! chunk cache wired together.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::chunk::{build_ghost_border, CacheStats, ChunkCache};
use crate::config::{WorldConfig, WorldConfigSummary};
use crate::error::Result;
use crate::hydrology::{self, RoutingStats};
use crate::rng::RngManager;
use crate::terrain::TerrainGenerator;

pub struct World {
    config: WorldConfig,
    seed: u32,
    rng: RngManager,
    generator: Arc<TerrainGenerator>,
    cache: ChunkCache,
}

/// Aggregate result of one hydrology pass over resident chunks.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct HydrologyPassStats {
    pub chunks_routed: usize,
    pub total_flow_volume: f64,
    pub boundary_outflow: f64,
    pub cells_wetted_by_rain: usize,
}

impl World {
    /// Generate a world: derive placement and noise from the seed, run the
    /// coarse calibration, and register the chunk generator with the cache.
    pub fn generate(config: WorldConfig, seed: u32) -> Result<Self> {
        config.validate()?;
        let mut rng = RngManager::new(seed);

        info!(seed, "generating world");
        let generator = Arc::new(TerrainGenerator::new(
            &mut rng,
            config.world_width_m,
            config.world_height_m,
            config.cell_size_m,
            config.terrain.clone(),
        )?);

        let mut cache = ChunkCache::new(
            config.world_chunks_x(),
            config.world_chunks_y(),
            config.chunk_cells,
            config.max_resident_chunks,
        )?;
        let filler = Arc::clone(&generator);
        cache.set_generator(Box::new(move |chunk| filler.fill_chunk(chunk)));

        Ok(Self {
            config,
            seed,
            rng,
            generator,
            cache,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut RngManager {
        &mut self.rng
    }

    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    pub fn cache(&mut self) -> &mut ChunkCache {
        &mut self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn sea_level_bias_m(&self) -> f64 {
        self.generator.metadata().sea_level_bias_m
    }

    pub fn ocean_fraction(&self) -> f64 {
        self.generator.metadata().ocean_fraction()
    }

    pub fn summary(&self) -> WorldConfigSummary {
        WorldConfigSummary::from(&self.config)
    }

    /// One hydrology pass: optionally rain on resident land, then route
    /// each resident chunk against its ghost border.
    ///
    /// The resident set is snapshotted first; ghost-border construction may
    /// generate neighbors and shuffle the LRU, and the pass must not chase
    /// that.
    pub fn run_hydrology_pass(&mut self, precipitation_m: f32) -> HydrologyPassStats {
        let params = self.config.hydrology;
        let coords = self.cache.resident_coords();
        let mut stats = HydrologyPassStats::default();

        if precipitation_m > 0.0 {
            for &(cx, cy) in &coords {
                let chunk = self.cache.get_chunk(cx as i64, cy as i64);
                stats.cells_wetted_by_rain += hydrology::add_precipitation(chunk, precipitation_m);
            }
        }

        for &(cx, cy) in &coords {
            let ghost = build_ghost_border(&mut self.cache, cx as i64, cy as i64);
            let chunk = self.cache.get_chunk(cx as i64, cy as i64);
            let routed: RoutingStats = hydrology::route_chunk(chunk, Some(&ghost), &params);
            stats.chunks_routed += 1;
            stats.total_flow_volume += routed.total_flow_volume;
            stats.boundary_outflow += routed.halo_outflow;
        }

        stats
    }
}
