//! World configuration.
//!
//! Immutable after init. The world is a torus of `world_width_m` by
//! `world_height_m` meters, gridded into square chunks of `chunk_cells`
//! cells of `cell_size_m` meters each; both extents must divide evenly into
//! chunks.

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::hydrology::HydrologyParams;
use crate::scheduler::SchedulerConfig;
use crate::terrain::TerrainParams;

#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// World extent in meters.
    pub world_width_m: f64,
    pub world_height_m: f64,
    /// Side of one land cell in meters.
    pub cell_size_m: f64,
    /// Cells per chunk side (T).
    pub chunk_cells: usize,
    /// Resident chunk budget for the cache.
    pub max_resident_chunks: usize,

    pub terrain: TerrainParams,
    pub hydrology: HydrologyParams,
    pub scheduler: SchedulerConfig,

    /// Game seconds between hydrology passes over resident chunks.
    pub hydrology_cadence_s: f64,
    /// Uniform precipitation applied to land before each hydrology pass,
    /// meters per game day (0 disables).
    pub precipitation_m_per_day: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            // 80 x 40 chunks of 256 km.
            world_width_m: 20_480_000.0,
            world_height_m: 10_240_000.0,
            cell_size_m: 1000.0,
            chunk_cells: 256,
            max_resident_chunks: 64,
            terrain: TerrainParams::default(),
            hydrology: HydrologyParams::default(),
            scheduler: SchedulerConfig::default(),
            hydrology_cadence_s: 3600.0,
            precipitation_m_per_day: 0.005,
        }
    }
}

impl WorldConfig {
    /// Meters per chunk side.
    pub fn chunk_size_m(&self) -> f64 {
        self.chunk_cells as f64 * self.cell_size_m
    }

    pub fn world_chunks_x(&self) -> u32 {
        (self.world_width_m / self.chunk_size_m()) as u32
    }

    pub fn world_chunks_y(&self) -> u32 {
        (self.world_height_m / self.chunk_size_m()) as u32
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.world_width_m > 0.0 && self.world_height_m > 0.0) {
            return Err(EngineError::InvalidConfig(
                "world extent must be positive".into(),
            ));
        }
        if !(self.cell_size_m > 0.0) {
            return Err(EngineError::InvalidConfig(
                "cell size must be positive".into(),
            ));
        }
        if self.chunk_cells == 0 {
            return Err(EngineError::InvalidConfig(
                "chunk side must be positive".into(),
            ));
        }
        if self.max_resident_chunks == 0 {
            return Err(EngineError::InvalidConfig(
                "resident chunk capacity must be positive".into(),
            ));
        }
        let chunk = self.chunk_size_m();
        for (extent, axis) in [(self.world_width_m, "width"), (self.world_height_m, "height")] {
            let chunks = extent / chunk;
            if chunks < 1.0 || (chunks - chunks.round()).abs() > 1e-9 {
                return Err(EngineError::InvalidConfig(format!(
                    "world {axis} {extent} m is not a whole number of {chunk} m chunks"
                )));
            }
        }
        if !(self.hydrology_cadence_s > 0.0 && self.hydrology_cadence_s.is_finite()) {
            return Err(EngineError::InvalidConfig(
                "hydrology cadence must be positive and finite".into(),
            ));
        }
        if !(self.precipitation_m_per_day >= 0.0) {
            return Err(EngineError::InvalidConfig(
                "precipitation must be non-negative".into(),
            ));
        }
        self.terrain.validate()?;
        self.hydrology.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }
}

/// Read-only config summary for the HTTP surface.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct WorldConfigSummary {
    pub world_width_m: f64,
    pub world_height_m: f64,
    pub cell_size_m: f64,
    pub chunk_cells: usize,
    pub world_chunks_x: u32,
    pub world_chunks_y: u32,
    pub max_resident_chunks: usize,
}

impl From<&WorldConfig> for WorldConfigSummary {
    fn from(cfg: &WorldConfig) -> Self {
        Self {
            world_width_m: cfg.world_width_m,
            world_height_m: cfg.world_height_m,
            cell_size_m: cfg.cell_size_m,
            chunk_cells: cfg.chunk_cells,
            world_chunks_x: cfg.world_chunks_x(),
            world_chunks_y: cfg.world_chunks_y(),
            max_resident_chunks: cfg.max_resident_chunks,
        }
    }
}
