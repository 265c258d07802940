//! Procedural terrain pipeline.
//!
//! Raw height is assembled from domain-warped continentalness, coastline
//! detail, mountain-belt ridges and rolling hills, all sampled from
//! label-derived toroidal noise layers. A one-time coarse calibration pass
//! then fixes the sea-level bias (target ocean fraction), the
//! distance-to-coast field and the connected-ocean mask; chunk fillers remap
//! land hypsometrically, carve bathymetry from coast distance and flood
//! connected ocean cells with water up to the zero surface.

pub mod metadata;
pub mod params;
pub mod placement;

pub use metadata::WorldMetadata;
pub use params::TerrainParams;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::chunk::Chunk;
use crate::error::Result;
use crate::noise::TorusNoise;
use crate::rng::{combine_seed, hash_string, RngManager};
use crate::terrain::placement::{
    belt_mask, place_belts, place_centers, smooth_falloff, toroidal_distance, ContinentCenter,
    MountainBelt,
};

/// Continentalness contribution scale per center kind.
const MAJOR_STRENGTH: f64 = 1.0;
const MINOR_STRENGTH: f64 = 0.5;

/// Minimum separation between centers, in radii.
const MAJOR_SEPARATION_FACTOR: f64 = 1.5;
const MINOR_SEPARATION_FACTOR: f64 = 1.0;

pub struct TerrainGenerator {
    world_width_m: f64,
    world_height_m: f64,
    cell_size_m: f64,
    params: TerrainParams,

    continent_noise: TorusNoise,
    warp_x_noise: TorusNoise,
    warp_y_noise: TorusNoise,
    coastline_noise: TorusNoise,
    ridge_noise: TorusNoise,
    hills_noise: TorusNoise,

    continents: Vec<ContinentCenter>,
    belts: Vec<MountainBelt>,

    metadata: WorldMetadata,
}

impl TerrainGenerator {
    /// Build the full pipeline: noise layers, placements, calibration.
    ///
    /// Everything downstream of the same (master seed, extents, params)
    /// is bit-identical across runs.
    pub fn new(
        rng: &mut RngManager,
        world_width_m: f64,
        world_height_m: f64,
        cell_size_m: f64,
        params: TerrainParams,
    ) -> Result<Self> {
        params.validate()?;

        let base_noise = TorusNoise::new(
            combine_seed(rng.master_seed(), hash_string("terrain-noise")),
            world_width_m,
            world_height_m,
        );
        let continent_noise = base_noise.derive("continent");
        let warp_x_noise = base_noise.derive("warpX");
        let warp_y_noise = base_noise.derive("warpY");
        let coastline_noise = base_noise.derive("coastline");
        let ridge_noise = base_noise.derive("ridge");
        let hills_noise = base_noise.derive("hills");

        let placement = rng.stream("placement");

        let mut major_stream = placement.fork("major");
        let majors = place_centers(
            &mut major_stream,
            params.major_continents,
            params.major_radius_km * 1000.0,
            MAJOR_STRENGTH,
            MAJOR_SEPARATION_FACTOR,
            world_width_m,
            world_height_m,
            &[],
        );

        let mut minor_count_stream = placement.fork("minor-count");
        let minor_count = minor_count_stream
            .int(params.minor_continents_min, params.minor_continents_max + 1)?
            as usize;

        let mut minor_stream = placement.fork("minor");
        let minors = place_centers(
            &mut minor_stream,
            minor_count,
            params.minor_radius_km * 1000.0,
            MINOR_STRENGTH,
            MINOR_SEPARATION_FACTOR,
            world_width_m,
            world_height_m,
            &majors,
        );

        let mut main_belt_stream = placement.fork("main-belts");
        let mut belts = place_belts(
            &mut main_belt_stream,
            params.main_belts,
            &majors,
            params.main_belt_length_km,
            params.main_belt_width_km,
            params.main_belt_peak_m,
            world_width_m,
            world_height_m,
        );
        let mut secondary_belt_stream = placement.fork("secondary-belts");
        belts.extend(place_belts(
            &mut secondary_belt_stream,
            params.secondary_belts,
            &majors,
            params.secondary_belt_length_km,
            params.secondary_belt_width_km,
            params.secondary_belt_peak_m,
            world_width_m,
            world_height_m,
        ));

        let mut continents = majors;
        continents.extend(minors);

        let mut generator = Self {
            world_width_m,
            world_height_m,
            cell_size_m,
            params,
            continent_noise,
            warp_x_noise,
            warp_y_noise,
            coastline_noise,
            ridge_noise,
            hills_noise,
            continents,
            belts,
            metadata: WorldMetadata {
                sea_level_bias_m: 0.0,
                coarse_res: 0,
                coarse_land_mask: Vec::new(),
                coast_distance: Vec::new(),
                ocean_mask: Vec::new(),
            },
        };
        generator.calibrate();
        Ok(generator)
    }

    pub fn metadata(&self) -> &WorldMetadata {
        &self.metadata
    }

    pub fn continents(&self) -> &[ContinentCenter] {
        &self.continents
    }

    pub fn belts(&self) -> &[MountainBelt] {
        &self.belts
    }

    /// Continentalness field: falloff sum over centers plus a low-frequency
    /// noise term.
    fn continentalness(&self, x_m: f64, y_m: f64) -> f64 {
        let mut c = 0.0;
        for center in &self.continents {
            let d = toroidal_distance(
                x_m,
                y_m,
                center.x_m,
                center.y_m,
                self.world_width_m,
                self.world_height_m,
            );
            c += center.strength * smooth_falloff(d, center.radius_m);
        }
        c + 0.3
            * self
                .continent_noise
                .fbm(x_m, y_m, 1.0 / (0.3 * self.world_width_m), 3)
    }

    /// Raw (pre-bias) terrain height at world meters (x, y).
    pub fn raw_height(&self, x_m: f64, y_m: f64) -> f64 {
        // Domain warp: re-sample continentalness at a noise-displaced point
        // and mix it with the unwarped value.
        let c0 = self.continentalness(x_m, y_m);
        let amp = 0.4 * self.params.domain_warp_amplitude_km * 1000.0;
        let warp_freq = 1.0 / (0.15 * self.world_width_m);
        let dx = amp * self.warp_x_noise.fbm(x_m, y_m, warp_freq, 3);
        let dy = amp * self.warp_y_noise.fbm(x_m, y_m, warp_freq, 3);
        let c1 = self.continentalness(x_m + dx, y_m + dy);
        let mut c = 0.3 * c0 + 0.7 * c1;

        c += 0.15
            * self.coastline_noise.fbm(
                x_m,
                y_m,
                1.0 / (self.params.coastline_detail_scale_km * 1000.0),
                4,
            );

        let mut height = (c - 0.5) * 4000.0;

        for belt in &self.belts {
            let mask = belt_mask(belt, x_m, y_m, self.world_width_m, self.world_height_m);
            if mask > 0.0 {
                height += mask
                    * belt.peak_m
                    * self.ridge_noise.ridged(x_m, y_m, 1.0 / 50_000.0, 4);
            }
        }

        height + 200.0 * self.hills_noise.fbm_with(x_m, y_m, 1.0 / 20_000.0, 4, 2.2, 0.45)
    }

    /// Sample the coarse grid, fix the sea-level bias and derive the land,
    /// coast-distance and ocean-connectivity fields.
    fn calibrate(&mut self) {
        let r = self.params.coarse_sample_res;
        let w = self.world_width_m;
        let h = self.world_height_m;

        // Each sample is an independent pure function of (seed, position),
        // so the parallel map changes nothing observable.
        let samples: Vec<f64> = (0..r * r)
            .into_par_iter()
            .map(|i| {
                let sx = i % r;
                let sy = i / r;
                let x = (sx as f64 + 0.5) * w / r as f64;
                let y = (sy as f64 + 0.5) * h / r as f64;
                self.raw_height(x, y)
            })
            .collect();

        let bias = metadata::calibrate_sea_level(&samples, self.params.target_ocean_fraction);
        let land_mask = metadata::build_land_mask(&samples, bias);
        let coast_distance = metadata::coast_distance_bfs(&land_mask, r);
        let ocean_mask = metadata::ocean_connectivity(&samples, bias, r);

        self.metadata = WorldMetadata {
            sea_level_bias_m: bias,
            coarse_res: r,
            coarse_land_mask: land_mask,
            coast_distance,
            ocean_mask,
        };

        let achieved = self.metadata.ocean_fraction();
        let target = self.params.target_ocean_fraction;
        info!(
            sea_level_bias_m = bias,
            ocean_fraction = achieved,
            continents = self.continents.len(),
            belts = self.belts.len(),
            "terrain calibrated"
        );
        if (achieved - target).abs() > self.params.ocean_fraction_tolerance {
            warn!(
                achieved,
                target, "ocean fraction drifted outside tolerance"
            );
        }
    }

    /// Compress land heights toward the peaks: `(h / 2*max)^0.4 * max`.
    fn hypsometric_remap(&self, h: f64) -> f64 {
        let max = self.params.max_height_m;
        (h / (2.0 * max)).min(1.0).powf(0.4) * max
    }

    /// Ocean floor depth from distance to coast, blended with a tenth of
    /// the raw (biased) height for local variation. Always <= -1.
    fn bathymetry(&self, h: f64, x_m: f64, y_m: f64) -> f64 {
        let (sx, sy) = self
            .metadata
            .coarse_cell(x_m, y_m, self.world_width_m, self.world_height_m);
        let dist_cells = self.metadata.coast_distance[self.metadata.coarse_index(sx, sy)];
        let cell_km = self.world_width_m / self.metadata.coarse_res as f64 / 1000.0;
        let d_km = dist_cells as f64 * cell_km;

        let p = &self.params;
        let depth = if !d_km.is_finite() || d_km >= 500.0 {
            p.basin_depth_m
        } else if d_km < 50.0 {
            (d_km / 50.0) * p.shelf_depth_m
        } else if d_km < 200.0 {
            let t = (d_km - 50.0) / 150.0;
            p.shelf_depth_m + t * (p.slope_depth_m - p.shelf_depth_m)
        } else {
            let t = (d_km - 200.0) / 300.0;
            p.slope_depth_m + t * (p.basin_depth_m - p.slope_depth_m)
        };

        (depth + 0.1 * (h - depth)).min(-1.0)
    }

    /// Final biased-and-shaped height at world meters (x, y).
    pub fn surface_height(&self, x_m: f64, y_m: f64) -> f64 {
        let h = self.raw_height(x_m, y_m) + self.metadata.sea_level_bias_m;
        let shaped = if h >= 0.0 {
            self.hypsometric_remap(h)
        } else {
            self.bathymetry(h, x_m, y_m)
        };
        shaped.clamp(self.params.min_height_m, self.params.max_height_m)
    }

    /// Fill a chunk's terrain field. Cell centers sample at
    /// `(world_cell + 0.5) * cell_size`.
    pub fn fill_chunk_terrain(&self, chunk: &mut Chunk) {
        let t = chunk.chunk_cells;
        for ly in 0..t {
            for lx in 0..t {
                let world_cell_x = chunk.cx as f64 * t as f64 + lx as f64;
                let world_cell_y = chunk.cy as f64 * t as f64 + ly as f64;
                let x_m = (world_cell_x + 0.5) * self.cell_size_m;
                let y_m = (world_cell_y + 0.5) * self.cell_size_m;
                chunk.terrain_height_m[ly * t + lx] = self.surface_height(x_m, y_m) as f32;
            }
        }
    }

    /// Flood connected-ocean cells with water up to surface zero.
    pub fn fill_chunk_ocean_water(&self, chunk: &mut Chunk) {
        let t = chunk.chunk_cells;
        for ly in 0..t {
            for lx in 0..t {
                let idx = ly * t + lx;
                let h = chunk.terrain_height_m[idx];
                if h >= 0.0 {
                    continue;
                }
                let world_cell_x = chunk.cx as f64 * t as f64 + lx as f64;
                let world_cell_y = chunk.cy as f64 * t as f64 + ly as f64;
                let x_m = (world_cell_x + 0.5) * self.cell_size_m;
                let y_m = (world_cell_y + 0.5) * self.cell_size_m;
                let (sx, sy) = self
                    .metadata
                    .coarse_cell(x_m, y_m, self.world_width_m, self.world_height_m);
                if self.metadata.ocean_mask[self.metadata.coarse_index(sx, sy)] == 1 {
                    chunk.water_depth_m[idx] = -h;
                }
            }
        }
    }

    /// The generator closure registered with the chunk cache: terrain, then
    /// initial ocean water.
    pub fn fill_chunk(&self, chunk: &mut Chunk) {
        self.fill_chunk_terrain(chunk);
        self.fill_chunk_ocean_water(chunk);
    }
}
