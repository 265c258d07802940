//! D8 surface-water router.
//!
//! Water moves from each wet cell toward its single steepest-descent
//! neighbor among the eight surrounding cells, a fraction of the head per
//! sub-step. All reads within a sub-step see pre-step state (moves land in a
//! separate delta buffer), so the scan order never changes the result.
//!
//! At chunk boundaries the router reads a ghost border when given one; flow
//! into the halo leaves this chunk's volume and re-enters the neighbor when
//! that chunk routes against the updated halo. Without a halo, boundary
//! cells simply hold their water.

pub mod params;

pub use params::HydrologyParams;

use crate::chunk::{Chunk, GhostBorder};

/// D8 neighbor offsets in enumeration order N, NE, E, SE, S, SW, W, NW.
/// Ties in surface height break toward the earlier direction.
pub const D8_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Cardinal neighbors carry weight 1, diagonals 1/sqrt(2).
pub const D8_WEIGHTS: [f32; 8] = [
    1.0,
    std::f32::consts::FRAC_1_SQRT_2,
    1.0,
    std::f32::consts::FRAC_1_SQRT_2,
    1.0,
    std::f32::consts::FRAC_1_SQRT_2,
    1.0,
    std::f32::consts::FRAC_1_SQRT_2,
];

/// Accounting for one routing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RoutingStats {
    /// Sum of all flow magnitudes across sub-steps.
    pub total_flow_volume: f64,
    /// Number of distinct cells that sourced at least one flow.
    pub active_cells: usize,
    /// Sub-steps executed.
    pub sub_steps: usize,
    /// Volume that left the chunk into the halo.
    pub halo_outflow: f64,
}

enum FlowTarget {
    Interior(usize),
    Halo,
}

/// Route surface water across one chunk for `params.sub_steps_per_tick`
/// sub-steps. `halo` supplies neighbor surfaces at the boundary; without it,
/// water accumulates at the chunk edge.
pub fn route_chunk(
    chunk: &mut Chunk,
    halo: Option<&GhostBorder>,
    params: &HydrologyParams,
) -> RoutingStats {
    let t = chunk.chunk_cells;
    let cells = t * t;
    let mut delta = vec![0.0f32; cells];
    let mut sourced = vec![false; cells];
    let mut stats = RoutingStats {
        sub_steps: params.sub_steps_per_tick,
        ..RoutingStats::default()
    };

    for _ in 0..params.sub_steps_per_tick {
        delta.fill(0.0);

        for y in 0..t {
            for x in 0..t {
                let idx = y * t + x;
                let water = chunk.water_depth_m[idx];
                if water < params.min_water_depth_m {
                    continue;
                }
                let surface = chunk.terrain_height_m[idx] + water;

                // Steepest-descent scan over the 8 neighbors; first-wins on
                // ties keeps the pick deterministic.
                let mut best: Option<(FlowTarget, f32, f32)> = None;
                for (dir, &(dx, dy)) in D8_OFFSETS.iter().enumerate() {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    let inside =
                        nx >= 0 && ny >= 0 && (nx as usize) < t && (ny as usize) < t;

                    let (target, neighbor_surface) = if inside {
                        let nidx = ny as usize * t + nx as usize;
                        // Pre-delta values: routing reads the sub-step's
                        // starting state only.
                        (
                            FlowTarget::Interior(nidx),
                            chunk.terrain_height_m[nidx] + chunk.water_depth_m[nidx],
                        )
                    } else if let Some(halo) = halo {
                        (
                            FlowTarget::Halo,
                            halo.surface((nx + 1) as usize, (ny + 1) as usize),
                        )
                    } else {
                        continue;
                    };

                    let lower = match &best {
                        None => true,
                        Some((_, best_surface, _)) => neighbor_surface < *best_surface,
                    };
                    if lower {
                        best = Some((target, neighbor_surface, D8_WEIGHTS[dir]));
                    }
                }

                let (target, min_surface, weight) = match best {
                    Some(b) => b,
                    None => continue,
                };
                if min_surface >= surface {
                    continue;
                }

                let flow = water.min((surface - min_surface) * 0.5)
                    * params.flow_fraction
                    * weight;
                if flow < params.min_water_depth_m {
                    continue;
                }

                delta[idx] -= flow;
                match target {
                    FlowTarget::Interior(nidx) => {
                        delta[nidx] += flow;
                        if params.track_runoff_flux {
                            chunk.runoff_flux[nidx] += flow;
                        }
                    }
                    FlowTarget::Halo => {
                        stats.halo_outflow += flow as f64;
                    }
                }
                stats.total_flow_volume += flow as f64;
                sourced[idx] = true;
            }
        }

        for (w, d) in chunk.water_depth_m.iter_mut().zip(delta.iter()) {
            *w = (*w + *d).max(0.0);
        }
    }

    stats.active_cells = sourced.iter().filter(|&&s| s).count();
    stats
}

/// Add `amount_m` of water to every land cell (terrain >= 0).
/// Returns the number of cells wetted.
pub fn add_precipitation(chunk: &mut Chunk, amount_m: f32) -> usize {
    let mut count = 0;
    for i in 0..chunk.cell_count() {
        if chunk.terrain_height_m[i] >= 0.0 {
            chunk.water_depth_m[i] += amount_m;
            count += 1;
        }
    }
    count
}

/// Point source: add water at one local cell.
pub fn add_water_at_cell(
    chunk: &mut Chunk,
    lx: usize,
    ly: usize,
    amount_m: f32,
) -> crate::error::Result<()> {
    if lx >= chunk.chunk_cells || ly >= chunk.chunk_cells {
        return Err(crate::error::EngineError::InvalidArgument(format!(
            "cell ({lx}, {ly}) outside chunk of side {}",
            chunk.chunk_cells
        )));
    }
    let idx = chunk.idx(lx, ly);
    chunk.water_depth_m[idx] += amount_m;
    Ok(())
}

/// Total standing water volume (depth sum) over the chunk.
pub fn total_water_volume(chunk: &Chunk) -> f64 {
    chunk.water_depth_m.iter().map(|&w| w as f64).sum()
}

/// Cells holding at least `threshold` of water.
pub fn count_wet_cells(chunk: &Chunk, threshold: f32) -> usize {
    chunk
        .water_depth_m
        .iter()
        .filter(|&&w| w >= threshold)
        .count()
}
