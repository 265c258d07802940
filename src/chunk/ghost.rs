//! Ghost-border construction.
//!
//! A routing pass over one chunk needs the surface height of cells just
//! outside it. The ghost border is a (T+2)^2 padded copy of terrain and
//! water: interior from the center chunk, edge strips from the four cardinal
//! neighbors, corners from the single adjacent cell of each diagonal
//! neighbor. Neighbor lookups go through the cache, so they wrap toroidally
//! and may trigger generation.

use crate::chunk::cache::ChunkCache;

/// Read-only padded view used by the hydrology router.
pub struct GhostBorder {
    /// Cells per side of the center chunk (T).
    pub chunk_cells: usize,
    /// Padded side length (T + 2).
    pub padded_size: usize,
    pub terrain_height_m: Vec<f32>,
    pub water_depth_m: Vec<f32>,
}

impl GhostBorder {
    #[inline]
    pub fn idx(&self, px: usize, py: usize) -> usize {
        py * self.padded_size + px
    }

    /// Water surface elevation at a padded coordinate.
    #[inline]
    pub fn surface(&self, px: usize, py: usize) -> f32 {
        let i = self.idx(px, py);
        self.terrain_height_m[i] + self.water_depth_m[i]
    }
}

/// Build the halo for chunk (cx, cy).
///
/// Each neighbor is fetched once and its boundary cells copied out before
/// the next fetch, so LRU eviction between fetches cannot invalidate
/// anything already captured.
pub fn build_ghost_border(cache: &mut ChunkCache, cx: i64, cy: i64) -> GhostBorder {
    let t = cache.chunk_cells();
    let padded = t + 2;
    let mut ghost = GhostBorder {
        chunk_cells: t,
        padded_size: padded,
        terrain_height_m: vec![0.0; padded * padded],
        water_depth_m: vec![0.0; padded * padded],
    };

    // Center interior.
    {
        let center = cache.get_chunk(cx, cy);
        for ly in 0..t {
            for lx in 0..t {
                let src = ly * t + lx;
                let dst = (ly + 1) * padded + (lx + 1);
                ghost.terrain_height_m[dst] = center.terrain_height_m[src];
                ghost.water_depth_m[dst] = center.water_depth_m[src];
            }
        }
    }

    // North neighbor's bottom row -> padded row 0.
    {
        let north = cache.get_chunk(cx, cy - 1);
        for lx in 0..t {
            let src = (t - 1) * t + lx;
            let dst = lx + 1;
            ghost.terrain_height_m[dst] = north.terrain_height_m[src];
            ghost.water_depth_m[dst] = north.water_depth_m[src];
        }
    }

    // South neighbor's top row -> padded row T+1.
    {
        let south = cache.get_chunk(cx, cy + 1);
        for lx in 0..t {
            let src = lx;
            let dst = (t + 1) * padded + (lx + 1);
            ghost.terrain_height_m[dst] = south.terrain_height_m[src];
            ghost.water_depth_m[dst] = south.water_depth_m[src];
        }
    }

    // West neighbor's right column -> padded column 0.
    {
        let west = cache.get_chunk(cx - 1, cy);
        for ly in 0..t {
            let src = ly * t + (t - 1);
            let dst = (ly + 1) * padded;
            ghost.terrain_height_m[dst] = west.terrain_height_m[src];
            ghost.water_depth_m[dst] = west.water_depth_m[src];
        }
    }

    // East neighbor's left column -> padded column T+1.
    {
        let east = cache.get_chunk(cx + 1, cy);
        for ly in 0..t {
            let src = ly * t;
            let dst = (ly + 1) * padded + (t + 1);
            ghost.terrain_height_m[dst] = east.terrain_height_m[src];
            ghost.water_depth_m[dst] = east.water_depth_m[src];
        }
    }

    // Diagonal corners: one cell each, from the diagonal neighbor itself so
    // D8 flow across chunk corners sees the true surface there.
    let corners: [((i64, i64), (usize, usize), (usize, usize)); 4] = [
        ((cx - 1, cy - 1), (t - 1, t - 1), (0, 0)),
        ((cx + 1, cy - 1), (0, t - 1), (t + 1, 0)),
        ((cx - 1, cy + 1), (t - 1, 0), (0, t + 1)),
        ((cx + 1, cy + 1), (0, 0), (t + 1, t + 1)),
    ];
    for ((ncx, ncy), (sx, sy), (dx, dy)) in corners {
        let neighbor = cache.get_chunk(ncx, ncy);
        let src = sy * t + sx;
        let dst = dy * padded + dx;
        ghost.terrain_height_m[dst] = neighbor.terrain_height_m[src];
        ghost.water_depth_m[dst] = neighbor.water_depth_m[src];
    }

    ghost
}
