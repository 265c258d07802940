//! Torus embedding of 2D world coordinates into 4D noise space.
//!
//! A point (x, y) on the wrapping world maps to a pair of circles, one per
//! axis, so a noise sample at x = 0 and x = W is the same 4D point and the
//! field is seamless in both directions by construction.

use std::f64::consts::TAU;

use crate::noise::simplex::Simplex4D;
use crate::rng::{combine_seed, hash_string};

/// Seamless 2D noise over a toroidal world of fixed physical extent.
#[derive(Clone)]
pub struct TorusNoise {
    seed: u32,
    world_width_m: f64,
    world_height_m: f64,
    simplex: Simplex4D,
}

impl TorusNoise {
    pub fn new(seed: u32, world_width_m: f64, world_height_m: f64) -> Self {
        Self {
            seed,
            world_width_m,
            world_height_m,
            simplex: Simplex4D::new(seed),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Clone the configuration under a label-derived seed. Used to carve an
    /// independent layer per terrain role from one base generator.
    pub fn derive(&self, label: &str) -> TorusNoise {
        TorusNoise::new(
            combine_seed(self.seed, hash_string(label)),
            self.world_width_m,
            self.world_height_m,
        )
    }

    /// Single sample at world meters (x, y) with the given frequency
    /// (cycles per meter).
    pub fn sample(&self, x_m: f64, y_m: f64, frequency: f64) -> f64 {
        let angle_x = TAU * x_m / self.world_width_m;
        let angle_y = TAU * y_m / self.world_height_m;
        let radius = frequency * self.world_width_m / TAU;
        self.simplex.noise(
            radius * angle_x.cos(),
            radius * angle_x.sin(),
            radius * angle_y.cos(),
            radius * angle_y.sin(),
        )
    }

    /// Fractal Brownian motion with lacunarity 2 and persistence 0.5.
    pub fn fbm(&self, x_m: f64, y_m: f64, base_frequency: f64, octaves: u32) -> f64 {
        self.fbm_with(x_m, y_m, base_frequency, octaves, 2.0, 0.5)
    }

    /// Fractal Brownian motion with explicit lacunarity and persistence.
    /// Octave order is fixed; do not reorder (bit-reproducibility).
    pub fn fbm_with(
        &self,
        x_m: f64,
        y_m: f64,
        base_frequency: f64,
        octaves: u32,
        lacunarity: f64,
        persistence: f64,
    ) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = base_frequency;
        let mut max_value = 0.0;
        for _ in 0..octaves {
            total += amplitude * self.sample(x_m, y_m, frequency);
            max_value += amplitude;
            amplitude *= persistence;
            frequency *= lacunarity;
        }
        total / max_value
    }

    /// Ridged multifractal: each octave sample s becomes (1 - |s|)^2,
    /// summed with the same normalization as fbm.
    pub fn ridged(&self, x_m: f64, y_m: f64, base_frequency: f64, octaves: u32) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = base_frequency;
        let mut max_value = 0.0;
        for _ in 0..octaves {
            let s = self.sample(x_m, y_m, frequency);
            let ridge = (1.0 - s.abs()) * (1.0 - s.abs());
            total += amplitude * ridge;
            max_value += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }
        total / max_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f64 = 1_000_000.0;
    const H: f64 = 500_000.0;

    #[test]
    fn test_seamless_in_x() {
        let n = TorusNoise::new(42, W, H);
        for i in 0..32 {
            let y = i as f64 * (H / 32.0);
            let a = n.fbm(0.0, y, 4.0 / W, 3);
            let b = n.fbm(W, y, 4.0 / W, 3);
            assert!((a - b).abs() < 1e-10, "seam at y={y}: {a} vs {b}");
        }
    }

    #[test]
    fn test_seamless_in_y() {
        let n = TorusNoise::new(42, W, H);
        for i in 0..32 {
            let x = i as f64 * (W / 32.0);
            let a = n.fbm(x, 0.0, 4.0 / W, 3);
            let b = n.fbm(x, H, 4.0 / W, 3);
            assert!((a - b).abs() < 1e-10, "seam at x={x}: {a} vs {b}");
        }
    }

    #[test]
    fn test_derive_changes_field() {
        let base = TorusNoise::new(42, W, H);
        let ridge = base.derive("ridge");
        let hills = base.derive("hills");
        assert_ne!(ridge.seed(), hills.seed());
        assert_ne!(
            ridge.sample(1234.0, 5678.0, 8.0 / W),
            hills.sample(1234.0, 5678.0, 8.0 / W)
        );
        // Deriving is pure: same label, same layer.
        assert_eq!(ridge.seed(), base.derive("ridge").seed());
    }

    #[test]
    fn test_fbm_bounded() {
        let n = TorusNoise::new(9, W, H);
        for i in 0..256 {
            let x = i as f64 * (W / 256.0);
            let v = n.fbm(x, x * 0.5, 8.0 / W, 4);
            assert!(v.abs() <= 1.1);
        }
    }

    #[test]
    fn test_ridged_non_negative() {
        let n = TorusNoise::new(9, W, H);
        for i in 0..256 {
            let x = i as f64 * (W / 256.0);
            let v = n.ridged(x, x * 0.3, 8.0 / W, 4);
            assert!((0.0..=1.0).contains(&v), "ridged sample {v} outside [0, 1]");
        }
    }

    #[test]
    fn test_deterministic_across_instances() {
        let a = TorusNoise::new(77, W, H);
        let b = TorusNoise::new(77, W, H);
        let va = a.fbm(12_345.0, 67_890.0, 16.0 / W, 5);
        let vb = b.fbm(12_345.0, 67_890.0, 16.0 / W, 5);
        assert_eq!(va.to_bits(), vb.to_bits());
    }
}
