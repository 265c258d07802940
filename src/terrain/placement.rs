//! Continent and mountain-belt placement.
//!
//! Continents are placed Poisson-style: draw uniform candidates and keep the
//! first that clears a minimum toroidal distance to everything already
//! placed; if no candidate clears, fall back to the one that came closest.
//! Belts attach to major continents with a random offset, orientation and
//! size. Every draw comes from a named fork of the placement stream, so the
//! layouts are fixed by the master seed alone.

use crate::rng::RngStream;

/// Uniform candidate draws per placed center before falling back.
const PLACEMENT_ATTEMPTS: usize = 30;

/// One continent falloff center.
#[derive(Clone, Copy, Debug)]
pub struct ContinentCenter {
    pub x_m: f64,
    pub y_m: f64,
    pub radius_m: f64,
    /// Contribution scale in the continentalness sum.
    pub strength: f64,
}

/// One rotated elliptical mountain belt.
#[derive(Clone, Copy, Debug)]
pub struct MountainBelt {
    pub cx_m: f64,
    pub cy_m: f64,
    pub orientation_rad: f64,
    pub half_length_m: f64,
    pub half_width_m: f64,
    pub peak_m: f64,
}

/// Shortest signed offset from `b` to `a` on a wrapping axis of `extent`.
/// Valid for inputs arbitrarily far outside [0, extent) (domain-warped
/// sample points can overshoot the world edge).
#[inline]
pub fn toroidal_delta(a: f64, b: f64, extent: f64) -> f64 {
    let mut d = (a - b).rem_euclid(extent);
    if d > extent * 0.5 {
        d -= extent;
    }
    d
}

/// Euclidean distance on the torus.
pub fn toroidal_distance(ax: f64, ay: f64, bx: f64, by: f64, width: f64, height: f64) -> f64 {
    let dx = toroidal_delta(ax, bx, width);
    let dy = toroidal_delta(ay, by, height);
    (dx * dx + dy * dy).sqrt()
}

/// Place `count` centers of `radius_m`, each at least
/// `min_separation_factor * radius_m` away from every center already in
/// `existing` and every center placed before it in this call.
pub fn place_centers(
    stream: &mut RngStream,
    count: usize,
    radius_m: f64,
    strength: f64,
    min_separation_factor: f64,
    world_width_m: f64,
    world_height_m: f64,
    existing: &[ContinentCenter],
) -> Vec<ContinentCenter> {
    let min_separation = min_separation_factor * radius_m;
    let mut placed: Vec<ContinentCenter> = Vec::with_capacity(count);

    for _ in 0..count {
        let mut best: Option<(f64, f64, f64)> = None;
        let mut accepted = None;

        for _ in 0..PLACEMENT_ATTEMPTS {
            let x = stream.float() * world_width_m;
            let y = stream.float() * world_height_m;

            let min_dist = existing
                .iter()
                .chain(placed.iter())
                .map(|c| toroidal_distance(x, y, c.x_m, c.y_m, world_width_m, world_height_m))
                .fold(f64::INFINITY, f64::min);

            if min_dist > min_separation {
                accepted = Some((x, y));
                break;
            }
            let better = match best {
                None => true,
                Some((_, _, d)) => min_dist > d,
            };
            if better {
                best = Some((x, y, min_dist));
            }
        }

        let (x, y) = accepted
            .or(best.map(|(x, y, _)| (x, y)))
            .expect("at least one placement attempt was made");
        placed.push(ContinentCenter {
            x_m: x,
            y_m: y,
            radius_m,
            strength,
        });
    }

    placed
}

/// Place `count` belts around the major continent centers.
///
/// Belt i anchors to major `i mod majors`, offset by a random polar jump of
/// up to 0.6 radii, with uniform orientation in [0, pi) and uniform
/// length/width/peak within the given spans.
#[allow(clippy::too_many_arguments)]
pub fn place_belts(
    stream: &mut RngStream,
    count: usize,
    majors: &[ContinentCenter],
    length_km: crate::terrain::params::Span,
    width_km: crate::terrain::params::Span,
    peak_m: crate::terrain::params::Span,
    world_width_m: f64,
    world_height_m: f64,
) -> Vec<MountainBelt> {
    let mut belts = Vec::with_capacity(count);
    if majors.is_empty() {
        return belts;
    }

    for i in 0..count {
        let anchor = &majors[i % majors.len()];
        let theta = stream.float() * std::f64::consts::TAU;
        let offset = stream.float() * 0.6 * anchor.radius_m;
        let cx = (anchor.x_m + theta.cos() * offset).rem_euclid(world_width_m);
        let cy = (anchor.y_m + theta.sin() * offset).rem_euclid(world_height_m);

        let orientation = stream.float() * std::f64::consts::PI;
        let length = (length_km.lo + stream.float() * (length_km.hi - length_km.lo)) * 1000.0;
        let width = (width_km.lo + stream.float() * (width_km.hi - width_km.lo)) * 1000.0;
        let peak = peak_m.lo + stream.float() * (peak_m.hi - peak_m.lo);

        belts.push(MountainBelt {
            cx_m: cx,
            cy_m: cy,
            orientation_rad: orientation,
            half_length_m: length * 0.5,
            half_width_m: width * 0.5,
            peak_m: peak,
        });
    }

    belts
}

/// Rotated elliptical cubic falloff of a belt at world point (x, y), in
/// [0, 1]. Zero outside the ellipse.
pub fn belt_mask(belt: &MountainBelt, x_m: f64, y_m: f64, world_width_m: f64, world_height_m: f64) -> f64 {
    let dx = toroidal_delta(x_m, belt.cx_m, world_width_m);
    let dy = toroidal_delta(y_m, belt.cy_m, world_height_m);

    // Rotate into belt-aligned along/across coordinates.
    let cos = belt.orientation_rad.cos();
    let sin = belt.orientation_rad.sin();
    let along = dx * cos + dy * sin;
    let across = -dx * sin + dy * cos;

    let u = along / belt.half_length_m;
    let v = across / belt.half_width_m;
    let rho_sq = u * u + v * v;
    if rho_sq >= 1.0 {
        return 0.0;
    }
    let falloff = 1.0 - rho_sq.sqrt();
    falloff * falloff * falloff
}

/// Quintic smoothstep falloff from 1 at distance 0 to 0 at `radius`.
pub fn smooth_falloff(distance: f64, radius: f64) -> f64 {
    if distance >= radius {
        return 0.0;
    }
    let t = 1.0 - distance / radius;
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::params::Span;

    const W: f64 = 20_000_000.0;
    const H: f64 = 10_000_000.0;

    fn stream() -> RngStream {
        RngStream::new(424_242)
    }

    #[test]
    fn test_toroidal_delta_wraps() {
        assert_eq!(toroidal_delta(10.0, 20.0, 100.0), -10.0);
        assert_eq!(toroidal_delta(95.0, 5.0, 100.0), -10.0);
        assert_eq!(toroidal_delta(5.0, 95.0, 100.0), 10.0);
    }

    #[test]
    fn test_toroidal_distance_symmetric() {
        let d1 = toroidal_distance(100.0, 100.0, W - 100.0, H - 100.0, W, H);
        let d2 = toroidal_distance(W - 100.0, H - 100.0, 100.0, 100.0, W, H);
        assert!((d1 - d2).abs() < 1e-9);
        assert!((d1 - (200.0f64 * 200.0 + 200.0 * 200.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_placement_deterministic() {
        let mut a = stream();
        let mut b = stream();
        let ca = place_centers(&mut a, 3, 2_500_000.0, 1.0, 1.5, W, H, &[]);
        let cb = place_centers(&mut b, 3, 2_500_000.0, 1.0, 1.5, W, H, &[]);
        for (x, y) in ca.iter().zip(cb.iter()) {
            assert_eq!(x.x_m.to_bits(), y.x_m.to_bits());
            assert_eq!(x.y_m.to_bits(), y.y_m.to_bits());
        }
    }

    #[test]
    fn test_placement_in_bounds() {
        let mut s = stream();
        let centers = place_centers(&mut s, 8, 900_000.0, 0.5, 1.0, W, H, &[]);
        assert_eq!(centers.len(), 8);
        for c in &centers {
            assert!((0.0..W).contains(&c.x_m));
            assert!((0.0..H).contains(&c.y_m));
        }
    }

    #[test]
    fn test_placement_respects_separation_when_space_allows() {
        let mut s = stream();
        // Radii small relative to the world: separation should be satisfiable.
        let radius = 500_000.0;
        let centers = place_centers(&mut s, 3, radius, 1.0, 1.5, W, H, &[]);
        for (i, a) in centers.iter().enumerate() {
            for b in centers.iter().skip(i + 1) {
                let d = toroidal_distance(a.x_m, a.y_m, b.x_m, b.y_m, W, H);
                assert!(d > 1.5 * radius, "centers {i} too close: {d}");
            }
        }
    }

    #[test]
    fn test_crowded_placement_still_places() {
        let mut s = stream();
        // Impossible separation: the fallback keeps the best attempt rather
        // than failing.
        let centers = place_centers(&mut s, 5, W, 1.0, 1.5, W, H, &[]);
        assert_eq!(centers.len(), 5);
    }

    #[test]
    fn test_belts_anchor_to_majors() {
        let mut s = stream();
        let majors = place_centers(&mut s, 3, 2_500_000.0, 1.0, 1.5, W, H, &[]);
        let belts = place_belts(
            &mut s,
            3,
            &majors,
            Span::new(3000.0, 6000.0),
            Span::new(300.0, 600.0),
            Span::new(1500.0, 2500.0),
            W,
            H,
        );
        assert_eq!(belts.len(), 3);
        for (i, belt) in belts.iter().enumerate() {
            let anchor = &majors[i % majors.len()];
            let d = toroidal_distance(belt.cx_m, belt.cy_m, anchor.x_m, anchor.y_m, W, H);
            assert!(d <= 0.6 * anchor.radius_m + 1e-6);
            assert!((0.0..std::f64::consts::PI).contains(&belt.orientation_rad));
            assert!((1_500_000.0..=3_000_000.0).contains(&belt.half_length_m));
            assert!((150_000.0..=300_000.0).contains(&belt.half_width_m));
            assert!((1500.0..=2500.0).contains(&belt.peak_m));
        }
    }

    #[test]
    fn test_belt_mask_profile() {
        let belt = MountainBelt {
            cx_m: 1_000_000.0,
            cy_m: 1_000_000.0,
            orientation_rad: 0.0,
            half_length_m: 500_000.0,
            half_width_m: 100_000.0,
            peak_m: 2000.0,
        };
        // Peak at the center, zero outside, monotone along the axis.
        assert_eq!(belt_mask(&belt, belt.cx_m, belt.cy_m, W, H), 1.0);
        assert_eq!(belt_mask(&belt, belt.cx_m + 600_000.0, belt.cy_m, W, H), 0.0);
        let near = belt_mask(&belt, belt.cx_m + 100_000.0, belt.cy_m, W, H);
        let far = belt_mask(&belt, belt.cx_m + 400_000.0, belt.cy_m, W, H);
        assert!(near > far && far > 0.0);
        // Rotation is respected: across the short axis the mask dies faster.
        let across = belt_mask(&belt, belt.cx_m, belt.cy_m + 100_000.0, W, H);
        assert!(across < near);
    }

    #[test]
    fn test_smooth_falloff_shape() {
        assert_eq!(smooth_falloff(0.0, 100.0), 1.0);
        assert_eq!(smooth_falloff(100.0, 100.0), 0.0);
        assert_eq!(smooth_falloff(150.0, 100.0), 0.0);
        let a = smooth_falloff(25.0, 100.0);
        let b = smooth_falloff(50.0, 100.0);
        let c = smooth_falloff(75.0, 100.0);
        assert!(a > b && b > c);
    }
}
