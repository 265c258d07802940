//! Seeded noise fields: 4D simplex plus the toroidal 2D embedding.

pub mod simplex;
pub mod torus;

pub use simplex::Simplex4D;
pub use torus::TorusNoise;
