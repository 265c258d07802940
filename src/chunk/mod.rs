//! Chunked world storage: SoA cell buffers, the LRU cache that materializes
//! them lazily, and the ghost-border halo used for cross-chunk routing.

pub mod cache;
pub mod ghost;
pub mod storage;

pub use cache::{CacheStats, ChunkCache, ChunkGenerator};
pub use ghost::{build_ghost_border, GhostBorder};
pub use storage::Chunk;
