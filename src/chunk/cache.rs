//! Lazy chunk cache with LRU eviction.
//!
//! Chunks are materialized on first access by a registered generator and
//! evicted least-recently-used once the resident limit is hit. Coordinates
//! wrap toroidally, so any integer pair addresses a real chunk. Eviction
//! loses dynamic state (water, runoff); terrain is regenerable.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tracing::debug;

use crate::chunk::storage::Chunk;
use crate::error::{EngineError, Result};

/// Populates a freshly allocated chunk (terrain + initial ocean water).
pub type ChunkGenerator = Box<dyn Fn(&mut Chunk) + Send + Sync>;

/// Counters exposed for observation; `resident_count` is authoritative,
/// the rest accumulate until `reset_stats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub resident_count: usize,
    pub total_accesses: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
}

pub struct ChunkCache {
    world_chunks_x: u32,
    world_chunks_y: u32,
    chunk_cells: usize,
    max_resident: usize,
    chunks: HashMap<(u32, u32), Chunk>,
    /// Access order, most recent at the front. Keys here mirror `chunks`.
    lru: VecDeque<(u32, u32)>,
    generator: Option<ChunkGenerator>,
    total_accesses: u64,
    cache_hits: u64,
    cache_misses: u64,
    evictions: u64,
}

impl ChunkCache {
    pub fn new(
        world_chunks_x: u32,
        world_chunks_y: u32,
        chunk_cells: usize,
        max_resident: usize,
    ) -> Result<Self> {
        if world_chunks_x == 0 || world_chunks_y == 0 {
            return Err(EngineError::InvalidConfig(format!(
                "world must span at least one chunk per axis, got {world_chunks_x}x{world_chunks_y}"
            )));
        }
        if chunk_cells == 0 {
            return Err(EngineError::InvalidConfig(
                "chunk side must be positive".into(),
            ));
        }
        if max_resident == 0 {
            return Err(EngineError::InvalidConfig(
                "resident chunk capacity must be positive".into(),
            ));
        }
        Ok(Self {
            world_chunks_x,
            world_chunks_y,
            chunk_cells,
            max_resident,
            chunks: HashMap::new(),
            lru: VecDeque::new(),
            generator: None,
            total_accesses: 0,
            cache_hits: 0,
            cache_misses: 0,
            evictions: 0,
        })
    }

    pub fn set_generator(&mut self, generator: ChunkGenerator) {
        self.generator = Some(generator);
    }

    pub fn world_chunks_x(&self) -> u32 {
        self.world_chunks_x
    }

    pub fn world_chunks_y(&self) -> u32 {
        self.world_chunks_y
    }

    pub fn chunk_cells(&self) -> usize {
        self.chunk_cells
    }

    /// Euclidean-modulo wrap of arbitrary integer coordinates onto the
    /// chunk grid.
    pub fn wrap(&self, cx: i64, cy: i64) -> (u32, u32) {
        (
            cx.rem_euclid(self.world_chunks_x as i64) as u32,
            cy.rem_euclid(self.world_chunks_y as i64) as u32,
        )
    }

    /// Fetch a chunk, generating it on first access.
    ///
    /// The returned reference is valid until the next call that can evict,
    /// i.e. any other `get_chunk`. Multi-chunk sequences must copy out what
    /// they need before touching the next chunk.
    pub fn get_chunk(&mut self, cx: i64, cy: i64) -> &mut Chunk {
        let key = self.wrap(cx, cy);
        self.total_accesses += 1;

        if self.chunks.contains_key(&key) {
            self.cache_hits += 1;
            self.touch(key);
        } else {
            self.cache_misses += 1;
            if self.chunks.len() >= self.max_resident {
                self.evict_tail();
            }
            let mut chunk = Chunk::new(key.0, key.1, self.chunk_cells);
            if let Some(generator) = &self.generator {
                generator(&mut chunk);
            }
            self.chunks.insert(key, chunk);
            self.lru.push_front(key);
        }

        self.chunks.get_mut(&key).expect("chunk resident after insert")
    }

    /// Residency check without touching LRU order.
    pub fn has_chunk(&self, cx: i64, cy: i64) -> bool {
        self.chunks.contains_key(&self.wrap(cx, cy))
    }

    /// Visit resident chunks in unspecified order; does not touch LRU order.
    pub fn for_each_resident(&self, mut f: impl FnMut(&Chunk)) {
        for chunk in self.chunks.values() {
            f(chunk);
        }
    }

    /// Snapshot of resident coordinates; does not touch LRU order.
    pub fn resident_coords(&self) -> Vec<(u32, u32)> {
        self.chunks.keys().copied().collect()
    }

    pub fn clear(&mut self) {
        let dropped = self.chunks.len();
        self.chunks.clear();
        self.lru.clear();
        self.evictions += dropped as u64;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            resident_count: self.chunks.len(),
            total_accesses: self.total_accesses,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            evictions: self.evictions,
        }
    }

    pub fn reset_stats(&mut self) {
        self.total_accesses = 0;
        self.cache_hits = 0;
        self.cache_misses = 0;
        self.evictions = 0;
    }

    fn touch(&mut self, key: (u32, u32)) {
        if let Some(pos) = self.lru.iter().position(|&k| k == key) {
            self.lru.remove(pos);
        }
        self.lru.push_front(key);
    }

    fn evict_tail(&mut self) {
        if let Some(victim) = self.lru.pop_back() {
            self.chunks.remove(&victim);
            self.evictions += 1;
            debug!(cx = victim.0, cy = victim.1, "evicted chunk");
        }
    }

    #[cfg(test)]
    fn lru_order(&self) -> Vec<(u32, u32)> {
        self.lru.iter().copied().collect()
    }
}
