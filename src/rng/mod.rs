//! Deterministic random number framework.
//!
//! A single master seed fans out into named streams, one per subsystem, so
//! varying one system's randomness never perturbs another's. Streams fork
//! into position-stable children and snapshot/restore through serde.

pub mod mulberry;
pub mod stream;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
pub use crate::rng::mulberry::{combine_seed, hash_string, normalize_numeric_seed, Mulberry32};
pub use crate::rng::stream::{PrngState, RngStream, RngStreamState};

/// Serialized form of a whole manager:
/// `{masterSeed, streams: {name: {originalSeed, prngState}}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RngState {
    pub master_seed: u32,
    pub streams: BTreeMap<String, RngStreamState>,
}

/// Owns every named stream derived from one master seed.
///
/// `stream(name)` memoizes: two calls with the same name return the same
/// stream object, advanced state and all.
#[derive(Clone, Debug)]
pub struct RngManager {
    master_seed: u32,
    streams: BTreeMap<String, RngStream>,
}

impl RngManager {
    pub fn new(master_seed: u32) -> Self {
        Self {
            master_seed,
            streams: BTreeMap::new(),
        }
    }

    /// Seed from OS entropy, for runs where reproducibility is not wanted.
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u32>().max(1))
    }

    /// Build from a string seed (hashed) or a numeric literal.
    pub fn from_seed_text(text: &str) -> Result<Self> {
        match text.parse::<f64>() {
            Ok(n) => Ok(Self::new(normalize_numeric_seed(n)?)),
            Err(_) => Ok(Self::new(hash_string(text))),
        }
    }

    pub fn master_seed(&self) -> u32 {
        self.master_seed
    }

    /// Get or create the stream for `name`. The stream's seed is
    /// `combine(master, hash(name))`, so it is fixed by the name alone.
    pub fn stream(&mut self, name: &str) -> &mut RngStream {
        let master = self.master_seed;
        self.streams.entry(name.to_string()).or_insert_with(|| {
            RngStream::with_label(combine_seed(master, hash_string(name)), name)
        })
    }

    /// Snapshot the master seed and every memoized stream.
    pub fn state(&self) -> RngState {
        RngState {
            master_seed: self.master_seed,
            streams: self
                .streams
                .iter()
                .map(|(name, s)| (name.clone(), s.state()))
                .collect(),
        }
    }

    /// Restore a snapshot. The stored master seed must match this manager's.
    pub fn load_state(&mut self, state: RngState) -> Result<()> {
        if state.master_seed != self.master_seed {
            return Err(EngineError::StateMismatch(format!(
                "manager seed {} does not match snapshot seed {}",
                self.master_seed, state.master_seed
            )));
        }
        for (name, stream_state) in state.streams {
            self.stream(&name).set_state(stream_state)?;
        }
        Ok(())
    }
}
