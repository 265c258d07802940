//! Named deterministic random streams.
//!
//! Each [`RngStream`] is an independent Mulberry32 sequence identified by its
//! original seed. Forking derives a child seed from `(original_seed, label)`,
//! never from the parent's advanced state, so a fork taken before or after a
//! million draws produces the same child sequence.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::rng::mulberry::{combine_seed, hash_string, Mulberry32};

/// Serialized form of one stream: `{originalSeed, prngState: {state}}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RngStreamState {
    pub original_seed: u32,
    pub prng_state: PrngState,
}

/// The single word of Mulberry32 state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrngState {
    pub state: u32,
}

/// One deterministic uint32 stream with distribution helpers.
#[derive(Clone, Debug)]
pub struct RngStream {
    original_seed: u32,
    prng: Mulberry32,
    /// Diagnostic label; not part of the serialized state.
    label: Option<String>,
}

impl RngStream {
    pub fn new(seed: u32) -> Self {
        Self {
            original_seed: seed,
            prng: Mulberry32::new(seed),
            label: None,
        }
    }

    pub fn with_label(seed: u32, label: impl Into<String>) -> Self {
        Self {
            original_seed: seed,
            prng: Mulberry32::new(seed),
            label: Some(label.into()),
        }
    }

    pub fn original_seed(&self) -> u32 {
        self.original_seed
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Next raw value in [0, 2^32).
    pub fn next_u32(&mut self) -> u32 {
        self.prng.next_u32()
    }

    /// Next value in [0, 1).
    pub fn float(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }

    /// Next integer in [min, max). Requires min < max.
    pub fn int(&mut self, min: i64, max: i64) -> Result<i64> {
        if min >= max {
            return Err(EngineError::InvalidArgument(format!(
                "int range requires min < max, got [{min}, {max})"
            )));
        }
        let span = (max - min) as f64;
        Ok(min + (self.float() * span).floor() as i64)
    }

    /// Next boolean, true with probability `p`. Requires p in [0, 1].
    pub fn next_bool(&mut self, p: f64) -> Result<bool> {
        if !(0.0..=1.0).contains(&p) {
            return Err(EngineError::InvalidArgument(format!(
                "probability must lie in [0, 1], got {p}"
            )));
        }
        Ok(self.float() < p)
    }

    /// Uniform pick from a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Result<&'a T> {
        if items.is_empty() {
            return Err(EngineError::InvalidArgument(
                "pick requires a non-empty slice".into(),
            ));
        }
        let idx = self.int(0, items.len() as i64)? as usize;
        Ok(&items[idx])
    }

    /// Fisher-Yates shuffle into a new vector; the input is untouched.
    pub fn shuffle<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut out: Vec<T> = items.to_vec();
        for i in (1..out.len()).rev() {
            // int(0, i+1) cannot fail: the range is always non-empty here.
            let j = self
                .int(0, i as i64 + 1)
                .expect("shuffle range is non-empty") as usize;
            out.swap(i, j);
        }
        out
    }

    /// Derive a child stream from a string label.
    ///
    /// Position-stable: the child depends only on `(original_seed, label)`,
    /// never on how far this stream has advanced. Does not mutate `self`.
    pub fn fork(&self, label: &str) -> RngStream {
        let child = combine_seed(self.original_seed, hash_string(label));
        let name = match &self.label {
            Some(parent) => format!("{parent}/{label}"),
            None => label.to_string(),
        };
        RngStream::with_label(child, name)
    }

    /// Derive a child stream from a numeric label (cast to u32).
    pub fn fork_index(&self, index: u32) -> RngStream {
        let child = combine_seed(self.original_seed, index);
        let name = match &self.label {
            Some(parent) => format!("{parent}/{index}"),
            None => index.to_string(),
        };
        RngStream::with_label(child, name)
    }

    pub fn state(&self) -> RngStreamState {
        RngStreamState {
            original_seed: self.original_seed,
            prng_state: PrngState {
                state: self.prng.state,
            },
        }
    }

    /// Restore a snapshot taken from this stream. The snapshot's original
    /// seed must match, otherwise the state belongs to a different stream.
    pub fn set_state(&mut self, state: RngStreamState) -> Result<()> {
        if state.original_seed != self.original_seed {
            return Err(EngineError::StateMismatch(format!(
                "stream seed {} does not match snapshot seed {}",
                self.original_seed, state.original_seed
            )));
        }
        self.prng = Mulberry32::new(state.prng_state.state);
        Ok(())
    }
}
