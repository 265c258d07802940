//! Crate-wide error taxonomy.
//!
//! Constructors validate fast and return `Result`; arithmetic and routing
//! helpers on well-formed data never fail. Tick handlers have their own
//! boxed-error channel (see the scheduler) because their failures are
//! isolated and logged rather than propagated.

use thiserror::Error;

/// Errors surfaced by the engine's library APIs.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Seed input that cannot be normalized (NaN or infinite numeric seed).
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// Out-of-domain caller input (empty pick, inverted range, p outside [0,1], ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Rejected configuration (non-positive dimensions, zero capacity, ...).
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Re-registration under a name that must be unique.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// Deserialization whose embedded seed differs from the target.
    #[error("state mismatch: {0}")]
    StateMismatch(String),

    /// Lifecycle violation: the singleton slot is already occupied.
    #[error("already initialized: {0}")]
    AlreadyInitialized(&'static str),

    /// Lifecycle violation: the singleton slot is empty.
    #[error("not initialized: {0}")]
    NotInitialized(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;
