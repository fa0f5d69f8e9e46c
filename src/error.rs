//! Configuration errors surfaced synchronously by `spin`
//!
//! Runtime numeric faults and timeouts are recovered inside the engine and
//! never show up here.

/// Reasons a spin request is refused before any actor is built
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SpinError {
    /// Profile name not present in the profile set
    #[error("unknown physics profile: {0}")]
    UnknownProfile(String),

    /// Profile present but its constants are unusable
    #[error("invalid physics profile {profile}: {reason}")]
    InvalidProfile { profile: String, reason: String },

    /// One outcome is required per visual handle
    #[error("handle/outcome count mismatch: {handles} handles, {outcomes} outcomes")]
    CountMismatch { handles: usize, outcomes: usize },

    /// Nothing to animate
    #[error("spin request has no actors")]
    Empty,

    /// Column stagger that is negative or not a number
    #[error("stagger must be a finite, non-negative number of ms (got {0})")]
    InvalidStagger(f64),

    /// Wheel outcome that is not one of the wheel's segments
    #[error("outcome {outcome:?} is not on the track for actor {index}")]
    UnknownOutcome { index: usize, outcome: String },

    /// Cache key parameters could not be canonicalized
    #[error("cache key serialization failed: {0}")]
    KeySerialization(String),

    /// Profile override document could not be parsed
    #[error("profile overrides rejected: {0}")]
    Overrides(String),
}

/// Failure reported by a spin listener (sound collaborator); logged, never fatal
#[derive(Clone, Debug, thiserror::Error)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);
