//! Deterministic animation engine
//!
//! Everything that moves lives here. Rules:
//! - One authoritative timestamp per tick, supplied by the host
//! - Actors stepped in index order
//! - Randomness only in start state and display wobble, never in targets
//! - No rendering or platform dependencies (handles are traits)

pub mod actor;
pub mod clock;
pub mod events;
pub mod phase;
pub mod session;

pub use actor::{Actor, DisplayOptions};
pub use clock::{Clock, VirtualClock};
pub use events::{CompletionReason, SpinEvent, SpinListener};
pub use phase::{Deceleration, Phase, PhaseKind};
pub use session::{ActorResult, AnimationSession, CompletionCallback, SpinOptions, SpinResults, SpinStart};
