//! Loadout Reels - randomized kinematic animation engine
//!
//! Core modules:
//! - `sim`: Deterministic actor state machine, session and scheduler
//! - `profile`: Named physics profiles (regular/final spin, roulette, price wheel)
//! - `plan`: Pure spin planning (tracks, targets, stop times)
//! - `cache`: Memoized animation descriptors
//! - `roulette`: Wheel/ball layout helpers
//! - `surface`: Visual handle abstraction (transform + blur)
//! - `platform`: Browser/native platform glue
//! - `settings`: Persisted user preferences

pub mod cache;
pub mod error;
pub mod plan;
pub mod platform;
pub mod profile;
pub mod roulette;
pub mod settings;
pub mod sim;
pub mod surface;

pub use cache::{AnimationCache, AnimationDescriptor, generate_key};
pub use error::SpinError;
pub use profile::{PhysicsProfile, ProfileName, ProfileSet};
pub use settings::EngineSettings;
pub use sim::{AnimationSession, SpinOptions, SpinResults, SpinStart};

use glam::Vec2;

/// Engine timing constants
pub mod consts {
    /// Nominal frame interval of the host's frame callback (ms)
    pub const FRAME_DT_MS: f64 = 1000.0 / 60.0;
    /// Largest dt fed to actors in one tick (seconds); a stalled tab must not
    /// fling reels across the strip
    pub const MAX_FRAME_DT: f32 = 0.1;
    /// Default wall-clock deadline for a session (ms)
    pub const DEFAULT_SAFETY_TIMEOUT_MS: f64 = 10_000.0;
    /// Slack past the planned settle time before the safety deadline may fire (ms)
    pub const SAFETY_MARGIN_MS: f64 = 2_000.0;

    /// Items on a generated reel strip
    pub const REEL_STRIP_LEN: usize = 20;
    /// Strip index the winning item is placed at
    pub const REEL_WINNER_INDEX: usize = REEL_STRIP_LEN - 3;

    /// Zero-time transitions allowed in a single actor update
    pub const MAX_TRANSITIONS_PER_TICK: u32 = 8;
}

/// Wrap a position into `[0, period)`
#[inline]
pub fn normalize_position(position: f32, period: f32) -> f32 {
    if period <= 0.0 {
        return 0.0;
    }
    let wrapped = position.rem_euclid(period);
    // rem_euclid can round up to exactly `period` for tiny negatives
    if wrapped >= period { 0.0 } else { wrapped }
}

/// Shortest signed distance from `from` to `to` on a circular track
#[inline]
pub fn wrapped_delta(from: f32, to: f32, period: f32) -> f32 {
    let delta = normalize_position(to - from, period);
    if delta > period / 2.0 { delta - period } else { delta }
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_position_wraps() {
        let pitch = 2000.0;
        assert_eq!(normalize_position(pitch + 50.0, pitch), 50.0);
        assert_eq!(normalize_position(-50.0, pitch), pitch - 50.0);
        assert_eq!(normalize_position(0.0, pitch), 0.0);
        assert_eq!(normalize_position(pitch, pitch), 0.0);
    }

    #[test]
    fn test_wrapped_delta_takes_short_way() {
        assert_eq!(wrapped_delta(350.0, 10.0, 360.0), 20.0);
        assert_eq!(wrapped_delta(10.0, 350.0, 360.0), -20.0);
        assert_eq!(wrapped_delta(90.0, 90.0, 360.0), 0.0);
    }

    #[test]
    fn test_polar_to_cartesian() {
        let p = polar_to_cartesian(10.0, 0.0);
        assert!((p.x - 10.0).abs() < 1e-5);
        assert!(p.y.abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn normalized_position_is_in_range(pos in -1.0e5f32..1.0e5, period in 1.0f32..5000.0) {
            let n = normalize_position(pos, period);
            prop_assert!(n >= 0.0 && n < period);
        }
    }
}
