//! Physics profiles
//!
//! One immutable bundle of constants per animation flavor. Profiles carry no
//! behavior beyond derived timing lookups; actors read them every tick.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_SAFETY_TIMEOUT_MS;
use crate::error::SpinError;

/// Named animation flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileName {
    RegularSpin,
    FinalSpin,
    RouletteWheel,
    RouletteBall,
    PriceWheel,
}

impl ProfileName {
    pub const ALL: [ProfileName; 5] = [
        ProfileName::RegularSpin,
        ProfileName::FinalSpin,
        ProfileName::RouletteWheel,
        ProfileName::RouletteBall,
        ProfileName::PriceWheel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileName::RegularSpin => "REGULAR_SPIN",
            ProfileName::FinalSpin => "FINAL_SPIN",
            ProfileName::RouletteWheel => "ROULETTE_WHEEL",
            ProfileName::RouletteBall => "ROULETTE_BALL",
            ProfileName::PriceWheel => "PRICE_WHEEL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "REGULAR_SPIN" | "REGULAR" => Some(ProfileName::RegularSpin),
            "FINAL_SPIN" | "FINAL" => Some(ProfileName::FinalSpin),
            "ROULETTE_WHEEL" => Some(ProfileName::RouletteWheel),
            "ROULETTE_BALL" => Some(ProfileName::RouletteBall),
            "PRICE_WHEEL" => Some(ProfileName::PriceWheel),
            _ => None,
        }
    }

    /// The conclusive spin swaps the regular reel profile for the final one
    pub fn resolve(self, is_final_spin: bool) -> Self {
        match self {
            ProfileName::RegularSpin if is_final_spin => ProfileName::FinalSpin,
            other => other,
        }
    }
}

/// What kind of visual unit a profile drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    /// Vertical slot column; position in pixels
    Reel,
    /// Rotating wheel; position in degrees
    Wheel,
    /// Ball orbiting inside a wheel; position in degrees (wheel frame)
    Ball,
}

/// When the accelerating phase hands over to cruising
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AccelerationEnd {
    /// As soon as velocity reaches `max_velocity`
    AtMaxVelocity,
    /// After a fixed time, whatever the velocity
    AfterMs(f64),
}

/// When each actor begins decelerating, measured from session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StopSchedule {
    /// `base_ms + index * column_delay_ms`
    Relative { base_ms: f64, column_delay_ms: f64 },
    /// Explicit per-index timestamps; indices past the end keep the last gap
    Absolute { stop_at_ms: Vec<f64> },
}

/// Ball-in-pocket bounce constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BounceParams {
    /// Speed the ball hits the pocket wall with (units/s)
    pub impact_velocity: f32,
    /// Pull back toward the pocket wall (units/s²)
    pub gravity: f32,
    /// Rebounds slower than this end the bouncing phase
    pub min_velocity: f32,
}

/// Velocity thresholds for the blur visual state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlurThresholds {
    pub light: f32,
    pub heavy: f32,
}

/// Phase timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDurations {
    /// Start offset per actor index (ms)
    pub start_stagger_ms: f64,
    pub acceleration_end: AccelerationEnd,
    pub stop: StopSchedule,
    /// Deceleration always lasts exactly this long (ms)
    pub deceleration_ms: f64,
    /// Session force-settles after this long (ms)
    pub safety_timeout_ms: f64,
}

/// Immutable constants for one animation flavor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsProfile {
    pub name: ProfileName,
    pub kind: ActorKind,
    /// units/s²
    pub acceleration: f32,
    /// units/s; bounds the accelerating phase
    pub max_velocity: f32,
    /// Braking rate used to size the stopping distance (units/s²)
    pub deceleration: f32,
    /// Fraction of speed kept on each pocket-wall reflection (0-1);
    /// ignored without `bounce`
    pub bounce_dampening: f32,
    /// One reel item height (px) or one wheel degree
    pub item_pitch: f32,
    pub phase_durations: PhaseDurations,
    /// Random initial velocity range `[min, max)` (units/s)
    pub initial_velocity: (f32, f32),
    pub bounce: Option<BounceParams>,
    /// Fraction of the remaining error removed per 60 Hz frame while settling
    pub settle_rate: f32,
    /// Snap distance for settling (units)
    pub settle_epsilon: f32,
    pub blur: BlurThresholds,
    /// Display-only jitter amplitude while cruising (units)
    pub wobble: f32,
}

impl PhysicsProfile {
    /// Regular slot column spin: relative stagger
    pub fn regular_spin() -> Self {
        Self {
            name: ProfileName::RegularSpin,
            kind: ActorKind::Reel,
            acceleration: 8000.0,
            max_velocity: 5000.0,
            deceleration: 9000.0,
            bounce_dampening: 0.0,
            item_pitch: 100.0,
            phase_durations: PhaseDurations {
                start_stagger_ms: 60.0,
                acceleration_end: AccelerationEnd::AtMaxVelocity,
                stop: StopSchedule::Relative {
                    base_ms: 800.0,
                    column_delay_ms: 250.0,
                },
                deceleration_ms: 400.0,
                safety_timeout_ms: DEFAULT_SAFETY_TIMEOUT_MS,
            },
            initial_velocity: (0.0, 600.0),
            bounce: None,
            settle_rate: 0.35,
            settle_epsilon: 0.5,
            blur: BlurThresholds {
                light: 800.0,
                heavy: 2500.0,
            },
            wobble: 3.0,
        }
    }

    /// Conclusive slot spin: absolute per-column stop times
    pub fn final_spin() -> Self {
        Self {
            name: ProfileName::FinalSpin,
            kind: ActorKind::Reel,
            acceleration: 6000.0,
            max_velocity: 5200.0,
            deceleration: 7000.0,
            bounce_dampening: 0.0,
            item_pitch: 100.0,
            phase_durations: PhaseDurations {
                start_stagger_ms: 0.0,
                acceleration_end: AccelerationEnd::AfterMs(500.0),
                stop: StopSchedule::Absolute {
                    stop_at_ms: vec![1400.0, 2200.0, 3000.0],
                },
                deceleration_ms: 700.0,
                safety_timeout_ms: 12_000.0,
            },
            initial_velocity: (0.0, 400.0),
            bounce: None,
            settle_rate: 0.3,
            settle_epsilon: 0.5,
            blur: BlurThresholds {
                light: 800.0,
                heavy: 2500.0,
            },
            wobble: 4.0,
        }
    }

    /// Roulette wheel body
    pub fn roulette_wheel() -> Self {
        Self {
            name: ProfileName::RouletteWheel,
            kind: ActorKind::Wheel,
            acceleration: 720.0,
            max_velocity: 540.0,
            deceleration: 300.0,
            bounce_dampening: 0.0,
            item_pitch: 1.0,
            phase_durations: PhaseDurations {
                start_stagger_ms: 0.0,
                acceleration_end: AccelerationEnd::AtMaxVelocity,
                stop: StopSchedule::Relative {
                    base_ms: 2500.0,
                    column_delay_ms: 0.0,
                },
                deceleration_ms: 2000.0,
                safety_timeout_ms: DEFAULT_SAFETY_TIMEOUT_MS,
            },
            initial_velocity: (60.0, 180.0),
            bounce: None,
            settle_rate: 0.3,
            settle_epsilon: 0.05,
            blur: BlurThresholds {
                light: 200.0,
                heavy: 420.0,
            },
            wobble: 0.0,
        }
    }

    /// Roulette ball; bounces into its pocket
    pub fn roulette_ball() -> Self {
        Self {
            name: ProfileName::RouletteBall,
            kind: ActorKind::Ball,
            acceleration: 1440.0,
            max_velocity: 900.0,
            deceleration: 500.0,
            bounce_dampening: 0.45,
            item_pitch: 1.0,
            phase_durations: PhaseDurations {
                start_stagger_ms: 150.0,
                acceleration_end: AccelerationEnd::AfterMs(600.0),
                stop: StopSchedule::Relative {
                    base_ms: 2800.0,
                    column_delay_ms: 0.0,
                },
                deceleration_ms: 1500.0,
                safety_timeout_ms: DEFAULT_SAFETY_TIMEOUT_MS,
            },
            initial_velocity: (200.0, 400.0),
            bounce: Some(BounceParams {
                impact_velocity: 120.0,
                gravity: 900.0,
                min_velocity: 8.0,
            }),
            settle_rate: 0.3,
            settle_epsilon: 0.05,
            blur: BlurThresholds {
                light: 400.0,
                heavy: 800.0,
            },
            wobble: 0.6,
        }
    }

    /// Spin-count / price wheel
    pub fn price_wheel() -> Self {
        Self {
            name: ProfileName::PriceWheel,
            kind: ActorKind::Wheel,
            acceleration: 900.0,
            max_velocity: 720.0,
            deceleration: 360.0,
            bounce_dampening: 0.0,
            item_pitch: 1.0,
            phase_durations: PhaseDurations {
                start_stagger_ms: 0.0,
                acceleration_end: AccelerationEnd::AtMaxVelocity,
                stop: StopSchedule::Relative {
                    base_ms: 1800.0,
                    column_delay_ms: 0.0,
                },
                deceleration_ms: 1600.0,
                safety_timeout_ms: DEFAULT_SAFETY_TIMEOUT_MS,
            },
            initial_velocity: (90.0, 240.0),
            bounce: None,
            settle_rate: 0.3,
            settle_epsilon: 0.05,
            blur: BlurThresholds {
                light: 240.0,
                heavy: 540.0,
            },
            wobble: 0.0,
        }
    }

    pub fn builtin(name: ProfileName) -> Self {
        match name {
            ProfileName::RegularSpin => Self::regular_spin(),
            ProfileName::FinalSpin => Self::final_spin(),
            ProfileName::RouletteWheel => Self::roulette_wheel(),
            ProfileName::RouletteBall => Self::roulette_ball(),
            ProfileName::PriceWheel => Self::price_wheel(),
        }
    }

    /// Session-relative time actor `index` leaves `waiting` (ms)
    pub fn start_at_ms(&self, index: usize) -> f64 {
        index as f64 * self.phase_durations.start_stagger_ms
    }

    /// Session-relative time actor `index` begins decelerating (ms)
    ///
    /// `stagger_override` replaces the column delay (relative) or the
    /// extrapolation gap (absolute).
    pub fn stop_at_ms(&self, index: usize, stagger_override: Option<f64>) -> f64 {
        match &self.phase_durations.stop {
            StopSchedule::Relative {
                base_ms,
                column_delay_ms,
            } => base_ms + index as f64 * stagger_override.unwrap_or(*column_delay_ms),
            StopSchedule::Absolute { stop_at_ms } => {
                if let Some(at) = stop_at_ms.get(index) {
                    return *at;
                }
                let last = stop_at_ms.last().copied().unwrap_or(0.0);
                let gap = stagger_override.unwrap_or_else(|| match stop_at_ms.len() {
                    0 | 1 => 0.0,
                    n => stop_at_ms[n - 1] - stop_at_ms[n - 2],
                });
                let extra = (index + 1).saturating_sub(stop_at_ms.len()) as f64;
                last + extra * gap
            }
        }
    }

    /// Session-relative time actor `index` must be at rest (ms)
    pub fn settle_by_ms(&self, index: usize, stagger_override: Option<f64>) -> f64 {
        self.stop_at_ms(index, stagger_override) + self.phase_durations.deceleration_ms
    }

    /// Check every magnitude and schedule
    pub fn validate(&self) -> Result<(), SpinError> {
        let fail = |reason: &str| {
            Err(SpinError::InvalidProfile {
                profile: self.name.as_str().to_string(),
                reason: reason.to_string(),
            })
        };
        let positive = |v: f32| v.is_finite() && v > 0.0;
        let positive_ms = |v: f64| v.is_finite() && v > 0.0;

        if !positive(self.acceleration) {
            return fail("acceleration must be positive");
        }
        if !positive(self.max_velocity) {
            return fail("max_velocity must be positive");
        }
        if !positive(self.deceleration) {
            return fail("deceleration must be positive");
        }
        if !positive(self.item_pitch) {
            return fail("item_pitch must be positive");
        }
        if !(self.settle_rate > 0.0 && self.settle_rate <= 1.0) {
            return fail("settle_rate must be in (0, 1]");
        }
        if !positive(self.settle_epsilon) {
            return fail("settle_epsilon must be positive");
        }
        let (lo, hi) = self.initial_velocity;
        if !(lo.is_finite() && hi.is_finite() && lo >= 0.0 && lo <= hi) {
            return fail("initial_velocity must be a non-negative range");
        }
        if !(self.blur.light > 0.0 && self.blur.light <= self.blur.heavy) {
            return fail("blur thresholds must be positive and ordered");
        }
        if !(self.wobble.is_finite() && self.wobble >= 0.0) {
            return fail("wobble must be non-negative");
        }

        let timing = &self.phase_durations;
        if !(timing.start_stagger_ms.is_finite() && timing.start_stagger_ms >= 0.0) {
            return fail("start_stagger_ms must be non-negative");
        }
        if !positive_ms(timing.deceleration_ms) {
            return fail("deceleration_ms must be positive");
        }
        if !positive_ms(timing.safety_timeout_ms) {
            return fail("safety_timeout_ms must be positive");
        }
        if let AccelerationEnd::AfterMs(ms) = timing.acceleration_end {
            if !positive_ms(ms) {
                return fail("acceleration duration must be positive");
            }
        }
        match &timing.stop {
            StopSchedule::Relative {
                base_ms,
                column_delay_ms,
            } => {
                if !positive_ms(*base_ms) {
                    return fail("base_ms must be positive");
                }
                if !(column_delay_ms.is_finite() && *column_delay_ms >= 0.0) {
                    return fail("column_delay_ms must be non-negative");
                }
            }
            StopSchedule::Absolute { stop_at_ms } => {
                if stop_at_ms.is_empty() {
                    return fail("absolute schedule needs at least one stop time");
                }
                if !stop_at_ms.iter().all(|t| positive_ms(*t)) {
                    return fail("stop times must be positive");
                }
                if stop_at_ms.windows(2).any(|w| w[1] < w[0]) {
                    return fail("stop times must be non-decreasing");
                }
            }
        }

        if let Some(bounce) = &self.bounce {
            if !(self.bounce_dampening > 0.0 && self.bounce_dampening < 1.0) {
                return fail("bounce dampening must be in (0, 1)");
            }
            if !positive(bounce.gravity)
                || !positive(bounce.impact_velocity)
                || !positive(bounce.min_velocity)
            {
                return fail("bounce magnitudes must be positive");
            }
        }
        Ok(())
    }
}

/// The profiles a session can resolve by name
#[derive(Debug, Clone)]
pub struct ProfileSet {
    profiles: HashMap<ProfileName, PhysicsProfile>,
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileSet {
    pub fn builtin() -> Self {
        let profiles = ProfileName::ALL
            .iter()
            .map(|name| (*name, PhysicsProfile::builtin(*name)))
            .collect();
        Self { profiles }
    }

    /// Empty set; useful for exercising the missing-profile path
    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Builtins with whole-profile overrides from a JSON object keyed by name
    pub fn from_json(json: &str) -> Result<Self, SpinError> {
        let overrides: HashMap<ProfileName, PhysicsProfile> =
            serde_json::from_str(json).map_err(|e| SpinError::Overrides(e.to_string()))?;
        let mut set = Self::builtin();
        for (name, mut profile) in overrides {
            profile.name = name;
            set.insert(profile)?;
        }
        Ok(set)
    }

    /// Add or replace a profile after validating it
    pub fn insert(&mut self, profile: PhysicsProfile) -> Result<(), SpinError> {
        profile.validate()?;
        log::debug!("Registered profile {}", profile.name.as_str());
        self.profiles.insert(profile.name, profile);
        Ok(())
    }

    pub fn get(&self, name: ProfileName) -> Result<&PhysicsProfile, SpinError> {
        self.profiles
            .get(&name)
            .ok_or_else(|| SpinError::UnknownProfile(name.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_validate() {
        for name in ProfileName::ALL {
            let profile = PhysicsProfile::builtin(name);
            assert_eq!(profile.name, name);
            assert!(profile.validate().is_ok(), "{} failed", name.as_str());
        }
    }

    #[test]
    fn test_name_round_trip() {
        for name in ProfileName::ALL {
            assert_eq!(ProfileName::from_str(name.as_str()), Some(name));
        }
        assert_eq!(ProfileName::from_str("regular"), Some(ProfileName::RegularSpin));
        assert_eq!(ProfileName::from_str("nope"), None);
    }

    #[test]
    fn test_final_flag_upgrades_regular_only() {
        assert_eq!(ProfileName::RegularSpin.resolve(true), ProfileName::FinalSpin);
        assert_eq!(ProfileName::RegularSpin.resolve(false), ProfileName::RegularSpin);
        assert_eq!(ProfileName::PriceWheel.resolve(true), ProfileName::PriceWheel);
    }

    #[test]
    fn test_relative_stop_schedule() {
        let p = PhysicsProfile::regular_spin();
        assert_eq!(p.stop_at_ms(0, None), 800.0);
        assert_eq!(p.stop_at_ms(2, None), 1300.0);
        assert_eq!(p.settle_by_ms(2, None), 1700.0);
        assert_eq!(p.stop_at_ms(2, Some(100.0)), 1000.0);
    }

    #[test]
    fn test_absolute_stop_schedule_extrapolates() {
        let p = PhysicsProfile::final_spin();
        assert_eq!(p.stop_at_ms(0, None), 1400.0);
        assert_eq!(p.stop_at_ms(2, None), 3000.0);
        // Past the table: last gap (800) repeats
        assert_eq!(p.stop_at_ms(3, None), 3800.0);
        assert_eq!(p.stop_at_ms(4, None), 4600.0);
        assert_eq!(p.stop_at_ms(3, Some(100.0)), 3100.0);
    }

    #[test]
    fn test_validate_rejects_bad_magnitudes() {
        let mut p = PhysicsProfile::regular_spin();
        p.max_velocity = 0.0;
        assert!(matches!(p.validate(), Err(SpinError::InvalidProfile { .. })));

        let mut p = PhysicsProfile::regular_spin();
        p.acceleration = f32::NAN;
        assert!(p.validate().is_err());

        let mut p = PhysicsProfile::final_spin();
        p.phase_durations.stop = StopSchedule::Absolute {
            stop_at_ms: vec![2000.0, 1000.0],
        };
        assert!(p.validate().is_err());

        let mut p = PhysicsProfile::roulette_ball();
        p.bounce_dampening = 1.5;
        assert!(p.validate().is_err());

        // Dampening only matters for profiles that bounce
        let mut p = PhysicsProfile::roulette_wheel();
        p.bounce_dampening = 1.5;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_profile_set_lookup() {
        let set = ProfileSet::builtin();
        assert!(set.get(ProfileName::PriceWheel).is_ok());
        assert_eq!(
            ProfileSet::empty().get(ProfileName::FinalSpin).unwrap_err(),
            SpinError::UnknownProfile("FINAL_SPIN".to_string())
        );
        assert!(ProfileSet::empty().get(ProfileName::RegularSpin).is_err());
    }

    #[test]
    fn test_profile_set_json_overrides() {
        let mut fast = PhysicsProfile::regular_spin();
        fast.max_velocity = 6000.0;
        let json = serde_json::json!({ "REGULAR_SPIN": fast }).to_string();
        let set = ProfileSet::from_json(&json).unwrap();
        assert_eq!(set.get(ProfileName::RegularSpin).unwrap().max_velocity, 6000.0);
        assert_eq!(set.get(ProfileName::FinalSpin).unwrap().max_velocity, 5200.0);

        let mut broken = PhysicsProfile::regular_spin();
        broken.item_pitch = -1.0;
        let json = serde_json::json!({ "REGULAR_SPIN": broken }).to_string();
        assert!(ProfileSet::from_json(&json).is_err());
        assert!(matches!(ProfileSet::from_json("{"), Err(SpinError::Overrides(_))));
    }
}
