//! Actor phase state machine types
//!
//! `Phase` carries the data each stage needs, so a decelerating actor always
//! has a landing plan and a bouncing actor always has an offset.

use serde::{Deserialize, Serialize};

use crate::wrapped_delta;

/// Phase tag; declaration order is the only legal transition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PhaseKind {
    Waiting,
    Accelerating,
    Cruising,
    Decelerating,
    Bouncing,
    Settling,
    Settled,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Waiting => "waiting",
            PhaseKind::Accelerating => "accelerating",
            PhaseKind::Cruising => "cruising",
            PhaseKind::Decelerating => "decelerating",
            PhaseKind::Bouncing => "bouncing",
            PhaseKind::Settling => "settling",
            PhaseKind::Settled => "settled",
        }
    }

    /// Moving fast enough that wobble and blur apply
    pub fn is_spinning(&self) -> bool {
        matches!(self, PhaseKind::Accelerating | PhaseKind::Cruising)
    }
}

/// Current stage plus its per-stage data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Idle until the stagger offset elapses (absolute ms)
    Waiting { start_at: f64 },
    Accelerating { started_at: f64 },
    /// Blurred spin at (or near) max velocity
    Cruising,
    Decelerating(Deceleration),
    /// Ball rocking against the pocket wall; `offset` ≤ 0 from the target
    Bouncing { offset: f32, bounces: u32 },
    Settling,
    Settled,
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Waiting { .. } => PhaseKind::Waiting,
            Phase::Accelerating { .. } => PhaseKind::Accelerating,
            Phase::Cruising => PhaseKind::Cruising,
            Phase::Decelerating(_) => PhaseKind::Decelerating,
            Phase::Bouncing { .. } => PhaseKind::Bouncing,
            Phase::Settling => PhaseKind::Settling,
            Phase::Settled => PhaseKind::Settled,
        }
    }
}

/// Power ease-out landing: `from + distance * (1 - (1 - u)^exponent)`
///
/// Ends at `end_at` exactly, whatever tick detected the stop time, with
/// `from + distance` congruent to the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deceleration {
    pub from: f32,
    pub distance: f32,
    pub started_at: f64,
    pub end_at: f64,
    pub exponent: f32,
}

impl Deceleration {
    const MIN_EXPONENT: f32 = 1.2;
    const MAX_EXPONENT: f32 = 4.0;

    /// Plan a landing on `target` (wrapped) that ends at `end_at`
    pub fn plan(
        from: f32,
        velocity: f32,
        target: f32,
        period: f32,
        deceleration: f32,
        now: f64,
        end_at: f64,
    ) -> Self {
        let speed = velocity.max(0.0);
        let duration = (((end_at - now) / 1000.0) as f32).max(0.0);

        // Physical stopping distance, limited to what fits the window
        let braking = (speed * speed / (2.0 * deceleration)).min(speed * duration / 2.0);
        let min_distance = (braking * 0.5).max(0.0);
        let mut distance = braking + wrapped_delta(from + braking, target, period);
        if distance < min_distance {
            let laps = ((min_distance - distance) / period).ceil().max(1.0);
            distance += laps * period;
        }

        let exponent = if distance > 0.0 {
            (speed * duration / distance).clamp(Self::MIN_EXPONENT, Self::MAX_EXPONENT)
        } else {
            Self::MIN_EXPONENT
        };

        Self {
            from,
            distance,
            started_at: now,
            end_at: end_at.max(now),
            exponent,
        }
    }

    /// Normalized progress in [0, 1]
    pub fn progress(&self, now: f64) -> f32 {
        let span = self.end_at - self.started_at;
        if span <= 0.0 || now >= self.end_at {
            return 1.0;
        }
        (((now - self.started_at) / span) as f32).clamp(0.0, 1.0)
    }

    /// Unwrapped position at progress `u`
    pub fn position_at(&self, u: f32) -> f32 {
        self.from + self.distance * (1.0 - (1.0 - u).powf(self.exponent))
    }

    /// Velocity at progress `u` (units/s)
    pub fn velocity_at(&self, u: f32) -> f32 {
        let secs = ((self.end_at - self.started_at) / 1000.0) as f32;
        if secs <= 0.0 {
            return 0.0;
        }
        self.exponent * self.distance / secs * (1.0 - u).powf(self.exponent - 1.0)
    }

    /// Where the landing ends, unwrapped
    pub fn landing(&self) -> f32 {
        self.from + self.distance
    }
}
