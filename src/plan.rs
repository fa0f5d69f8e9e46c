//! Spin planning
//!
//! Turns a request (outcomes + profiles) into an `AnimationDescriptor`: the
//! track each actor runs on, where it must stop and when. Planning is a pure
//! function of its inputs so descriptors can be memoized and recomputed
//! interchangeably.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::cache::generate_key;
use crate::consts::{REEL_STRIP_LEN, REEL_WINNER_INDEX};
use crate::error::SpinError;
use crate::normalize_position;
use crate::profile::{ActorKind, ProfileName, ProfileSet};

/// Ordered items an actor travels over, wrapping at `period()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub items: Vec<String>,
    /// Distance between consecutive items (px or degrees)
    pub span: f32,
    /// Fraction of a span the rest position sits past the item start
    /// (0 for reels, 0.5 for wheel segment centers)
    pub align: f32,
}

impl Track {
    pub fn period(&self) -> f32 {
        self.items.len() as f32 * self.span
    }

    /// Rest position that shows item `index`
    pub fn position_of(&self, index: usize) -> f32 {
        (index as f32 + self.align) * self.span
    }

    /// Item index shown at `position`
    pub fn index_at(&self, position: f32) -> usize {
        let n = self.items.len().max(1) as i64;
        let p = normalize_position(position, self.period());
        let raw = (p / self.span - self.align + 0.5).floor() as i64;
        raw.rem_euclid(n) as usize
    }

    pub fn item_at(&self, position: f32) -> &str {
        self.items
            .get(self.index_at(position))
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Per-actor rotation plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorPlan {
    pub index: usize,
    pub profile: ProfileName,
    pub track: Track,
    pub target_index: usize,
    pub target_position: f32,
    /// Session-relative ms
    pub start_at_ms: f64,
    pub stop_at_ms: f64,
    pub settle_by_ms: f64,
}

/// Memoizable result of planning one spin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationDescriptor {
    pub final_positions: Vec<f32>,
    pub rotation_plan: Vec<ActorPlan>,
    /// Time until the last actor is due at rest (ms)
    pub duration_ms: f64,
}

/// Semantic inputs of a spin; also the cache key material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub outcomes: Vec<String>,
    /// One profile per actor
    pub profiles: Vec<ProfileName>,
    pub stagger_ms: Option<f64>,
    /// Reel filler pool, or a wheel's segments in order
    pub symbols: Vec<String>,
}

impl PlanRequest {
    /// Reject request-level options no profile can make sense of
    pub fn validate(&self) -> Result<(), SpinError> {
        match self.stagger_ms {
            Some(ms) if !(ms.is_finite() && ms >= 0.0) => Err(SpinError::InvalidStagger(ms)),
            _ => Ok(()),
        }
    }

    pub fn cache_key(&self) -> Result<String, SpinError> {
        generate_key("spin", self)
    }
}

/// FNV-1a; stable across builds, unlike `DefaultHasher`
fn stable_hash(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn reel_track(outcome: &str, pool: &[String], pitch: f32, seed: u64) -> Track {
    let mut rng = Pcg32::seed_from_u64(seed);
    let items = (0..REEL_STRIP_LEN)
        .map(|slot| {
            if slot == REEL_WINNER_INDEX || pool.is_empty() {
                outcome.to_string()
            } else {
                pool[rng.random_range(0..pool.len())].clone()
            }
        })
        .collect();
    Track {
        items,
        span: pitch,
        align: 0.0,
    }
}

/// Plan a spin; deterministic for identical requests
pub fn plan_spin(request: &PlanRequest, profiles: &ProfileSet) -> Result<AnimationDescriptor, SpinError> {
    if request.outcomes.is_empty() {
        return Err(SpinError::Empty);
    }
    if request.profiles.len() != request.outcomes.len() {
        return Err(SpinError::CountMismatch {
            handles: request.profiles.len(),
            outcomes: request.outcomes.len(),
        });
    }
    request.validate()?;

    let seed = stable_hash(&request.cache_key()?);
    let mut pool: Vec<String> = if request.symbols.is_empty() {
        request.outcomes.clone()
    } else {
        request.symbols.clone()
    };
    pool.dedup();

    let mut rotation_plan = Vec::with_capacity(request.outcomes.len());
    for (index, (outcome, name)) in request.outcomes.iter().zip(&request.profiles).enumerate() {
        let profile = profiles.get(*name)?;
        profile.validate()?;

        let (track, target_index) = match profile.kind {
            ActorKind::Reel => (
                reel_track(outcome, &pool, profile.item_pitch, seed ^ index as u64),
                REEL_WINNER_INDEX,
            ),
            ActorKind::Wheel | ActorKind::Ball => {
                let target_index = request
                    .symbols
                    .iter()
                    .position(|s| s == outcome)
                    .ok_or_else(|| SpinError::UnknownOutcome {
                        index,
                        outcome: outcome.clone(),
                    })?;
                let span = 360.0 * profile.item_pitch / request.symbols.len() as f32;
                let track = Track {
                    items: request.symbols.clone(),
                    span,
                    align: 0.5,
                };
                (track, target_index)
            }
        };

        rotation_plan.push(ActorPlan {
            index,
            profile: *name,
            target_position: track.position_of(target_index),
            track,
            target_index,
            start_at_ms: profile.start_at_ms(index),
            stop_at_ms: profile.stop_at_ms(index, request.stagger_ms),
            settle_by_ms: profile.settle_by_ms(index, request.stagger_ms),
        });
    }

    let duration_ms = rotation_plan
        .iter()
        .map(|p| p.settle_by_ms)
        .fold(0.0, f64::max);
    Ok(AnimationDescriptor {
        final_positions: rotation_plan.iter().map(|p| p.target_position).collect(),
        rotation_plan,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reel_request(outcomes: &[&str]) -> PlanRequest {
        PlanRequest {
            outcomes: outcomes.iter().map(|s| s.to_string()).collect(),
            profiles: vec![ProfileName::RegularSpin; outcomes.len()],
            stagger_ms: None,
            symbols: ["AK-47", "M4", "Shotgun", "Sniper"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    #[test]
    fn test_reel_plan_places_winner() {
        let descriptor = plan_spin(&reel_request(&["A", "B", "C"]), &ProfileSet::builtin()).unwrap();
        assert_eq!(descriptor.rotation_plan.len(), 3);
        for (plan, expected) in descriptor.rotation_plan.iter().zip(["A", "B", "C"]) {
            assert_eq!(plan.track.items[plan.target_index], expected);
            assert_eq!(plan.track.items.len(), REEL_STRIP_LEN);
            assert_eq!(plan.track.item_at(plan.target_position), expected);
        }
        assert_eq!(descriptor.duration_ms, 1700.0);
        assert_eq!(descriptor.rotation_plan[1].stop_at_ms, 1050.0);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let request = reel_request(&["M4", "Sniper"]);
        let a = plan_spin(&request, &ProfileSet::builtin()).unwrap();
        let b = plan_spin(&request, &ProfileSet::builtin()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wheel_plan_uses_segment_centers() {
        let request = PlanRequest {
            outcomes: vec!["3".to_string()],
            profiles: vec![ProfileName::PriceWheel],
            stagger_ms: None,
            symbols: (1..=8).map(|n| n.to_string()).collect(),
        };
        let descriptor = plan_spin(&request, &ProfileSet::builtin()).unwrap();
        let plan = &descriptor.rotation_plan[0];
        assert_eq!(plan.target_index, 2);
        assert_eq!(plan.track.span, 45.0);
        assert_eq!(plan.target_position, 112.5);
        assert_eq!(plan.track.item_at(plan.target_position), "3");
    }

    #[test]
    fn test_wheel_outcome_must_be_on_track() {
        let request = PlanRequest {
            outcomes: vec!["99".to_string()],
            profiles: vec![ProfileName::PriceWheel],
            stagger_ms: None,
            symbols: vec!["1".to_string(), "2".to_string()],
        };
        assert_eq!(
            plan_spin(&request, &ProfileSet::builtin()).unwrap_err(),
            SpinError::UnknownOutcome {
                index: 0,
                outcome: "99".to_string()
            }
        );
    }

    #[test]
    fn test_plan_rejects_bad_shapes() {
        let mut request = reel_request(&[]);
        assert_eq!(plan_spin(&request, &ProfileSet::builtin()).unwrap_err(), SpinError::Empty);

        request.outcomes = vec!["A".to_string()];
        request.profiles = vec![];
        assert!(matches!(
            plan_spin(&request, &ProfileSet::builtin()),
            Err(SpinError::CountMismatch { .. })
        ));

        let request = reel_request(&["A"]);
        assert!(matches!(
            plan_spin(&request, &ProfileSet::empty()),
            Err(SpinError::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_plan_rejects_bad_stagger() {
        for bad in [f64::NAN, f64::INFINITY, -1000.0] {
            let mut request = reel_request(&["A", "B", "C"]);
            request.stagger_ms = Some(bad);
            assert!(matches!(
                plan_spin(&request, &ProfileSet::builtin()),
                Err(SpinError::InvalidStagger(_))
            ));
        }

        let mut request = reel_request(&["A", "B", "C"]);
        request.stagger_ms = Some(0.0);
        let descriptor = plan_spin(&request, &ProfileSet::builtin()).unwrap();
        assert_eq!(descriptor.duration_ms, 1200.0);
    }

    #[test]
    fn test_track_index_at_wraps() {
        let track = Track {
            items: vec!["a".into(), "b".into(), "c".into()],
            span: 100.0,
            align: 0.0,
        };
        assert_eq!(track.index_at(0.0), 0);
        assert_eq!(track.index_at(149.0), 1);
        assert_eq!(track.index_at(260.0), 0);
        assert_eq!(track.index_at(-100.0), 2);
    }
}
