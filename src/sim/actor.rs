//! Kinematic actor
//!
//! One reel, wheel or ball. The actor owns its true position and velocity and
//! steps through `waiting → accelerating → cruising → decelerating →
//! (bouncing) → settling → settled`. Randomness only touches the start state
//! and the display wobble; the landing position comes from the plan.

use rand::Rng;
use rand_pcg::Pcg32;

use super::events::SpinEvent;
use super::phase::{Deceleration, Phase, PhaseKind};
use crate::consts::{MAX_FRAME_DT, MAX_TRANSITIONS_PER_TICK};
use crate::plan::{ActorPlan, Track};
use crate::profile::{AccelerationEnd, ActorKind, PhysicsProfile};
use crate::roulette::ball_radius;
use crate::surface::{BlurLevel, Transform, VisualFrame, blur_level};
use crate::{normalize_position, polar_to_cartesian, wrapped_delta};

/// Cap on pocket-wall contacts before the ball is forced to settle
const MAX_BOUNCES: u32 = 32;
/// Wobble angular frequency (rad/ms)
const WOBBLE_FREQ: f64 = 0.018;

/// Display-only switches (from user settings)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    pub wobble: bool,
    pub blur: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            wobble: true,
            blur: true,
        }
    }
}

/// One independently animated unit
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub index: usize,
    /// True position, wrapped to the track period
    pub position: f32,
    /// units/s, forward is positive
    pub velocity: f32,
    phase: Phase,
    pub target_position: f32,
    /// Absolute ms at which deceleration begins
    pub stop_at: f64,
    /// Absolute ms at which deceleration ends
    pub settle_by: f64,
    profile: PhysicsProfile,
    track: Track,
    display: DisplayOptions,
    wobble_phase: f32,
    last_item: usize,
}

impl Actor {
    /// Build an actor for `plan`, with a random start state
    pub fn new(
        id: impl Into<String>,
        plan: &ActorPlan,
        profile: PhysicsProfile,
        session_start: f64,
        rng: &mut Pcg32,
        display: DisplayOptions,
    ) -> Self {
        let (lo, hi) = profile.initial_velocity;
        let velocity = if hi > lo { rng.random_range(lo..hi) } else { lo };
        let start_item = rng.random_range(0..plan.track.items.len().max(1));
        let position = plan.track.position_of(start_item);
        let wobble_phase = rng.random_range(0.0..std::f32::consts::TAU);
        Self::with_state(id, plan, profile, session_start, position, velocity, display, wobble_phase)
    }

    /// Build an actor with an explicit start state
    #[allow(clippy::too_many_arguments)]
    pub fn with_state(
        id: impl Into<String>,
        plan: &ActorPlan,
        profile: PhysicsProfile,
        session_start: f64,
        position: f32,
        velocity: f32,
        display: DisplayOptions,
        wobble_phase: f32,
    ) -> Self {
        let track = plan.track.clone();
        let position = if position.is_finite() {
            normalize_position(position, track.period())
        } else {
            position
        };
        let last_item = track.index_at(if position.is_finite() { position } else { 0.0 });
        Self {
            id: id.into(),
            index: plan.index,
            position,
            velocity,
            phase: Phase::Waiting {
                start_at: session_start + plan.start_at_ms,
            },
            target_position: plan.target_position,
            stop_at: session_start + plan.stop_at_ms,
            settle_by: session_start + plan.settle_by_ms,
            profile,
            track,
            display,
            wobble_phase,
            last_item,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn phase_kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }

    pub fn profile(&self) -> &PhysicsProfile {
        &self.profile
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Item currently shown at the actor's position
    pub fn final_value(&self) -> &str {
        self.track.item_at(self.position)
    }

    /// Wrap a position onto this actor's track
    pub fn normalize_position(&self, position: f32) -> f32 {
        normalize_position(position, self.track.period())
    }

    /// Advance one tick; returns the events this tick produced
    pub fn update(&mut self, now: f64, dt: f32) -> Vec<SpinEvent> {
        let mut events = Vec::new();
        if self.is_settled() {
            return events;
        }
        if !self.position.is_finite() || !self.velocity.is_finite() {
            log::warn!(
                "Actor {} has non-finite state (pos={}, vel={}); snapping to target",
                self.id,
                self.position,
                self.velocity
            );
            events.extend(self.force_stop(now));
            return events;
        }

        let mut dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };
        for _ in 0..MAX_TRANSITIONS_PER_TICK {
            let before = self.phase.kind();
            self.step(now, dt);
            let after = self.phase.kind();
            if before == after {
                break;
            }
            log::debug!("Actor {} {} -> {}", self.id, before.as_str(), after.as_str());
            events.push(SpinEvent::PhaseChanged {
                actor: self.index,
                from: before,
                to: after,
                at_ms: now,
            });
            // Follow-on transitions in the same tick are instantaneous
            dt = 0.0;
        }

        if !self.position.is_finite() || !self.velocity.is_finite() {
            log::warn!("Actor {} diverged during update; snapping to target", self.id);
            events.extend(self.force_stop(now));
            return events;
        }

        let item = self.track.index_at(self.position);
        if item != self.last_item {
            self.last_item = item;
            events.push(SpinEvent::ItemPassed {
                actor: self.index,
                item,
                at_ms: now,
            });
        }
        events
    }

    /// Zero velocity, snap to target, jump to settled
    pub fn force_stop(&mut self, now: f64) -> Option<SpinEvent> {
        self.velocity = 0.0;
        self.position = self.target_position;
        self.last_item = self.track.index_at(self.position);
        let from = self.phase.kind();
        if from == PhaseKind::Settled {
            return None;
        }
        self.phase = Phase::Settled;
        Some(SpinEvent::PhaseChanged {
            actor: self.index,
            from,
            to: PhaseKind::Settled,
            at_ms: now,
        })
    }

    fn advance(&mut self, dt: f32) {
        self.position = self.normalize_position(self.position + self.velocity * dt);
    }

    fn begin_deceleration(&mut self, now: f64) {
        let landing = Deceleration::plan(
            self.position,
            self.velocity,
            self.target_position,
            self.track.period(),
            self.profile.deceleration,
            now,
            self.settle_by,
        );
        self.phase = Phase::Decelerating(landing);
    }

    fn step(&mut self, now: f64, dt: f32) {
        match self.phase {
            Phase::Waiting { start_at } => {
                if now >= start_at {
                    self.phase = Phase::Accelerating { started_at: now };
                }
            }
            Phase::Accelerating { started_at } => {
                if now >= self.stop_at {
                    self.begin_deceleration(now);
                    return;
                }
                let max = self.profile.max_velocity;
                self.velocity = (self.velocity + self.profile.acceleration * dt).min(max);
                self.advance(dt);
                let done = match self.profile.phase_durations.acceleration_end {
                    AccelerationEnd::AtMaxVelocity => self.velocity >= max,
                    AccelerationEnd::AfterMs(ms) => now - started_at >= ms || self.velocity >= max,
                };
                if done {
                    self.phase = Phase::Cruising;
                }
            }
            Phase::Cruising => {
                if now >= self.stop_at {
                    self.begin_deceleration(now);
                    return;
                }
                self.advance(dt);
            }
            Phase::Decelerating(landing) => {
                let u = landing.progress(now);
                if u >= 1.0 {
                    self.position = self.normalize_position(landing.landing());
                    self.velocity = 0.0;
                    self.phase = match self.profile.bounce {
                        Some(bounce) => {
                            // Ball strikes the pocket wall and rebounds
                            self.velocity = -bounce.impact_velocity * self.profile.bounce_dampening;
                            Phase::Bouncing {
                                offset: 0.0,
                                bounces: 1,
                            }
                        }
                        None => Phase::Settling,
                    };
                } else {
                    self.position = self.normalize_position(landing.position_at(u));
                    self.velocity = landing.velocity_at(u);
                }
            }
            Phase::Bouncing { offset, bounces } => {
                let Some(bounce) = self.profile.bounce else {
                    self.phase = Phase::Settling;
                    return;
                };
                self.velocity += bounce.gravity * dt;
                let mut offset = offset + self.velocity * dt;
                let mut bounces = bounces;
                let mut next = None;
                // Contact only while moving into the wall
                if offset >= 0.0 && self.velocity > 0.0 {
                    offset = 0.0;
                    let rebound = self.velocity * self.profile.bounce_dampening;
                    if rebound < bounce.min_velocity || bounces >= MAX_BOUNCES {
                        self.velocity = 0.0;
                        next = Some(Phase::Settling);
                    } else {
                        self.velocity = -rebound;
                        bounces += 1;
                    }
                }
                self.position = self.normalize_position(self.target_position + offset);
                self.phase = next.unwrap_or(Phase::Bouncing { offset, bounces });
            }
            Phase::Settling => {
                let period = self.track.period();
                let epsilon = self.profile.settle_epsilon;
                let error = wrapped_delta(self.position, self.target_position, period);
                if error.abs() > epsilon {
                    let fraction = 1.0 - (1.0 - self.profile.settle_rate).powf(dt * 60.0);
                    self.position = self.normalize_position(self.position + error * fraction);
                    self.velocity = error * fraction / dt.max(f32::EPSILON);
                }
                let error = wrapped_delta(self.position, self.target_position, period);
                if error.abs() <= epsilon {
                    self.position = self.target_position;
                    self.velocity = 0.0;
                    self.phase = Phase::Settled;
                }
            }
            Phase::Settled => {}
        }
    }

    /// Display position: true position plus cosmetic wobble while spinning
    pub fn display_position(&self, now: f64) -> f32 {
        let spinning = self.phase.kind().is_spinning();
        if !(self.display.wobble && spinning) || self.profile.wobble <= 0.0 {
            return self.position;
        }
        let jitter = (self.wobble_phase as f64 + now * WOBBLE_FREQ).sin() as f32 * self.profile.wobble;
        self.position + jitter
    }

    /// Frame to write to the visual handle
    pub fn frame(&self, now: f64) -> VisualFrame {
        let display = self.display_position(now);
        let transform = match self.profile.kind {
            ActorKind::Reel => Transform::Translate(glam::Vec2::new(
                0.0,
                -self.normalize_position(display),
            )),
            ActorKind::Wheel => Transform::Rotate(-self.normalize_position(display)),
            ActorKind::Ball => {
                let angle = self.normalize_position(display);
                let speed_fraction = self.velocity.abs() / self.profile.max_velocity;
                let radius = if self.is_settled() {
                    ball_radius(0.0)
                } else {
                    ball_radius(speed_fraction)
                };
                Transform::Orbit {
                    angle,
                    offset: polar_to_cartesian(radius, (angle - 90.0).to_radians()),
                }
            }
        };
        let blur = if self.display.blur {
            blur_level(self.velocity, &self.profile.blur)
        } else {
            BlurLevel::None
        };
        VisualFrame {
            transform,
            blur,
            phase: self.phase.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanRequest, plan_spin};
    use crate::profile::{ProfileName, ProfileSet};
    use crate::roulette;
    use rand::SeedableRng;

    fn reel_plan() -> ActorPlan {
        let request = PlanRequest {
            outcomes: vec!["Deagle".to_string()],
            profiles: vec![ProfileName::RegularSpin],
            stagger_ms: None,
            symbols: vec!["Deagle".into(), "Knife".into(), "Crossbow".into()],
        };
        plan_spin(&request, &ProfileSet::builtin())
            .unwrap()
            .rotation_plan
            .remove(0)
    }

    fn reel_actor(velocity: f32) -> Actor {
        Actor::with_state(
            "reel-0",
            &reel_plan(),
            PhysicsProfile::regular_spin(),
            0.0,
            0.0,
            velocity,
            DisplayOptions::default(),
            0.0,
        )
    }

    fn run_to(actor: &mut Actor, end_ms: f64) -> Vec<SpinEvent> {
        let mut events = Vec::new();
        let mut t = 0.0;
        while t < end_ms {
            let next = (t + 16.0_f64).min(end_ms);
            events.extend(actor.update(next, ((next - t) / 1000.0) as f32));
            t = next;
        }
        events
    }

    #[test]
    fn test_nan_velocity_snaps_to_target() {
        let mut actor = reel_actor(f32::NAN);
        actor.update(16.0, 0.016);
        assert_eq!(actor.velocity, 0.0);
        assert_eq!(actor.phase_kind(), PhaseKind::Settled);
        assert_eq!(actor.position, actor.target_position);
        assert_eq!(actor.final_value(), "Deagle");
    }

    #[test]
    fn test_infinite_position_snaps_to_target() {
        let mut actor = reel_actor(100.0);
        actor.position = f32::INFINITY;
        let events = actor.update(16.0, 0.016);
        assert!(actor.is_settled());
        assert_eq!(actor.position, actor.target_position);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_velocity_clamped_to_max() {
        let mut actor = reel_actor(4900.0);
        actor.update(1.0, 0.0); // waiting -> accelerating
        assert_eq!(actor.phase_kind(), PhaseKind::Accelerating);
        // dt is capped at MAX_FRAME_DT; 4900 + 8000 * 0.1 still overshoots
        actor.update(100.0, 0.75);
        assert!(actor.velocity <= 5000.0);
        assert_eq!(actor.velocity, 5000.0);
        assert_eq!(actor.phase_kind(), PhaseKind::Cruising);
    }

    #[test]
    fn test_waits_for_start_offset() {
        let mut plan = reel_plan();
        plan.start_at_ms = 120.0;
        let mut actor = Actor::with_state(
            "reel-2",
            &plan,
            PhysicsProfile::regular_spin(),
            1000.0,
            0.0,
            0.0,
            DisplayOptions::default(),
            0.0,
        );
        actor.update(1100.0, 0.016);
        assert_eq!(actor.phase_kind(), PhaseKind::Waiting);
        actor.update(1120.0, 0.016);
        assert_eq!(actor.phase_kind(), PhaseKind::Accelerating);
    }

    #[test]
    fn test_lands_on_target_by_deadline() {
        let mut actor = reel_actor(250.0);
        let events = run_to(&mut actor, 1200.0);
        assert!(actor.is_settled());
        assert_eq!(actor.position, actor.target_position);
        assert_eq!(actor.final_value(), "Deagle");

        let kinds: Vec<PhaseKind> = events
            .iter()
            .filter_map(|e| match e {
                SpinEvent::PhaseChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                PhaseKind::Accelerating,
                PhaseKind::Cruising,
                PhaseKind::Decelerating,
                PhaseKind::Settling,
                PhaseKind::Settled,
            ]
        );
        assert!(events.iter().any(|e| matches!(e, SpinEvent::ItemPassed { .. })));
    }

    #[test]
    fn test_not_settled_before_deadline() {
        let mut actor = reel_actor(0.0);
        run_to(&mut actor, 1190.0);
        assert_eq!(actor.phase_kind(), PhaseKind::Decelerating);
    }

    #[test]
    fn test_force_stop_is_idempotent() {
        let mut actor = reel_actor(300.0);
        assert!(actor.force_stop(5.0).is_some());
        assert!(actor.force_stop(6.0).is_none());
        assert!(actor.update(7.0, 0.016).is_empty());
    }

    #[test]
    fn test_blur_follows_velocity() {
        let mut actor = reel_actor(0.0);
        assert_eq!(actor.frame(0.0).blur, BlurLevel::None);
        actor.velocity = 3000.0;
        assert_eq!(actor.frame(0.0).blur, BlurLevel::Heavy);

        let mut calm = Actor::with_state(
            "reel-1",
            &reel_plan(),
            PhysicsProfile::regular_spin(),
            0.0,
            0.0,
            3000.0,
            DisplayOptions {
                wobble: false,
                blur: false,
            },
            0.0,
        );
        calm.velocity = 3000.0;
        assert_eq!(calm.frame(0.0).blur, BlurLevel::None);
    }

    #[test]
    fn test_wobble_is_display_only() {
        let mut actor = reel_actor(5000.0);
        actor.update(1.0, 0.0);
        actor.update(17.0, 0.016);
        assert_eq!(actor.phase_kind(), PhaseKind::Cruising);
        let shown = actor.display_position(500.0);
        assert!((shown - actor.position).abs() <= actor.profile().wobble + 1e-3);
        assert!(actor.position.is_finite());
    }

    #[test]
    fn test_random_start_stays_on_track() {
        let plan = reel_plan();
        let mut rng = Pcg32::seed_from_u64(42);
        let actor = Actor::new(
            "reel-0",
            &plan,
            PhysicsProfile::regular_spin(),
            0.0,
            &mut rng,
            DisplayOptions::default(),
        );
        assert!(actor.position >= 0.0 && actor.position < plan.track.period());
        assert!(actor.velocity >= 0.0 && actor.velocity < 600.0);
        assert_eq!(actor.phase_kind(), PhaseKind::Waiting);
    }

    #[test]
    fn test_step_clamps_unbounded_dt() {
        let mut actor = reel_actor(4900.0);
        actor.phase = Phase::Accelerating { started_at: 0.0 };
        // 4900 + 8000 * 0.75 = 10900 unclamped, past 6000
        actor.step(100.0, 0.75);
        assert_eq!(actor.velocity, 5000.0);
        assert_eq!(actor.phase_kind(), PhaseKind::Cruising);
    }

    #[test]
    fn test_settling_is_critically_damped() {
        for offset in [40.0_f32, -40.0, 55.5] {
            let mut actor = reel_actor(0.0);
            let period = actor.track().period();
            actor.phase = Phase::Settling;
            actor.position = actor.normalize_position(actor.target_position - offset);
            let mut last = wrapped_delta(actor.position, actor.target_position, period);
            let sign = last.signum();

            let mut t = 0.0;
            while !actor.is_settled() {
                t += 16.0;
                actor.update(t, 0.016);
                let error = wrapped_delta(actor.position, actor.target_position, period);
                assert!(error == 0.0 || error.signum() == sign, "overshot at {t}: {error}");
                assert!(error.abs() < last.abs(), "stalled at {t}: {error}");
                last = error;
                assert!(t < 2000.0, "never settled");
            }
            assert_eq!(actor.position, actor.target_position);
        }
    }

    fn ball_actor(dampening: f32) -> Actor {
        let (outcomes, options) = roulette::request(17, Some(1)).unwrap();
        let request = PlanRequest {
            outcomes: vec![outcomes[1].clone()],
            profiles: vec![ProfileName::RouletteBall],
            stagger_ms: None,
            symbols: options.symbols,
        };
        let plan = plan_spin(&request, &ProfileSet::builtin())
            .unwrap()
            .rotation_plan
            .remove(0);
        let mut profile = PhysicsProfile::roulette_ball();
        profile.bounce_dampening = dampening;
        Actor::with_state("ball", &plan, profile, 0.0, 0.0, 300.0, DisplayOptions::default(), 0.0)
    }

    /// (rebound velocity on entering bouncing, time settled)
    fn bounce_profile(dampening: f32) -> (f32, f64) {
        let mut actor = ball_actor(dampening);
        let mut rebound = None;
        let mut t = 0.0;
        while !actor.is_settled() && t < 8000.0 {
            t += 16.0;
            actor.update(t, 0.016);
            if rebound.is_none() && actor.phase_kind() == PhaseKind::Bouncing {
                rebound = Some(actor.velocity);
            }
        }
        assert!(actor.is_settled());
        assert_eq!(actor.final_value(), "17");
        (rebound.unwrap(), t)
    }

    #[test]
    fn test_bounce_dampening_drives_rebound() {
        let (soft, soft_done) = bounce_profile(0.2);
        let (lively, lively_done) = bounce_profile(0.8);
        assert!((soft + 120.0 * 0.2).abs() < 1e-3, "{soft}");
        assert!((lively + 120.0 * 0.8).abs() < 1e-3, "{lively}");
        assert!(lively_done > soft_done);
    }
}
