//! Animation session and scheduler
//!
//! A session owns every actor of one spin on one surface. The host calls
//! `tick` once per animation frame with the frame timestamp; actors are stepped
//! in index order and the completion callback fires exactly once, whether the
//! actors settled, the safety deadline passed, or the spin was cancelled.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::actor::{Actor, DisplayOptions};
use super::clock::Clock;
use super::events::{CompletionReason, SpinEvent, SpinListener, dispatch};
use crate::cache::AnimationCache;
use crate::consts::{MAX_FRAME_DT, SAFETY_MARGIN_MS};
use crate::error::SpinError;
use crate::plan::{PlanRequest, plan_spin};
use crate::profile::{ProfileName, ProfileSet};
use crate::settings::EngineSettings;
use crate::surface::VisualHandle;

/// Per-request knobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinOptions {
    /// Conclusive spin (absolute per-column stop times)
    pub is_final_spin: bool,
    /// Overrides the profile's column delay / stop gap (ms)
    pub stagger_ms: Option<f64>,
    /// Reel filler pool, or a wheel's segments in order
    pub symbols: Vec<String>,
    /// Per-actor profiles; empty means every actor uses the request profile
    pub actor_profiles: Vec<ProfileName>,
    /// Path seed; random when absent
    pub seed: Option<u64>,
}

/// Result of a `spin` call that passed validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpinStart {
    /// Running; all actors due at rest after `duration_ms`
    Started { duration_ms: f64 },
    /// A spin is already running on this surface; nothing changed
    Ignored,
}

/// Final value for one handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorResult {
    pub handle_index: usize,
    pub final_value: String,
}

/// Completion payload, 1:1 with the input handles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinResults {
    pub results: Vec<ActorResult>,
    pub reason: CompletionReason,
    pub elapsed_ms: f64,
}

impl SpinResults {
    pub fn values(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.final_value.as_str()).collect()
    }
}

pub type CompletionCallback = Box<dyn FnOnce(SpinResults)>;

struct ActorSlot<H> {
    actor: Actor,
    handle: H,
}

struct ActiveSpin<H> {
    id: u64,
    slots: Vec<ActorSlot<H>>,
    started_at: f64,
    last_tick: f64,
    deadline: f64,
    on_complete: Option<CompletionCallback>,
    cancel_requested: bool,
}

/// Owner of all animation state for one spin surface
pub struct AnimationSession<H: VisualHandle> {
    profiles: ProfileSet,
    cache: AnimationCache,
    settings: EngineSettings,
    clock: Box<dyn Clock>,
    rng: Pcg32,
    listener: Option<Box<dyn SpinListener>>,
    active: Option<ActiveSpin<H>>,
    /// Id handed to the next spin that starts
    next_spin: u64,
}

impl<H: VisualHandle> AnimationSession<H> {
    /// Session with builtin profiles and default settings
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self::init(clock, ProfileSet::builtin(), EngineSettings::default())
    }

    pub fn init(clock: impl Clock + 'static, profiles: ProfileSet, settings: EngineSettings) -> Self {
        Self {
            profiles,
            cache: cache_for(&settings),
            settings,
            clock: Box::new(clock),
            rng: Pcg32::from_os_rng(),
            listener: None,
            active: None,
            next_spin: 1,
        }
    }

    pub fn set_listener(&mut self, listener: impl SpinListener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Replace preferences; display options apply from the next spin and the
    /// cache is rebuilt only when its capacity changes
    pub fn apply_settings(&mut self, settings: EngineSettings) {
        if settings.cache_capacity != self.settings.cache_capacity {
            self.cache = cache_for(&settings);
        }
        self.settings = settings;
    }

    pub fn cache(&self) -> &AnimationCache {
        &self.cache
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the running spin; frame drivers hold on to it so a callback
    /// scheduled for an earlier spin never drives a later one
    pub fn current_spin(&self) -> Option<u64> {
        self.active.as_ref().map(|spin| spin.id)
    }

    /// Actors of the running spin, in index order
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.active
            .iter()
            .flat_map(|spin| spin.slots.iter().map(|slot| &slot.actor))
    }

    /// Absolute safety deadline of the running spin
    pub fn deadline(&self) -> Option<f64> {
        self.active.as_ref().map(|spin| spin.deadline)
    }

    /// Start a spin landing each handle on its outcome
    ///
    /// Configuration errors are returned before anything changes. A call while
    /// a spin is running is a no-op.
    pub fn spin(
        &mut self,
        handles: Vec<H>,
        outcomes: Vec<String>,
        profile: ProfileName,
        options: SpinOptions,
        on_complete: impl FnOnce(SpinResults) + 'static,
    ) -> Result<SpinStart, SpinError> {
        if self.active.is_some() {
            log::warn!("Spin requested while a spin is running; ignoring");
            return Ok(SpinStart::Ignored);
        }
        if handles.len() != outcomes.len() {
            return Err(SpinError::CountMismatch {
                handles: handles.len(),
                outcomes: outcomes.len(),
            });
        }
        if handles.is_empty() {
            return Err(SpinError::Empty);
        }

        let profiles = if options.actor_profiles.is_empty() {
            vec![profile.resolve(options.is_final_spin); handles.len()]
        } else if options.actor_profiles.len() == handles.len() {
            options
                .actor_profiles
                .iter()
                .map(|p| p.resolve(options.is_final_spin))
                .collect()
        } else {
            return Err(SpinError::CountMismatch {
                handles: handles.len(),
                outcomes: options.actor_profiles.len(),
            });
        };

        let request = PlanRequest {
            outcomes,
            profiles,
            stagger_ms: options.stagger_ms,
            symbols: options.symbols,
        };
        request.validate()?;
        let key = request.cache_key()?;
        let descriptor = self
            .cache
            .get_or_try_insert_with(&key, || plan_spin(&request, &self.profiles))?;

        let mut seeded;
        let rng = match options.seed {
            Some(seed) => {
                seeded = Pcg32::seed_from_u64(seed);
                &mut seeded
            }
            None => &mut self.rng,
        };

        let now = self.clock.now_ms();
        let display = DisplayOptions {
            wobble: self.settings.effective_wobble(),
            blur: self.settings.effective_blur(),
        };
        let mut timeout: f64 = 0.0;
        let mut slots = Vec::with_capacity(handles.len());
        for (mut handle, plan) in handles.into_iter().zip(&descriptor.rotation_plan) {
            let profile = self.profiles.get(plan.profile)?.clone();
            timeout = timeout.max(profile.phase_durations.safety_timeout_ms);
            let actor = Actor::new(handle.id(), plan, profile, now, rng, display);
            handle.apply(&actor.frame(now));
            slots.push(ActorSlot { actor, handle });
        }
        // Never cut a valid schedule short: the deadline only covers stalls
        let timeout = self
            .settings
            .safety_timeout_ms
            .unwrap_or(timeout)
            .max(descriptor.duration_ms + SAFETY_MARGIN_MS);

        log::info!(
            "Spin started: {} actors, due in {:.0}ms (safety {:.0}ms)",
            slots.len(),
            descriptor.duration_ms,
            timeout
        );
        // Running flag is set before the host schedules the first tick
        let id = self.next_spin;
        self.next_spin += 1;
        self.active = Some(ActiveSpin {
            id,
            slots,
            started_at: now,
            last_tick: now,
            deadline: now + timeout,
            on_complete: Some(Box::new(on_complete)),
            cancel_requested: false,
        });
        Ok(SpinStart::Started {
            duration_ms: descriptor.duration_ms,
        })
    }

    /// Advance every actor to `timestamp` (ms); returns whether still running
    pub fn tick(&mut self, timestamp: f64) -> bool {
        let Some(spin) = self.active.as_mut() else {
            return false;
        };
        if spin.cancel_requested {
            self.finish(CompletionReason::Cancelled, timestamp);
            return false;
        }
        if timestamp >= spin.deadline {
            log::warn!("Spin exceeded its safety deadline; force-settling");
            self.finish(CompletionReason::TimedOut, timestamp);
            return false;
        }

        let dt = (((timestamp - spin.last_tick) / 1000.0) as f32).clamp(0.0, MAX_FRAME_DT);
        spin.last_tick = spin.last_tick.max(timestamp);
        let tick_sounds = self.settings.tick_sounds;
        for slot in spin.slots.iter_mut() {
            let events = slot.actor.update(timestamp, dt);
            slot.handle.apply(&slot.actor.frame(timestamp));
            for event in &events {
                if !tick_sounds && matches!(event, SpinEvent::ItemPassed { .. }) {
                    continue;
                }
                dispatch(&mut self.listener, event);
            }
        }

        if spin.slots.iter().all(|slot| slot.actor.is_settled()) {
            self.finish(CompletionReason::Settled, timestamp);
            return false;
        }
        true
    }

    /// `tick`, but only if spin `id` is still the one running
    pub fn tick_spin(&mut self, id: u64, timestamp: f64) -> bool {
        if self.current_spin() != Some(id) {
            return false;
        }
        self.tick(timestamp)
    }

    /// `check_timeout`, but only if spin `id` is still the one running
    pub fn check_timeout_for(&mut self, id: u64) -> bool {
        if self.current_spin() != Some(id) {
            return false;
        }
        self.check_timeout()
    }

    /// Watchdog entry point; completes the spin if the deadline has passed
    /// even when no frame arrived. Returns whether it fired.
    pub fn check_timeout(&mut self) -> bool {
        let now = self.clock.now_ms();
        match &self.active {
            Some(spin) if now >= spin.deadline => {
                log::warn!("Safety timeout fired without a frame; force-settling");
                self.finish(CompletionReason::TimedOut, now);
                true
            }
            _ => false,
        }
    }

    /// Force-settle everything and complete now
    pub fn stop(&mut self) {
        if self.active.is_some() {
            let now = self.clock.now_ms();
            self.finish(CompletionReason::Cancelled, now);
        }
    }

    /// Cancel at the next tick boundary
    pub fn request_cancel(&mut self) {
        if let Some(spin) = self.active.as_mut() {
            spin.cancel_requested = true;
        }
    }

    /// Stop any spin and drop cached state
    pub fn destroy(&mut self) {
        self.stop();
        self.cache.clear();
        self.listener = None;
        log::debug!("Animation session destroyed");
    }

    fn finish(&mut self, reason: CompletionReason, now: f64) {
        let Some(spin) = self.active.as_mut() else {
            return;
        };
        for slot in spin.slots.iter_mut() {
            if let Some(event) = slot.actor.force_stop(now) {
                if reason == CompletionReason::Settled {
                    log::warn!("Actor {} completed unsettled", slot.actor.id);
                }
                dispatch(&mut self.listener, &event);
            }
            slot.handle.apply(&slot.actor.frame(now));
        }
        let results = SpinResults {
            results: spin
                .slots
                .iter()
                .map(|slot| ActorResult {
                    handle_index: slot.actor.index,
                    final_value: slot.actor.final_value().to_string(),
                })
                .collect(),
            reason,
            elapsed_ms: now - spin.started_at,
        };
        let callback = spin.on_complete.take();

        dispatch(&mut self.listener, &SpinEvent::Completed { reason, at_ms: now });
        log::info!(
            "Spin complete ({:?}) after {:.0}ms: {:?}",
            reason,
            results.elapsed_ms,
            results.values()
        );
        if let Some(callback) = callback {
            callback(results);
        }
        // Cleared only once completion has fully resolved
        self.active = None;
    }
}

fn cache_for(settings: &EngineSettings) -> AnimationCache {
    match settings.cache_capacity {
        Some(cap) => AnimationCache::with_capacity(cap),
        None => AnimationCache::new(),
    }
}

impl<H: VisualHandle> Drop for AnimationSession<H> {
    fn drop(&mut self) {
        self.stop();
    }
}
