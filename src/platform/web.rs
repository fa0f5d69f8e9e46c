//! Browser glue
//!
//! `ReelEngine` is the JS-facing surface: one instance per spin surface,
//! driven by `requestAnimationFrame`, with a `setTimeout` watchdog so the
//! safety deadline fires even when the tab stops delivering frames.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use crate::profile::{ProfileName, ProfileSet};
use crate::settings::EngineSettings;
use crate::sim::{AnimationSession, Clock, PhaseKind, SpinOptions, SpinResults, SpinStart};
use crate::surface::{BlurLevel, VisualFrame, VisualHandle};

type SharedSession = Rc<RefCell<AnimationSession<DomHandle>>>;

/// `performance.now()`, falling back to `Date.now()`
pub struct PerformanceClock {
    performance: Option<web_sys::Performance>,
}

impl Default for PerformanceClock {
    fn default() -> Self {
        Self {
            performance: web_sys::window().and_then(|w| w.performance()),
        }
    }
}

impl Clock for PerformanceClock {
    fn now_ms(&self) -> f64 {
        self.performance
            .as_ref()
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }
}

/// DOM element driven by one actor
pub struct DomHandle {
    id: String,
    element: HtmlElement,
    blur: Option<BlurLevel>,
    phase: Option<PhaseKind>,
}

impl DomHandle {
    pub fn by_id(id: &str) -> Option<Self> {
        let element = web_sys::window()?
            .document()?
            .get_element_by_id(id)?
            .dyn_into::<HtmlElement>()
            .ok()?;
        Some(Self {
            id: id.to_string(),
            element,
            blur: None,
            phase: None,
        })
    }
}

impl VisualHandle for DomHandle {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn apply(&mut self, frame: &VisualFrame) {
        let _ = self
            .element
            .style()
            .set_property("transform", &frame.transform.to_css());

        if self.blur != Some(frame.blur) {
            let classes = self.element.class_list();
            if let Some(old) = self.blur {
                let _ = classes.remove_1(old.class_name());
            }
            let _ = classes.add_1(frame.blur.class_name());
            self.blur = Some(frame.blur);
        }

        if self.phase != Some(frame.phase) {
            let _ = self.element.set_attribute("data-phase", frame.phase.as_str());
            self.phase = Some(frame.phase);
        }
    }
}

/// Run `f` on a fresh task so JS callbacks never re-enter a borrowed session
fn defer(f: impl FnOnce() + 'static) {
    let Some(window) = web_sys::window() else {
        log::warn!("No window; running deferred callback inline");
        f();
        return;
    };
    let closure = Closure::once(f);
    let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        closure.as_ref().unchecked_ref(),
        0,
    );
    closure.forget();
}

/// Frame driver for spin `spin`; dies once that spin is no longer running
fn request_frame(session: SharedSession, spin: u64) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once(move |time: f64| on_frame(session, spin, time));
    let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    closure.forget();
}

fn on_frame(session: SharedSession, spin: u64, time: f64) {
    let running = session.borrow_mut().tick_spin(spin, time);
    if running {
        request_frame(session, spin);
    }
}

fn schedule_watchdog(session: SharedSession, spin: u64, delay_ms: f64) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once(move || {
        session.borrow_mut().check_timeout_for(spin);
    });
    let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        closure.as_ref().unchecked_ref(),
        delay_ms.ceil().max(0.0) as i32 + 1,
    );
    closure.forget();
}

/// JS-facing engine for one spin surface
#[wasm_bindgen]
pub struct ReelEngine {
    session: SharedSession,
}

impl Default for ReelEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl ReelEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> ReelEngine {
        let session = AnimationSession::init(
            PerformanceClock::default(),
            ProfileSet::builtin(),
            EngineSettings::load(),
        );
        ReelEngine {
            session: Rc::new(RefCell::new(session)),
        }
    }

    /// Spin the elements with `element_ids` onto `outcomes`.
    ///
    /// `on_complete` receives the results as a JSON string. Returns `false`
    /// when a spin is already running (the call is ignored).
    pub fn spin(
        &self,
        element_ids: Vec<String>,
        outcomes: Vec<String>,
        profile: &str,
        options_json: &str,
        on_complete: js_sys::Function,
    ) -> Result<bool, JsValue> {
        let profile = ProfileName::from_str(profile)
            .ok_or_else(|| JsValue::from_str(&format!("unknown physics profile: {profile}")))?;
        let options: SpinOptions = if options_json.trim().is_empty() {
            SpinOptions::default()
        } else {
            serde_json::from_str(options_json).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        let handles = element_ids
            .iter()
            .map(|id| DomHandle::by_id(id).ok_or_else(|| JsValue::from_str(&format!("no element #{id}"))))
            .collect::<Result<Vec<_>, _>>()?;

        let started = self
            .session
            .borrow_mut()
            .spin(handles, outcomes, profile, options, move |results: SpinResults| {
                defer(move || match serde_json::to_string(&results) {
                    Ok(json) => {
                        if let Err(e) = on_complete.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                            log::warn!("Completion callback threw: {:?}", e);
                        }
                    }
                    Err(e) => log::warn!("Could not serialize spin results: {e}"),
                });
            })
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        match started {
            SpinStart::Started { .. } => {
                let (spin, delay) = {
                    let session = self.session.borrow();
                    let now = PerformanceClock::default().now_ms();
                    (
                        session.current_spin(),
                        session.deadline().map(|d| d - now).unwrap_or(0.0),
                    )
                };
                if let Some(spin) = spin {
                    request_frame(self.session.clone(), spin);
                    schedule_watchdog(self.session.clone(), spin, delay);
                }
                Ok(true)
            }
            SpinStart::Ignored => Ok(false),
        }
    }

    /// Force-settle and complete immediately
    pub fn stop(&self) {
        self.session.borrow_mut().stop();
    }

    /// Cancel at the next frame
    pub fn cancel(&self) {
        self.session.borrow_mut().request_cancel();
    }

    pub fn destroy(&self) {
        self.session.borrow_mut().destroy();
    }

    /// Current preferences as JSON
    pub fn settings(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.borrow().settings()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Replace preferences from (partial) JSON and persist them
    #[wasm_bindgen(js_name = setSettings)]
    pub fn set_settings(&self, settings_json: &str) -> Result<(), JsValue> {
        let settings: EngineSettings =
            serde_json::from_str(settings_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        settings.save();
        self.session.borrow_mut().apply_settings(settings);
        Ok(())
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.session.borrow().is_running()
    }
}

/// Module init: logging and panic hook
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }
    log::info!("Loadout reels engine loaded");
}
