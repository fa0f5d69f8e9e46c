//! Loadout Reels entry point
//!
//! The browser build is driven through `platform::web::ReelEngine`. Natively
//! this runs a headless demo: three reels and a roulette spin under a virtual
//! 60 Hz clock, logging the results.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Loadout Reels (native) starting...");
    log::info!("Browser builds drive ReelEngine from JS; running the headless demo");

    demo::run_reels();
    demo::run_roulette();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::start, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::cell::RefCell;
    use std::rc::Rc;

    use loadout_reels::consts::FRAME_DT_MS;
    use loadout_reels::roulette;
    use loadout_reels::sim::{
        AnimationSession, SpinEvent, SpinListener, SpinOptions, SpinResults, VirtualClock,
    };
    use loadout_reels::surface::{RecordingHandle, VisualHandle};
    use loadout_reels::{ProfileName, error::ListenerError};

    /// Logs phase changes the way a sound cue would hear them
    struct CueLogger;

    impl SpinListener for CueLogger {
        fn on_event(&mut self, event: &SpinEvent) -> Result<(), ListenerError> {
            if let SpinEvent::PhaseChanged { actor, to, at_ms, .. } = event {
                log::debug!("cue: actor {actor} -> {} @ {at_ms:.0}ms", to.as_str());
            }
            Ok(())
        }
    }

    fn drive(
        session: &mut AnimationSession<RecordingHandle>,
        clock: &VirtualClock,
        done: &Rc<RefCell<Option<SpinResults>>>,
    ) {
        while done.borrow().is_none() {
            let now = clock.advance(FRAME_DT_MS);
            if !session.tick(now) {
                break;
            }
        }
    }

    pub fn run_reels() {
        let clock = VirtualClock::new();
        let mut session = AnimationSession::new(clock.clone());
        session.set_listener(CueLogger);

        let reels: Vec<RecordingHandle> = ["primary", "secondary", "class"]
            .iter()
            .map(|id| RecordingHandle::new(*id))
            .collect();
        let outcomes = vec!["M4A1".to_string(), "Desert Eagle".to_string(), "Recon".to_string()];
        let options = SpinOptions {
            symbols: ["M4A1", "AK-47", "MP5", "Desert Eagle", "Glock", "Recon", "Assault", "Support"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        };

        let done = Rc::new(RefCell::new(None));
        let sink = done.clone();
        match session.spin(reels.clone(), outcomes, ProfileName::RegularSpin, options, move |r| {
            *sink.borrow_mut() = Some(r)
        }) {
            Ok(start) => log::info!("Reels: {start:?}"),
            Err(e) => {
                log::error!("Reel spin rejected: {e}");
                return;
            }
        }
        drive(&mut session, &clock, &done);

        if let Some(results) = done.borrow().as_ref() {
            println!("Reels ({:?}, {:.0}ms): {:?}", results.reason, results.elapsed_ms, results.values());
        }
        for reel in &reels {
            println!("  {} received {} frames", reel.id(), reel.frames().len());
        }
    }

    pub fn run_roulette() {
        let clock = VirtualClock::new();
        let mut session = AnimationSession::new(clock.clone());
        let (outcomes, options) = match roulette::request(23, None) {
            Ok(request) => request,
            Err(e) => {
                log::error!("Roulette request rejected: {e}");
                return;
            }
        };

        let done = Rc::new(RefCell::new(None));
        let sink = done.clone();
        let handles = vec![RecordingHandle::new("wheel"), RecordingHandle::new("ball")];
        if let Err(e) = session.spin(handles, outcomes, ProfileName::RouletteWheel, options, move |r| {
            *sink.borrow_mut() = Some(r)
        }) {
            log::error!("Roulette spin rejected: {e}");
            return;
        }
        drive(&mut session, &clock, &done);

        if let Some(results) = done.borrow().as_ref() {
            println!("Roulette ({:?}, {:.0}ms): {:?}", results.reason, results.elapsed_ms, results.values());
        }
    }
}
