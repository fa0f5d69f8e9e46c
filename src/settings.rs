//! Engine preferences
//!
//! Persisted separately from loadout history in LocalStorage.

use serde::{Deserialize, Serialize};

/// LocalStorage key
#[cfg(target_arch = "wasm32")]
const STORAGE_KEY: &str = "loadout_reels_settings";

/// User-facing animation preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Reduced motion (no wobble, no blur)
    pub reduced_motion: bool,
    /// Velocity-driven blur classes
    pub blur_effects: bool,
    /// Cosmetic jitter while reels cruise
    pub wobble: bool,
    /// Forward item-crossing events to the listener (tick sounds)
    pub tick_sounds: bool,
    /// Cap on memoized descriptors; unbounded when absent
    pub cache_capacity: Option<usize>,
    /// Replaces the profiles' safety timeout (ms)
    pub safety_timeout_ms: Option<f64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reduced_motion: false,
            blur_effects: true,
            wobble: true,
            tick_sounds: true,
            cache_capacity: Some(64),
            safety_timeout_ms: None,
        }
    }
}

impl EngineSettings {
    /// Effective wobble (respects reduced_motion)
    pub fn effective_wobble(&self) -> bool {
        self.wobble && !self.reduced_motion
    }

    /// Effective blur (respects reduced_motion)
    pub fn effective_blur(&self) -> bool {
        self.blur_effects && !self.reduced_motion
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str(&json) {
                    log::info!("Loaded engine settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default engine settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(STORAGE_KEY, &json);
                log::info!("Engine settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
