//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Time (performance.now)
//! - Frame scheduling (requestAnimationFrame + setTimeout watchdog)
//! - Visual handles (DOM elements)
//!
//! Native builds drive sessions directly (see `main.rs`) with the
//! `VirtualClock` from `sim::clock`.

#[cfg(target_arch = "wasm32")]
pub mod web;
