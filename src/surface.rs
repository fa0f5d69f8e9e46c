//! Visual handle abstraction
//!
//! The engine never touches the DOM (or any renderer) directly. Each actor owns
//! an opaque handle and writes one `VisualFrame` to it per tick; that is the
//! only externally observable effect besides the completion payload.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::profile::BlurThresholds;
use crate::sim::PhaseKind;

/// Motion blur bucket, a pure function of |velocity|
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BlurLevel {
    None,
    Light,
    Heavy,
}

impl BlurLevel {
    /// CSS class the web surface toggles
    pub fn class_name(&self) -> &'static str {
        match self {
            BlurLevel::None => "reel-blur-none",
            BlurLevel::Light => "reel-blur-light",
            BlurLevel::Heavy => "reel-blur-heavy",
        }
    }
}

/// Blur bucket for a velocity
#[inline]
pub fn blur_level(velocity: f32, thresholds: &BlurThresholds) -> BlurLevel {
    let speed = velocity.abs();
    if speed >= thresholds.heavy {
        BlurLevel::Heavy
    } else if speed >= thresholds.light {
        BlurLevel::Light
    } else {
        BlurLevel::None
    }
}

/// Transform written to a handle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    /// Reel strip offset (px)
    Translate(Vec2),
    /// Wheel rotation (degrees, clockwise)
    Rotate(f32),
    /// Ball position inside its wheel: angle in degrees plus cartesian offset
    /// from the wheel center (fraction of wheel radius)
    Orbit { angle: f32, offset: Vec2 },
}

impl Transform {
    /// CSS `transform` value
    pub fn to_css(&self) -> String {
        match self {
            Transform::Translate(v) => format!("translate3d({:.2}px, {:.2}px, 0)", v.x, v.y),
            Transform::Rotate(deg) => format!("rotate({:.3}deg)", deg),
            Transform::Orbit { offset, .. } => format!(
                "translate({:.3}%, {:.3}%)",
                offset.x * 50.0,
                offset.y * 50.0
            ),
        }
    }
}

/// Everything an actor writes to its handle in one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualFrame {
    pub transform: Transform,
    pub blur: BlurLevel,
    pub phase: PhaseKind,
}

/// Opaque visual unit driven by one actor
pub trait VisualHandle {
    /// Stable identity; two sessions must never share a handle id
    fn id(&self) -> String;

    /// Apply a frame; must not fail or block
    fn apply(&mut self, frame: &VisualFrame);
}

/// Handle that keeps every frame it receives; used headless and in tests
#[derive(Debug, Clone, Default)]
pub struct RecordingHandle {
    id: String,
    frames: Rc<RefCell<Vec<VisualFrame>>>,
}

impl RecordingHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            frames: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Shared view of the recorded frames (clones share storage)
    pub fn frames(&self) -> Vec<VisualFrame> {
        self.frames.borrow().clone()
    }

    pub fn last_frame(&self) -> Option<VisualFrame> {
        self.frames.borrow().last().copied()
    }
}

impl VisualHandle for RecordingHandle {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn apply(&mut self, frame: &VisualFrame) {
        self.frames.borrow_mut().push(*frame);
    }
}
