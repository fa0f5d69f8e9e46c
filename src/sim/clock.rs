//! Time sources
//!
//! Sessions read "now" from a `Clock` when a spin starts and when the safety
//! watchdog fires; frame timestamps come from the host's frame callback.

use std::cell::Cell;
use std::rc::Rc;

/// Millisecond time source
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Manually advanced clock for tests and headless runs; clones share time
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Rc<Cell<f64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) -> f64 {
        let next = self.now.get() + ms;
        self.now.set(next);
        next
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_shared() {
        let clock = VirtualClock::new();
        let view = clock.clone();
        assert_eq!(clock.advance(16.0), 16.0);
        view.set(100.0);
        assert_eq!(clock.now_ms(), 100.0);
    }
}
