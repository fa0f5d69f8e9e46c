//! Spin events and the listener seam
//!
//! A listener (typically the sound collaborator) hears phase changes and item
//! crossings. Listener failures are logged and otherwise ignored.

use serde::{Deserialize, Serialize};

use super::phase::PhaseKind;
use crate::error::ListenerError;

/// Why a session finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionReason {
    /// Every actor settled on its own
    Settled,
    /// Safety deadline passed; stragglers were snapped to their targets
    TimedOut,
    /// `stop()` or a cooperative cancel
    Cancelled,
}

/// Something observable happened during a spin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpinEvent {
    PhaseChanged {
        actor: usize,
        from: PhaseKind,
        to: PhaseKind,
        at_ms: f64,
    },
    /// A new item moved under the pay line / pointer
    ItemPassed { actor: usize, item: usize, at_ms: f64 },
    Completed { reason: CompletionReason, at_ms: f64 },
}

/// Receives spin events; must never block
pub trait SpinListener {
    fn on_event(&mut self, event: &SpinEvent) -> Result<(), ListenerError>;
}

/// Deliver an event, swallowing listener failures
pub(crate) fn dispatch(listener: &mut Option<Box<dyn SpinListener>>, event: &SpinEvent) {
    if let Some(listener) = listener.as_mut() {
        if let Err(e) = listener.on_event(event) {
            log::warn!("Spin listener error ignored: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl SpinListener for Failing {
        fn on_event(&mut self, _event: &SpinEvent) -> Result<(), ListenerError> {
            Err(ListenerError("audio context suspended".to_string()))
        }
    }

    #[test]
    fn test_dispatch_swallows_errors() {
        let mut listener: Option<Box<dyn SpinListener>> = Some(Box::new(Failing));
        dispatch(
            &mut listener,
            &SpinEvent::Completed {
                reason: CompletionReason::Settled,
                at_ms: 0.0,
            },
        );
        let mut none: Option<Box<dyn SpinListener>> = None;
        dispatch(
            &mut none,
            &SpinEvent::ItemPassed {
                actor: 0,
                item: 1,
                at_ms: 0.0,
            },
        );
    }
}
