//! The canonical event delivered to listeners.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::platform::RawEvent;
use crate::tree::TargetId;

/// Pointer fields, present only for pointer-classified kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointerState {
    pub x: i32,
    pub y: i32,
    /// 0 is the primary button.
    pub button: u8,
}

/// Keyboard fields, present only for keyboard-classified kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyState {
    pub key: String,
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

/// Offset from the press origin, carried by drag-gesture events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DragInfo {
    pub dx: i32,
    pub dy: i32,
}

/// What a listener tells the dispatch engine.
///
/// [`Flow::Cancel`] is the explicit cancellation signal: equivalent to
/// calling both `stop_propagation` and `prevent_default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    Cancel,
}

/// Normalized, cross-platform event value.
///
/// Built either from a [`RawEvent`] (then `original` carries the raw value)
/// or by a manual `fire` call (then `original` is `None`); both support the
/// same cancellation methods. The three flags are idempotent: each moves
/// from `false` to `true` exactly once and is never reset.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalEvent {
    /// Logical event type.
    pub event_type: String,
    /// Innermost target where the event occurred.
    pub target: TargetId,
    pub related_target: Option<TargetId>,
    pub time_stamp_ms: u64,
    /// Whether the dispatch walk continues past the first level.
    pub bubbles: bool,
    pub pointer: Option<PointerState>,
    pub key: Option<KeyState>,
    /// Present only on drag-gesture events.
    pub drag: Option<DragInfo>,
    /// Extra data merged from a manual `fire` call.
    pub detail: Map<String, Value>,
    /// The raw platform event, absent for manually fired events.
    pub original: Option<RawEvent>,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    default_prevented: bool,
}

impl CanonicalEvent {
    pub(crate) fn new(event_type: &str, target: TargetId, time_stamp_ms: u64) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            related_target: None,
            time_stamp_ms,
            bubbles: true,
            pointer: None,
            key: None,
            drag: None,
            detail: Map::new(),
            original: None,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            default_prevented: false,
        }
    }

    /// Stop the walk after the current level finishes.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop the walk immediately: remaining handlers at the current level
    /// are skipped as well. Implies `stop_propagation`.
    pub fn stop_immediate_propagation(&mut self) {
        self.immediate_propagation_stopped = true;
        self.propagation_stopped = true;
    }

    /// Mark the default action as prevented. For manually fired events this
    /// only flips the flag; the caller of `fire` inspects it on the
    /// returned event.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_idempotent() {
        let mut ev = CanonicalEvent::new("click", TargetId(0), 0);
        assert!(!ev.propagation_stopped());

        ev.stop_propagation();
        ev.stop_propagation();
        assert!(ev.propagation_stopped());
        assert!(!ev.immediate_propagation_stopped());

        ev.prevent_default();
        ev.prevent_default();
        assert!(ev.default_prevented());
    }

    #[test]
    fn immediate_implies_stopped() {
        let mut ev = CanonicalEvent::new("click", TargetId(0), 0);
        ev.stop_immediate_propagation();
        assert!(ev.propagation_stopped());
        assert!(ev.immediate_propagation_stopped());
    }
}
