//! Dispatcher/trigger lifecycle manager.
//!
//! The first handler for a `(target, kind)` pair installs the kind's
//! detector; the last removal tears it down. Generic kinds get one
//! same-named native binding that normalizes and forwards to the dispatch
//! engine. Kinds requiring emulation get a composite deriver instead:
//!
//! - the drag gesture's three kinds share one coordinator per target (a
//!   press binding that arms temporary document-wide move/release/blur
//!   bindings);
//! - enter/leave derive from native over/out with a containment check on
//!   the related target;
//! - on hosts with `legacy_value_events`, input/change share one
//!   property-change binding and re-fire when a previous-value snapshot
//!   disagrees with the live value.
//!
//! Kinds with no native counterpart (animation `step`/`play`/..., any
//! custom name) need no binding at all; they are reachable through `fire`.

use crate::events::event::{CanonicalEvent, DragInfo, PointerState};
use crate::events::normalize;
use crate::platform::{BindingFlavor, BindingId, NativeCallback, RawEvent};
use crate::session::Session;
use crate::tree::TargetId;
use std::rc::Rc;

/// The native detector installed for one `(target, kind)` record.
pub(crate) enum Dispatcher {
    /// One same-named native binding.
    Generic(BindingId),
    /// One native over/out binding owned by this record.
    EnterLeave(BindingId),
    /// Shared per-target coordinator; see [`DragCoordinator`].
    Drag,
    /// Shared per-target coordinator; see [`ValueEmulation`].
    ValueEmulation,
}

/// Shared lifecycle for the drag gesture's three kinds. The press binding
/// stays installed while any of the three records exists; the temporary
/// bindings exist only while a drag is active.
pub(crate) struct DragCoordinator {
    press_binding: BindingId,
    start_count: usize,
    move_count: usize,
    end_count: usize,
    active: Option<DragState>,
}

struct DragState {
    origin: TargetId,
    origin_x: i32,
    origin_y: i32,
    last_dx: i32,
    last_dy: i32,
    temp_bindings: Vec<BindingId>,
}

/// Shared input/change emulation state for one form control.
pub(crate) struct ValueEmulation {
    binding: BindingId,
    input_count: usize,
    change_count: usize,
    last_value: Option<String>,
}

impl Session {
    pub(crate) fn install_dispatcher(&self, target: TargetId, kind: &str) -> Option<Dispatcher> {
        match kind {
            "dragstart" | "dragmove" | "dragend" => {
                self.drag_retain(target, kind);
                Some(Dispatcher::Drag)
            }
            "mouseenter" => Some(Dispatcher::EnterLeave(
                self.bind_enter_leave(target, "mouseover", "mouseenter"),
            )),
            "mouseleave" => Some(Dispatcher::EnterLeave(
                self.bind_enter_leave(target, "mouseout", "mouseleave"),
            )),
            "input" | "change" if self.platform().quirks().legacy_value_events => {
                self.value_retain(target, kind);
                Some(Dispatcher::ValueEmulation)
            }
            kind if normalize::is_native_kind(kind) => {
                Some(Dispatcher::Generic(self.bind_generic(target, kind)))
            }
            _ => None,
        }
    }

    pub(crate) fn teardown_dispatcher(
        &self,
        target: TargetId,
        kind: &str,
        dispatcher: Option<Dispatcher>,
    ) {
        match dispatcher {
            Some(Dispatcher::Generic(id)) | Some(Dispatcher::EnterLeave(id)) => {
                self.platform().unbind(id);
            }
            Some(Dispatcher::Drag) => self.drag_release(target, kind),
            Some(Dispatcher::ValueEmulation) => self.value_release(target, kind),
            None => {}
        }
    }

    fn bind_generic(&self, target: TargetId, kind: &str) -> BindingId {
        let weak = self.downgrade();
        let callback: NativeCallback = Rc::new(move |raw: &RawEvent| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            let mut ev = normalize::normalize(
                session.tree().as_ref(),
                session.scheduler().now_ms(),
                raw,
            );
            session.dispatch(&mut ev, target);
        });
        self.platform()
            .bind(target, kind, BindingFlavor::Bubble, callback)
    }

    fn bind_enter_leave(
        &self,
        target: TargetId,
        native: &'static str,
        logical: &'static str,
    ) -> BindingId {
        let weak = self.downgrade();
        let callback: NativeCallback = Rc::new(move |raw: &RawEvent| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            let tree = session.tree().clone();
            let mut ev = normalize::normalize(tree.as_ref(), session.scheduler().now_ms(), raw);
            // Only pointer activity inside the registering subtree counts.
            if !tree.contains(target, ev.target) {
                return;
            }
            // The pointer moved between two descendants, not across the
            // boundary: suppress the synthetic event.
            if let Some(related) = ev.related_target {
                if tree.contains(target, related) {
                    return;
                }
            }
            ev.event_type = logical.to_string();
            ev.bubbles = normalize::kind_bubbles(logical);
            session.dispatch(&mut ev, target);
        });
        self.platform()
            .bind(target, native, BindingFlavor::Observe, callback)
    }

    // --- drag gesture -----------------------------------------------------

    fn drag_retain(&self, target: TargetId, kind: &str) {
        let missing = !self.state().drags.contains_key(&target);
        if missing {
            let press_binding = self.bind_drag_press(target);
            self.state_mut().drags.insert(
                target,
                DragCoordinator {
                    press_binding,
                    start_count: 0,
                    move_count: 0,
                    end_count: 0,
                    active: None,
                },
            );
        }
        let mut state = self.state_mut();
        if let Some(coordinator) = state.drags.get_mut(&target) {
            match kind {
                "dragstart" => coordinator.start_count += 1,
                "dragmove" => coordinator.move_count += 1,
                _ => coordinator.end_count += 1,
            }
        }
    }

    /// The three drag kinds share one lifecycle: the press binding survives
    /// until all three counts reach zero.
    fn drag_release(&self, target: TargetId, kind: &str) {
        let torn_down = {
            let mut state = self.state_mut();
            let Some(coordinator) = state.drags.get_mut(&target) else {
                return;
            };
            match kind {
                "dragstart" => coordinator.start_count = coordinator.start_count.saturating_sub(1),
                "dragmove" => coordinator.move_count = coordinator.move_count.saturating_sub(1),
                _ => coordinator.end_count = coordinator.end_count.saturating_sub(1),
            }
            let empty = coordinator.start_count + coordinator.move_count + coordinator.end_count
                == 0;
            if empty {
                state.drags.remove(&target)
            } else {
                None
            }
        };
        if let Some(coordinator) = torn_down {
            log::debug!("drag coordinator for {target:?} torn down");
            self.platform().unbind(coordinator.press_binding);
            if let Some(active) = coordinator.active {
                for binding in active.temp_bindings {
                    self.platform().unbind(binding);
                }
            }
        }
    }

    fn bind_drag_press(&self, target: TargetId) -> BindingId {
        let weak = self.downgrade();
        let callback: NativeCallback = Rc::new(move |raw: &RawEvent| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            // A non-primary press never arms and unconditionally ends an
            // active drag.
            if raw.button != 0 {
                session.drag_end(target, raw);
                return;
            }
            let tree = session.tree().clone();
            let origin = if tree.is_text(raw.target) {
                tree.parent(raw.target).unwrap_or(raw.target)
            } else {
                raw.target
            };
            if !tree.contains(target, origin) {
                return;
            }
            session.drag_begin(target, origin, raw);
        });
        self.platform()
            .bind(target, "mousedown", BindingFlavor::Observe, callback)
    }

    fn drag_begin(&self, target: TargetId, origin: TargetId, raw: &RawEvent) {
        let already_active = self
            .state()
            .drags
            .get(&target)
            .map_or(true, |c| c.active.is_some());
        if already_active {
            return;
        }
        log::trace!("drag armed on {target:?} at ({}, {})", raw.x, raw.y);

        let root = self.tree().root();
        let mut temp_bindings = Vec::with_capacity(3);
        for native in ["mousemove", "mouseup", "blur"] {
            let weak = self.downgrade();
            let callback: NativeCallback = Rc::new(move |raw: &RawEvent| {
                let Some(session) = weak.upgrade() else {
                    return;
                };
                match raw.kind.as_str() {
                    "mousemove" => session.drag_move(target, raw),
                    // Only the window losing focus ends the gesture; an
                    // element blurring mid-drag is unrelated.
                    "blur" if raw.target != root => {}
                    _ => session.drag_end(target, raw),
                }
            });
            temp_bindings.push(
                self.platform()
                    .bind(root, native, BindingFlavor::Observe, callback),
            );
        }

        {
            let mut state = self.state_mut();
            if let Some(coordinator) = state.drags.get_mut(&target) {
                coordinator.active = Some(DragState {
                    origin,
                    origin_x: raw.x,
                    origin_y: raw.y,
                    last_dx: 0,
                    last_dy: 0,
                    temp_bindings,
                });
            }
        }

        let mut ev = self.drag_event("dragstart", origin, raw, DragInfo { dx: 0, dy: 0 });
        self.dispatch(&mut ev, target);
    }

    fn drag_move(&self, target: TargetId, raw: &RawEvent) {
        let moved = {
            let mut state = self.state_mut();
            let active = state
                .drags
                .get_mut(&target)
                .and_then(|c| c.active.as_mut());
            let Some(active) = active else {
                return;
            };
            active.last_dx = raw.x - active.origin_x;
            active.last_dy = raw.y - active.origin_y;
            (active.origin, active.last_dx, active.last_dy)
        };
        let (origin, dx, dy) = moved;
        let mut ev = self.drag_event("dragmove", origin, raw, DragInfo { dx, dy });
        self.dispatch(&mut ev, target);
    }

    fn drag_end(&self, target: TargetId, raw: &RawEvent) {
        let ended = {
            let mut state = self.state_mut();
            state.drags.get_mut(&target).and_then(|c| c.active.take())
        };
        let Some(active) = ended else {
            return;
        };
        for binding in active.temp_bindings {
            self.platform().unbind(binding);
        }
        // Blur carries no coordinates; fall back to the last seen offset.
        let (dx, dy) = if raw.kind == "mouseup" {
            (raw.x - active.origin_x, raw.y - active.origin_y)
        } else {
            (active.last_dx, active.last_dy)
        };
        log::trace!("drag on {target:?} ended by {}", raw.kind);
        let mut ev = self.drag_event("dragend", active.origin, raw, DragInfo { dx, dy });
        self.dispatch(&mut ev, target);
    }

    fn drag_event(
        &self,
        kind: &str,
        origin: TargetId,
        raw: &RawEvent,
        info: DragInfo,
    ) -> CanonicalEvent {
        let stamp = raw.time_ms.unwrap_or_else(|| self.scheduler().now_ms());
        let mut ev = CanonicalEvent::new(kind, origin, stamp);
        ev.bubbles = normalize::kind_bubbles(kind);
        ev.pointer = Some(PointerState {
            x: raw.x,
            y: raw.y,
            button: raw.button,
        });
        ev.drag = Some(info);
        ev.original = Some(raw.clone());
        ev
    }

    // --- input/change emulation --------------------------------------------

    fn value_retain(&self, target: TargetId, kind: &str) {
        let missing = !self.state().value_emulations.contains_key(&target);
        if missing {
            let binding = self.bind_property_change(target);
            let last_value = self.platform().value(target);
            self.state_mut().value_emulations.insert(
                target,
                ValueEmulation {
                    binding,
                    input_count: 0,
                    change_count: 0,
                    last_value,
                },
            );
        }
        let mut state = self.state_mut();
        if let Some(emulation) = state.value_emulations.get_mut(&target) {
            if kind == "input" {
                emulation.input_count += 1;
            } else {
                emulation.change_count += 1;
            }
        }
    }

    fn value_release(&self, target: TargetId, kind: &str) {
        let torn_down = {
            let mut state = self.state_mut();
            let Some(emulation) = state.value_emulations.get_mut(&target) else {
                return;
            };
            if kind == "input" {
                emulation.input_count = emulation.input_count.saturating_sub(1);
            } else {
                emulation.change_count = emulation.change_count.saturating_sub(1);
            }
            if emulation.input_count + emulation.change_count == 0 {
                state.value_emulations.remove(&target)
            } else {
                None
            }
        };
        if let Some(emulation) = torn_down {
            self.platform().unbind(emulation.binding);
        }
    }

    fn bind_property_change(&self, target: TargetId) -> BindingId {
        let weak = self.downgrade();
        let callback: NativeCallback = Rc::new(move |raw: &RawEvent| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            if raw.target != target {
                return;
            }
            let live = session.platform().value(target);
            let changed = {
                let mut state = session.state_mut();
                match state.value_emulations.get_mut(&target) {
                    Some(emulation) if emulation.last_value != live => {
                        emulation.last_value = live;
                        true
                    }
                    _ => false,
                }
            };
            if !changed {
                return;
            }
            for kind in ["input", "change"] {
                if !session.state().registry.has_record(target, kind) {
                    continue;
                }
                let stamp = raw.time_ms.unwrap_or_else(|| session.scheduler().now_ms());
                let mut ev = CanonicalEvent::new(kind, target, stamp);
                ev.bubbles = normalize::kind_bubbles(kind);
                ev.original = Some(raw.clone());
                session.dispatch(&mut ev, target);
            }
        });
        self.platform()
            .bind(target, "propertychange", BindingFlavor::Observe, callback)
    }
}
