//! Native event surface.
//!
//! The engine never talks to a real browser; it installs and removes
//! bindings through the [`Platform`] trait and receives heterogeneous
//! [`RawEvent`] values back. Delivery contract: the platform hands each raw
//! event to the innermost [`BindingFlavor::Bubble`] binding on the target's
//! ancestor chain exactly once (the dispatch engine simulates the rest of
//! the propagation), and to every [`BindingFlavor::Observe`] binding of the
//! same kind (composite derivations filter by containment themselves).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use crate::tree::{DocumentTree, TargetId};

/// Handle to an installed native binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

/// How a binding wants raw events delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingFlavor {
    /// Delivered once, to the innermost bound target on the event's
    /// ancestor chain. Used by generic dispatchers.
    Bubble,
    /// Delivered for every raw event of the kind, regardless of where it
    /// occurred. Used by composite derivations, which must see activity
    /// that an inner bubble binding would otherwise absorb.
    Observe,
}

/// Callback invoked by the platform when a raw event is delivered.
pub type NativeCallback = Rc<dyn Fn(&RawEvent)>;

/// Engine-relevant behavior differences between host platforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quirks {
    /// The host does not reliably fire native input/change events; the
    /// lifecycle manager substitutes property-change emulation.
    pub legacy_value_events: bool,
}

/// A platform event before normalization.
///
/// Legacy hosts expose the related target under different names; the
/// normalizer resolves `related_target`, then `from_element` (over-style
/// kinds) or `to_element` (out-style kinds).
#[derive(Debug, Clone, Serialize)]
pub struct RawEvent {
    pub kind: String,
    pub target: TargetId,
    pub related_target: Option<TargetId>,
    pub to_element: Option<TargetId>,
    pub from_element: Option<TargetId>,
    pub x: i32,
    pub y: i32,
    /// Pointer button: 0 is the primary button.
    pub button: u8,
    pub key: Option<String>,
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
    pub time_ms: Option<u64>,
}

impl RawEvent {
    pub fn new(kind: &str, target: TargetId) -> Self {
        Self {
            kind: kind.to_string(),
            target,
            related_target: None,
            to_element: None,
            from_element: None,
            x: 0,
            y: 0,
            button: 0,
            key: None,
            alt: false,
            ctrl: false,
            shift: false,
            meta: false,
            time_ms: None,
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn button(mut self, button: u8) -> Self {
        self.button = button;
        self
    }

    pub fn related(mut self, related: TargetId) -> Self {
        self.related_target = Some(related);
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }
}

/// Native binding installation and teardown.
pub trait Platform {
    /// Install a native listener. The engine installs at most one binding
    /// per `(target, kind)` pair for logical registrations.
    fn bind(
        &self,
        target: TargetId,
        kind: &str,
        flavor: BindingFlavor,
        callback: NativeCallback,
    ) -> BindingId;

    /// Remove a binding. Unknown ids are ignored.
    fn unbind(&self, id: BindingId);

    /// Live value of a form control, for input/change emulation.
    fn value(&self, target: TargetId) -> Option<String>;

    fn quirks(&self) -> Quirks;
}

struct Binding {
    id: BindingId,
    target: TargetId,
    kind: String,
    flavor: BindingFlavor,
    callback: NativeCallback,
}

struct MockState {
    next_id: u64,
    bindings: Vec<Binding>,
    values: HashMap<TargetId, String>,
}

/// In-memory platform for tests and headless embedders: records installed
/// bindings and routes emitted raw events per the delivery contract.
pub struct MockPlatform {
    tree: Rc<dyn DocumentTree>,
    quirks: Quirks,
    state: RefCell<MockState>,
}

impl MockPlatform {
    pub fn new(tree: Rc<dyn DocumentTree>) -> Self {
        Self::with_quirks(tree, Quirks::default())
    }

    pub fn with_quirks(tree: Rc<dyn DocumentTree>, quirks: Quirks) -> Self {
        Self {
            tree,
            quirks,
            state: RefCell::new(MockState {
                next_id: 1,
                bindings: Vec::new(),
                values: HashMap::new(),
            }),
        }
    }

    /// Deliver a raw event: every observe binding of the kind first (in
    /// installation order), then the innermost bubble binding on the
    /// target's ancestor chain. Natively non-bubbling kinds (focus-style
    /// events) only ever reach a bubble binding on the target itself.
    pub fn emit(&self, raw: &RawEvent) {
        let mut callbacks: Vec<NativeCallback> = Vec::new();
        {
            let state = self.state.borrow();
            for binding in &state.bindings {
                if binding.flavor == BindingFlavor::Observe && binding.kind == raw.kind {
                    callbacks.push(binding.callback.clone());
                }
            }
            let mut cursor = Some(raw.target);
            'chain: while let Some(level) = cursor {
                for binding in &state.bindings {
                    if binding.flavor == BindingFlavor::Bubble
                        && binding.kind == raw.kind
                        && binding.target == level
                    {
                        callbacks.push(binding.callback.clone());
                        break 'chain;
                    }
                }
                if !crate::events::normalize::kind_bubbles(&raw.kind) {
                    break;
                }
                cursor = self.tree.parent(level);
            }
        }
        // Invoke outside the borrow: callbacks re-enter bind/unbind.
        for callback in callbacks {
            callback(raw);
        }
    }

    /// Set the live value of a form control (does not emit anything).
    pub fn set_value(&self, target: TargetId, value: &str) {
        self.state
            .borrow_mut()
            .values
            .insert(target, value.to_string());
    }

    /// Installed bindings for a `(target, kind)` pair.
    pub fn binding_count(&self, target: TargetId, kind: &str) -> usize {
        self.state
            .borrow()
            .bindings
            .iter()
            .filter(|b| b.target == target && b.kind == kind)
            .count()
    }

    /// Total installed bindings.
    pub fn total_bindings(&self) -> usize {
        self.state.borrow().bindings.len()
    }
}

impl Platform for MockPlatform {
    fn bind(
        &self,
        target: TargetId,
        kind: &str,
        flavor: BindingFlavor,
        callback: NativeCallback,
    ) -> BindingId {
        let mut state = self.state.borrow_mut();
        let id = BindingId(state.next_id);
        state.next_id += 1;
        state.bindings.push(Binding {
            id,
            target,
            kind: kind.to_string(),
            flavor,
            callback,
        });
        log::debug!("bind {kind} on {target:?} ({flavor:?}) -> {id:?}");
        id
    }

    fn unbind(&self, id: BindingId) {
        let mut state = self.state.borrow_mut();
        if let Some(i) = state.bindings.iter().position(|b| b.id == id) {
            let binding = state.bindings.remove(i);
            log::debug!("unbind {} on {:?}", binding.kind, binding.target);
        }
    }

    fn value(&self, target: TargetId) -> Option<String> {
        self.state.borrow().values.get(&target).cloned()
    }

    fn quirks(&self) -> Quirks {
        self.quirks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::DomTree;
    use std::cell::Cell;

    fn tree_with_child() -> (Rc<DomTree>, TargetId, TargetId) {
        let mut tree = DomTree::new();
        let outer = tree.element(tree.root(), "div");
        let inner = tree.element(outer, "a");
        (Rc::new(tree), outer, inner)
    }

    #[test]
    fn bubble_delivery_stops_at_innermost_binding() {
        let (tree, outer, inner) = tree_with_child();
        let platform = MockPlatform::new(tree);

        let outer_hits = Rc::new(Cell::new(0));
        let inner_hits = Rc::new(Cell::new(0));
        let (o, i) = (outer_hits.clone(), inner_hits.clone());
        platform.bind(
            outer,
            "click",
            BindingFlavor::Bubble,
            Rc::new(move |_| o.set(o.get() + 1)),
        );
        platform.bind(
            inner,
            "click",
            BindingFlavor::Bubble,
            Rc::new(move |_| i.set(i.get() + 1)),
        );

        platform.emit(&RawEvent::new("click", inner));
        assert_eq!(inner_hits.get(), 1);
        assert_eq!(outer_hits.get(), 0);

        platform.emit(&RawEvent::new("click", outer));
        assert_eq!(outer_hits.get(), 1);
    }

    #[test]
    fn observe_bindings_see_everything() {
        let (tree, outer, inner) = tree_with_child();
        let root = tree.root();
        let platform = MockPlatform::new(tree);

        let seen = Rc::new(Cell::new(0));
        let s = seen.clone();
        platform.bind(
            root,
            "mousemove",
            BindingFlavor::Observe,
            Rc::new(move |_| s.set(s.get() + 1)),
        );
        // An inner bubble binding must not absorb observed events.
        platform.bind(inner, "mousemove", BindingFlavor::Bubble, Rc::new(|_| {}));

        platform.emit(&RawEvent::new("mousemove", inner));
        platform.emit(&RawEvent::new("mousemove", outer));
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn unbind_removes_delivery() {
        let (tree, _, inner) = tree_with_child();
        let platform = MockPlatform::new(tree);

        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = platform.bind(
            inner,
            "click",
            BindingFlavor::Bubble,
            Rc::new(move |_| h.set(h.get() + 1)),
        );
        platform.unbind(id);
        platform.emit(&RawEvent::new("click", inner));
        assert_eq!(hits.get(), 0);
        assert_eq!(platform.total_bindings(), 0);
    }
}
