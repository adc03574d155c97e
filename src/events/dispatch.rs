//! Dispatch engine: the ancestry walk.
//!
//! Given a canonical event and the target where detection occurred, the
//! walk consults each ancestor's own type record for the event kind. At a
//! level, the delegated partition is filtered against the event origin's
//! ancestor-or-self chain (innermost candidate first) and always runs
//! before the direct partition on that same level; within a partition,
//! handlers run in registration order.
//!
//! Each level iterates over a snapshot of the handler list, so listeners
//! may register or remove handlers mid-walk: additions never join the
//! current delivery, and a handler removed mid-pass may still run once more
//! in the pass that captured it (documented relaxation). A panicking
//! listener unwinds the walk without corrupting the registry.

use crate::events::event::{CanonicalEvent, Flow};
use crate::events::registry::Handler;
use crate::session::Session;
use crate::tree::TargetId;

impl Session {
    /// Walk the ancestry from `start`, delivering `ev` to every matching
    /// handler until the event stops propagating, stops bubbling, or the
    /// root is passed.
    pub(crate) fn dispatch(&self, ev: &mut CanonicalEvent, start: TargetId) {
        let origin = ev.target;
        log::trace!(
            "dispatch `{}` origin {:?} from {:?}",
            ev.event_type,
            origin,
            start
        );

        let mut level = Some(start);
        while let Some(current) = level {
            let snapshot = self.state().registry.snapshot(current, &ev.event_type);
            if let Some((handlers, delegate_count)) = snapshot {
                for handler in &handlers[..delegate_count] {
                    if ev.immediate_propagation_stopped() {
                        break;
                    }
                    // Delegation needs a descendant origin to match against.
                    if origin == current {
                        continue;
                    }
                    if let Some(receiver) = self.match_delegate(handler, origin, current) {
                        self.invoke(handler, ev, receiver);
                    }
                }
                for handler in &handlers[delegate_count..] {
                    if ev.immediate_propagation_stopped() {
                        break;
                    }
                    self.invoke(handler, ev, current);
                }
                // Immediate stop implies this; either way the walk is over
                // once the level that set it has been exhausted.
                if ev.propagation_stopped() {
                    return;
                }
            }
            if !ev.bubbles {
                return;
            }
            level = self.tree().parent(current);
        }
    }

    /// Test a delegated handler's selector against the origin's
    /// ancestor-or-self chain up to and including `level`; the first
    /// (innermost) match becomes the receiver.
    fn match_delegate(
        &self,
        handler: &Handler,
        origin: TargetId,
        level: TargetId,
    ) -> Option<TargetId> {
        let selector = handler.selector.as_ref()?;
        let tree = self.tree();
        let mut candidate = origin;
        loop {
            if selector.hits(tree.as_ref(), candidate) {
                return Some(candidate);
            }
            if candidate == level {
                return None;
            }
            // Origin not under this level at all: no candidates.
            candidate = tree.parent(candidate)?;
        }
    }

    fn invoke(&self, handler: &Handler, ev: &mut CanonicalEvent, receiver: TargetId) {
        log::trace!("invoke `{}` receiver {:?}", handler.name, receiver);
        if (handler.listener)(self, ev, receiver) == Flow::Cancel {
            ev.stop_propagation();
            ev.prevent_default();
        }
    }
}
