//! The document session: owner of the registry and the public API.
//!
//! One `Session` composes a document tree, a platform and a scheduler, and
//! owns all listener bookkeeping for them. Sessions are independent values
//! (not process-wide state), so tests and embedders can run several side by
//! side and tear one down cleanly.
//!
//! The model is single-threaded cooperative: handles are `Rc`-cloneable,
//! state lives in a `RefCell`, and reentrancy discipline (dispatch iterates
//! over snapshots and never holds a borrow across a listener call)
//! substitutes for locks. Listeners may call `on`/`off`/`fire` freely from
//! inside a dispatch.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::events::event::{CanonicalEvent, Flow};
use crate::events::lifecycle::{DragCoordinator, ValueEmulation};
use crate::events::name::{self, EventName};
use crate::events::normalize;
use crate::events::qualifier;
use crate::events::registry::{Handler, Registry, RemoveOutcome};
use crate::platform::Platform;
use crate::timer::Scheduler;
use crate::tree::{DocumentTree, TargetId};
use crate::Error;

/// A registered listener. Receives the owning session (reentrant calls are
/// allowed), the event, and the receiver: the registering target for direct
/// handlers, the matched descendant for delegated ones.
pub type Listener = Rc<dyn Fn(&Session, &mut CanonicalEvent, TargetId) -> Flow>;

pub(crate) struct EngineState {
    pub registry: Registry,
    pub drags: HashMap<TargetId, DragCoordinator>,
    pub value_emulations: HashMap<TargetId, ValueEmulation>,
}

pub(crate) struct SessionCore {
    state: RefCell<EngineState>,
    tree: Rc<dyn DocumentTree>,
    platform: Rc<dyn Platform>,
    scheduler: Rc<dyn Scheduler>,
}

/// Cloneable handle to one event engine instance.
#[derive(Clone)]
pub struct Session {
    core: Rc<SessionCore>,
}

/// Non-owning handle captured by native bindings and deferred runs, so the
/// platform and scheduler never keep a dropped session alive.
#[derive(Clone)]
pub(crate) struct WeakSession(Weak<SessionCore>);

impl WeakSession {
    pub fn upgrade(&self) -> Option<Session> {
        self.0.upgrade().map(|core| Session { core })
    }
}

impl Session {
    pub fn new(
        tree: Rc<dyn DocumentTree>,
        platform: Rc<dyn Platform>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        Self {
            core: Rc::new(SessionCore {
                state: RefCell::new(EngineState {
                    registry: Registry::default(),
                    drags: HashMap::new(),
                    value_emulations: HashMap::new(),
                }),
                tree,
                platform,
                scheduler,
            }),
        }
    }

    /// Register `listener` under one or more names (comma- or
    /// whitespace-separated). Each name follows
    /// `type[:relay(selector)][:once|:idle(ms)|:throttle(ms)][.label]`;
    /// malformed names fail here, synchronously, and the whole batch is
    /// validated before anything registers.
    pub fn on<F>(&self, target: TargetId, name: &str, listener: F) -> Result<(), Error>
    where
        F: Fn(&Session, &mut CanonicalEvent, TargetId) -> Flow + 'static,
    {
        let names = EventName::parse_list(name)?;
        let listener: Listener = Rc::new(listener);
        for parsed in names {
            self.register(target, parsed, listener.clone());
        }
        Ok(())
    }

    fn register(&self, target: TargetId, parsed: EventName, user: Listener) {
        let canonical = parsed.canonical();
        let wrapped = qualifier::wrap(target, canonical.clone(), parsed.qualifier, user);
        let handler = Handler {
            name: canonical,
            listener: wrapped,
            selector: parsed.selector.map(Rc::new),
        };
        let created = self
            .state_mut()
            .registry
            .insert_handler(target, &parsed.kind, handler);
        if created {
            log::debug!("first `{}` handler on {target:?}", parsed.kind);
            let dispatcher = self.install_dispatcher(target, &parsed.kind);
            self.state_mut()
                .registry
                .set_dispatcher(target, &parsed.kind, dispatcher);
        }
    }

    /// Remove handlers. A bare type removes every handler of that type;
    /// any other name removes exactly the handlers registered under the
    /// same canonical name. Unknown targets and unmatched names are silent
    /// no-ops; only the name grammar can fail.
    pub fn off(&self, target: TargetId, name: &str) -> Result<(), Error> {
        for parsed in EventName::parse_list(name)? {
            let exact = if parsed.is_bare() {
                None
            } else {
                Some(parsed.canonical())
            };
            let outcome =
                self.state_mut()
                    .registry
                    .remove_handlers(target, &parsed.kind, exact.as_deref());
            if let RemoveOutcome::Emptied { dispatcher } = outcome {
                log::debug!("last `{}` handler off {target:?}", parsed.kind);
                self.teardown_dispatcher(target, &parsed.kind, dispatcher);
            }
        }
        Ok(())
    }

    /// Synthesize an event with no native counterpart and dispatch it as if
    /// it had occurred at `target`. `data` is merged onto the event's
    /// `detail` (never overwriting type/target/original). Returns the event
    /// so the caller can inspect its cancellation flags.
    pub fn fire(
        &self,
        target: TargetId,
        kind: &str,
        data: Option<Value>,
    ) -> Result<CanonicalEvent, Error> {
        name::validate_kind(kind)?;
        let mut ev = normalize::synthesize(kind, target, self.scheduler().now_ms(), data);
        self.dispatch(&mut ev, target);
        Ok(ev)
    }

    /// Teardown path for a target leaving the document tree: drops its
    /// whole registry entry and every native binding it owned, so orphaned
    /// nodes do not leak listeners.
    pub fn detach(&self, target: TargetId) {
        let records = self.state_mut().registry.take_entry(target);
        for (kind, dispatcher) in records {
            self.teardown_dispatcher(target, &kind, dispatcher);
        }
    }

    /// Process-wide teardown of every remaining entry (window unload).
    pub fn unload(&self) {
        let targets = self.state().registry.targets();
        for target in targets {
            self.detach(target);
        }
    }

    /// (delegated, direct) handler counts for a `(target, kind)` record,
    /// or `None` when no record exists.
    pub fn listener_counts(&self, target: TargetId, kind: &str) -> Option<(usize, usize)> {
        self.state().registry.counts(target, kind)
    }

    pub(crate) fn state(&self) -> Ref<'_, EngineState> {
        self.core.state.borrow()
    }

    pub(crate) fn state_mut(&self) -> RefMut<'_, EngineState> {
        self.core.state.borrow_mut()
    }

    pub(crate) fn tree(&self) -> &Rc<dyn DocumentTree> {
        &self.core.tree
    }

    pub(crate) fn platform(&self) -> &Rc<dyn Platform> {
        &self.core.platform
    }

    pub(crate) fn scheduler(&self) -> &Rc<dyn Scheduler> {
        &self.core.scheduler
    }

    pub(crate) fn downgrade(&self) -> WeakSession {
        WeakSession(Rc::downgrade(&self.core))
    }
}
