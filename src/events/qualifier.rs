//! Invocation qualifiers.
//!
//! A qualifier changes *when* a listener's callback runs, never what it
//! matches: the wrapper produced here is what the registry stores, and the
//! dispatch engine cannot tell it from a plain listener.

use std::cell::RefCell;
use std::rc::Rc;

use crate::events::event::{CanonicalEvent, Flow};
use crate::session::{Listener, Session};
use crate::timer::TimerId;
use crate::tree::TargetId;

/// Parsed invocation qualifier. At most one per registration name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    /// Run once, then remove the handler by its own registration name.
    /// Removal by name also removes any other handler sharing that exact
    /// name; this is documented behavior, not a bug.
    Once,
    /// Debounce: at most one run per quiet period of the given length, with
    /// the last event of the burst, asynchronously.
    Idle(u32),
    /// At least the given interval between runs, coalescing a burst to its
    /// most recent event, asynchronously.
    Throttle(u32),
}

/// Wrap a user listener per the qualifier. `canonical` is the full
/// registration name, which the once wrapper uses to remove itself.
pub(crate) fn wrap(
    target: TargetId,
    canonical: String,
    qualifier: Option<Qualifier>,
    user: Listener,
) -> Listener {
    match qualifier {
        None => user,
        Some(Qualifier::Once) => wrap_once(target, canonical, user),
        Some(Qualifier::Idle(ms)) => wrap_idle(u64::from(ms), user),
        Some(Qualifier::Throttle(ms)) => wrap_throttle(u64::from(ms), user),
    }
}

fn wrap_once(target: TargetId, canonical: String, user: Listener) -> Listener {
    Rc::new(move |session: &Session, ev: &mut CanonicalEvent, receiver: TargetId| {
        let flow = (user)(session, ev, receiver);
        // The canonical name always reparses; removal is a no-op if another
        // listener already took this handler out.
        if let Err(err) = session.off(target, &canonical) {
            log::debug!("once removal of `{canonical}` failed: {err}");
        }
        flow
    })
}

/// Shared state between a deferring wrapper and its scheduled run.
struct Deferred {
    pending: Option<TimerId>,
    /// Latest event seen, with the receiver it matched.
    latest: Option<(CanonicalEvent, TargetId)>,
    /// Throttle only: time of the last completed run.
    last_run: Option<u64>,
}

impl Deferred {
    fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            pending: None,
            latest: None,
            last_run: None,
        }))
    }
}

fn run_deferred(state: &Rc<RefCell<Deferred>>, session: &Session, user: &Listener, stamp: bool) {
    let taken = {
        let mut st = state.borrow_mut();
        st.pending = None;
        if stamp {
            st.last_run = Some(session.scheduler().now_ms());
        }
        st.latest.take()
    };
    if let Some((mut ev, receiver)) = taken {
        // Deferred runs cannot affect the originating dispatch; the flow
        // result is meaningless here.
        let _ = (user)(session, &mut ev, receiver);
    }
}

fn wrap_idle(ms: u64, user: Listener) -> Listener {
    let state = Deferred::new();
    Rc::new(move |session: &Session, ev: &mut CanonicalEvent, receiver: TargetId| {
        // Replace any invocation in flight with one for the latest event.
        let cancelled = {
            let mut st = state.borrow_mut();
            st.latest = Some((ev.clone(), receiver));
            st.pending.take()
        };
        if let Some(id) = cancelled {
            session.scheduler().cancel(id);
        }

        let weak = session.downgrade();
        let state2 = state.clone();
        let user2 = user.clone();
        let id = session.scheduler().schedule(
            ms,
            Box::new(move || {
                if let Some(session) = weak.upgrade() {
                    run_deferred(&state2, &session, &user2, false);
                }
            }),
        );
        state.borrow_mut().pending = Some(id);
        Flow::Continue
    })
}

fn wrap_throttle(ms: u64, user: Listener) -> Listener {
    let state = Deferred::new();
    Rc::new(move |session: &Session, ev: &mut CanonicalEvent, receiver: TargetId| {
        let needs_schedule = {
            let mut st = state.borrow_mut();
            st.latest = Some((ev.clone(), receiver));
            st.pending.is_none()
        };
        if needs_schedule {
            let now = session.scheduler().now_ms();
            // Remaining cooldown since the last run; a wrapper that has
            // never run anchors the window at this first dispatch.
            let delay = match state.borrow().last_run {
                Some(last) => (last + ms).saturating_sub(now),
                None => ms,
            };
            let weak = session.downgrade();
            let state2 = state.clone();
            let user2 = user.clone();
            let id = session.scheduler().schedule(
                delay,
                Box::new(move || {
                    if let Some(session) = weak.upgrade() {
                        run_deferred(&state2, &session, &user2, true);
                    }
                }),
            );
            state.borrow_mut().pending = Some(id);
        }
        Flow::Continue
    })
}
