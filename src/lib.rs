//! relaykit - event dispatch and delegation engine for document-tree UIs.
//!
//! The engine registers listeners on tree nodes under a name grammar
//! (`type[:relay(selector)][:once|:idle(ms)|:throttle(ms)][.label]`),
//! normalizes heterogeneous native events into one canonical event object,
//! simulates bubbling and delegation during dispatch, and lazily installs
//! at most one native binding per `(target, kind)` pair, including the
//! composite derivations (drag gesture, enter/leave, input/change
//! emulation) that manage several native bindings behind one logical name.
//!
//! Everything hangs off a [`session::Session`], which owns the registry and
//! composes three collaborator capabilities: a [`tree::DocumentTree`], a
//! [`platform::Platform`] and a [`timer::Scheduler`].

pub mod events;
pub mod platform;
pub mod selector;
pub mod session;
pub mod timer;
pub mod tree;

/// Version of the relaykit crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export of common types for convenience
pub mod prelude {
    pub use crate::events::{
        CanonicalEvent, DragInfo, EventName, Flow, KeyState, PointerState, Qualifier,
    };
    pub use crate::platform::{
        BindingFlavor, MockPlatform, Platform, Quirks, RawEvent,
    };
    pub use crate::selector::Selector;
    pub use crate::session::{Listener, Session};
    pub use crate::timer::{Scheduler, TestScheduler};
    pub use crate::tree::{DocumentTree, DomTree, TargetId};
    pub use crate::Error;
}

/// Errors that can occur in the relaykit engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A registration name violated the grammar. Raised synchronously at
    /// `on`/`off`/`fire` time, never deferred to dispatch.
    #[error("malformed event name `{name}`: {reason}")]
    Syntax { name: String, reason: String },
}
