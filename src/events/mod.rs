//! Event dispatch and delegation engine.
//!
//! The pieces, leaves first:
//! - `name`: the registration-name grammar, parsed once into a typed value
//! - `event`: the canonical normalized event delivered to listeners
//! - `normalize`: raw platform event or manual fire to canonical event
//! - `registry`: per-target, per-kind handler storage
//! - `qualifier`: once, idle-debounce and throttle wrappers
//! - `dispatch`: the ancestry walk with delegation filtering
//! - `lifecycle`: lazy native bindings and composite derivations

pub mod event;
pub mod name;
pub mod qualifier;

pub(crate) mod normalize;
pub(crate) mod registry;

mod dispatch;
pub(crate) mod lifecycle;

pub use event::{CanonicalEvent, DragInfo, Flow, KeyState, PointerState};
pub use name::EventName;
pub use qualifier::Qualifier;
