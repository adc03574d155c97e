//! Listener registry.
//!
//! Per-target, per-kind handler storage. Each kind's handlers are one
//! ordered sequence split by `delegate_count`: indices `[0, delegate_count)`
//! are delegated handlers (registered with a selector), the rest are direct.
//! Delegated handlers are inserted at that boundary, direct handlers are
//! appended, and removal never reorders survivors.
//!
//! A `TypeRecord` is deleted the instant its handler list empties; a target
//! entry is deleted once it has no records. Target uids are assigned on
//! first registration, monotonically, and never reused.

use std::collections::HashMap;
use std::rc::Rc;

use crate::events::lifecycle::Dispatcher;
use crate::selector::Selector;
use crate::session::Listener;
use crate::tree::TargetId;

/// One stored listener.
#[derive(Clone)]
pub(crate) struct Handler {
    /// Full canonical registration name; removal matches this exactly.
    pub name: String,
    pub listener: Listener,
    /// Present iff this is a delegated handler.
    pub selector: Option<Rc<Selector>>,
}

/// All handlers for one `(target, kind)` pair plus the native dispatcher
/// detecting the kind, if one is required.
pub(crate) struct TypeRecord {
    pub handlers: Vec<Handler>,
    pub delegate_count: usize,
    pub dispatcher: Option<Dispatcher>,
}

pub(crate) struct TargetEntry {
    #[allow(dead_code)]
    pub uid: u64,
    pub types: HashMap<String, TypeRecord>,
}

/// Outcome of a removal pass over one record.
pub(crate) enum RemoveOutcome {
    /// No record for the kind (or nothing matched and the record survives
    /// untouched).
    Kept,
    /// The record emptied and was deleted; the dispatcher must be torn down.
    Emptied { dispatcher: Option<Dispatcher> },
}

#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<TargetId, TargetEntry>,
    uids: HashMap<TargetId, u64>,
    next_uid: u64,
}

impl Registry {
    /// Insert a handler, creating the entry/record as needed. Returns true
    /// when the record was newly created (the caller then installs a
    /// dispatcher).
    pub fn insert_handler(&mut self, target: TargetId, kind: &str, handler: Handler) -> bool {
        let uid = *self.uids.entry(target).or_insert_with(|| {
            let uid = self.next_uid;
            self.next_uid += 1;
            uid
        });
        let entry = self.entries.entry(target).or_insert_with(|| TargetEntry {
            uid,
            types: HashMap::new(),
        });
        let mut created = false;
        let record = entry.types.entry(kind.to_string()).or_insert_with(|| {
            created = true;
            TypeRecord {
                handlers: Vec::new(),
                delegate_count: 0,
                dispatcher: None,
            }
        });
        if handler.selector.is_some() {
            let at = record.delegate_count;
            record.handlers.insert(at, handler);
            record.delegate_count += 1;
        } else {
            record.handlers.push(handler);
        }
        debug_assert!(record.well_partitioned());
        created
    }

    pub fn set_dispatcher(&mut self, target: TargetId, kind: &str, dispatcher: Option<Dispatcher>) {
        if let Some(record) = self
            .entries
            .get_mut(&target)
            .and_then(|e| e.types.get_mut(kind))
        {
            record.dispatcher = dispatcher;
        }
    }

    /// Remove handlers of `kind`: all of them when `exact` is `None` (bare
    /// type), otherwise those whose canonical name matches exactly.
    pub fn remove_handlers(
        &mut self,
        target: TargetId,
        kind: &str,
        exact: Option<&str>,
    ) -> RemoveOutcome {
        let Some(entry) = self.entries.get_mut(&target) else {
            return RemoveOutcome::Kept;
        };
        let Some(record) = entry.types.get_mut(kind) else {
            return RemoveOutcome::Kept;
        };

        let mut index = 0;
        while index < record.handlers.len() {
            let doomed = match exact {
                None => true,
                Some(name) => record.handlers[index].name == name,
            };
            if doomed {
                if index < record.delegate_count {
                    record.delegate_count -= 1;
                }
                record.handlers.remove(index);
            } else {
                index += 1;
            }
        }
        debug_assert!(record.well_partitioned());

        if record.handlers.is_empty() {
            let dispatcher = entry.types.remove(kind).and_then(|r| r.dispatcher);
            if entry.types.is_empty() {
                self.entries.remove(&target);
            }
            RemoveOutcome::Emptied { dispatcher }
        } else {
            RemoveOutcome::Kept
        }
    }

    /// Shallow copy of the handler list, taken at the start of dispatch for
    /// a level so listeners may mutate the registry mid-walk.
    pub fn snapshot(&self, target: TargetId, kind: &str) -> Option<(Vec<Handler>, usize)> {
        let record = self.entries.get(&target)?.types.get(kind)?;
        Some((record.handlers.clone(), record.delegate_count))
    }

    pub fn has_record(&self, target: TargetId, kind: &str) -> bool {
        self.entries
            .get(&target)
            .is_some_and(|e| e.types.contains_key(kind))
    }

    /// Delete a target's whole entry, yielding each record's kind and
    /// dispatcher for teardown.
    pub fn take_entry(&mut self, target: TargetId) -> Vec<(String, Option<Dispatcher>)> {
        let Some(entry) = self.entries.remove(&target) else {
            return Vec::new();
        };
        entry
            .types
            .into_iter()
            .map(|(kind, record)| (kind, record.dispatcher))
            .collect()
    }

    pub fn targets(&self) -> Vec<TargetId> {
        self.entries.keys().copied().collect()
    }

    /// (delegated, direct) handler counts for a record.
    pub fn counts(&self, target: TargetId, kind: &str) -> Option<(usize, usize)> {
        let record = self.entries.get(&target)?.types.get(kind)?;
        Some((
            record.delegate_count,
            record.handlers.len() - record.delegate_count,
        ))
    }

    #[cfg(test)]
    pub fn uid_of(&self, target: TargetId) -> Option<u64> {
        self.uids.get(&target).copied()
    }
}

impl TypeRecord {
    fn well_partitioned(&self) -> bool {
        self.delegate_count <= self.handlers.len()
            && self
                .handlers
                .iter()
                .take(self.delegate_count)
                .all(|h| h.selector.is_some())
            && self
                .handlers
                .iter()
                .skip(self.delegate_count)
                .all(|h| h.selector.is_none())
    }
}
