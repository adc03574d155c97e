//! Event object normalizer.
//!
//! Builds one [`CanonicalEvent`] from either a raw platform event or a
//! manual `fire` descriptor. Classification is table-driven: a kind is
//! pointer-like, keyboard-like or neither, and either bubbles or does not.
//! Unknown kinds are acceptable; they default to bubbling pass-through.

use serde_json::Value;

use crate::events::event::{CanonicalEvent, KeyState, PointerState};
use crate::platform::RawEvent;
use crate::tree::{DocumentTree, TargetId};

const POINTER_KINDS: &[&str] = &[
    "click",
    "dblclick",
    "contextmenu",
    "mousedown",
    "mouseup",
    "mousemove",
    "mouseover",
    "mouseout",
    "mouseenter",
    "mouseleave",
    "mousewheel",
    "dragstart",
    "dragmove",
    "dragend",
];

const KEYBOARD_KINDS: &[&str] = &["keydown", "keypress", "keyup"];

/// Kinds that never bubble; they reach listeners on the first level only
/// and are delegated via composite derivation, never via the ancestry walk.
const NON_BUBBLING_KINDS: &[&str] = &["focus", "blur", "mouseenter", "mouseleave", "load", "unload"];

/// Kinds with a same-named native counterpart: the lifecycle manager gives
/// these a generic native binding. Anything else is synthetic (`fire` only).
const NATIVE_KINDS: &[&str] = &[
    "click",
    "dblclick",
    "contextmenu",
    "mousedown",
    "mouseup",
    "mousemove",
    "mouseover",
    "mouseout",
    "mousewheel",
    "keydown",
    "keypress",
    "keyup",
    "focus",
    "blur",
    "input",
    "change",
    "submit",
    "reset",
    "select",
    "scroll",
    "resize",
    "load",
    "unload",
    "error",
];

pub(crate) fn is_pointer_kind(kind: &str) -> bool {
    POINTER_KINDS.contains(&kind)
}

pub(crate) fn is_keyboard_kind(kind: &str) -> bool {
    KEYBOARD_KINDS.contains(&kind)
}

pub(crate) fn kind_bubbles(kind: &str) -> bool {
    !NON_BUBBLING_KINDS.contains(&kind)
}

pub(crate) fn is_native_kind(kind: &str) -> bool {
    NATIVE_KINDS.contains(&kind)
}

/// Normalize a raw platform event.
pub(crate) fn normalize(
    tree: &dyn DocumentTree,
    now_ms: u64,
    raw: &RawEvent,
) -> CanonicalEvent {
    let target = resolve_target(tree, raw.target);
    let mut ev = CanonicalEvent::new(&raw.kind, target, raw.time_ms.unwrap_or(now_ms));
    ev.bubbles = kind_bubbles(&raw.kind);
    if is_pointer_kind(&raw.kind) {
        ev.pointer = Some(PointerState {
            x: raw.x,
            y: raw.y,
            button: raw.button,
        });
        ev.related_target = related_target(raw);
    }
    if is_keyboard_kind(&raw.kind) {
        ev.key = Some(KeyState {
            key: raw.key.clone().unwrap_or_default(),
            alt: raw.alt,
            ctrl: raw.ctrl,
            shift: raw.shift,
            meta: raw.meta,
        });
    }
    ev.original = Some(raw.clone());
    ev
}

/// Build the event for a manual `fire` call: no raw counterpart, `data`
/// merged into `detail` without ever touching type/target/original.
pub(crate) fn synthesize(
    kind: &str,
    target: TargetId,
    now_ms: u64,
    data: Option<Value>,
) -> CanonicalEvent {
    let mut ev = CanonicalEvent::new(kind, target, now_ms);
    ev.bubbles = kind_bubbles(kind);
    match data {
        Some(Value::Object(map)) => {
            for (key, value) in map {
                if matches!(key.as_str(), "type" | "target" | "originalEvent") {
                    continue;
                }
                ev.detail.insert(key, value);
            }
        }
        Some(other) => {
            ev.detail.insert("data".to_string(), other);
        }
        None => {}
    }
    ev
}

/// Text-node targets are promoted to their parent element.
fn resolve_target(tree: &dyn DocumentTree, target: TargetId) -> TargetId {
    if tree.is_text(target) {
        tree.parent(target).unwrap_or(target)
    } else {
        target
    }
}

/// The related target may arrive under one of several legacy names.
fn related_target(raw: &RawEvent) -> Option<TargetId> {
    raw.related_target.or(match raw.kind.as_str() {
        "mouseover" | "mouseenter" => raw.from_element,
        "mouseout" | "mouseleave" => raw.to_element,
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::DomTree;
    use serde_json::json;

    #[test]
    fn promotes_text_targets() {
        let mut tree = DomTree::new();
        let p = tree.element(tree.root(), "p");
        let text = tree.text(p);

        let ev = normalize(&tree, 0, &RawEvent::new("click", text));
        assert_eq!(ev.target, p);
    }

    #[test]
    fn copies_fields_only_for_classified_kinds() {
        let tree = DomTree::new();
        let root = tree.root();

        let click = normalize(&tree, 0, &RawEvent::new("click", root).at(3, 4).button(1));
        assert_eq!(click.pointer, Some(PointerState { x: 3, y: 4, button: 1 }));
        assert!(click.key.is_none());

        let key = normalize(&tree, 0, &RawEvent::new("keydown", root).key("Enter"));
        assert!(key.pointer.is_none());
        assert_eq!(key.key.as_ref().unwrap().key, "Enter");

        let custom = normalize(&tree, 0, &RawEvent::new("submit", root).at(3, 4));
        assert!(custom.pointer.is_none());
        assert!(custom.key.is_none());
    }

    #[test]
    fn resolves_legacy_related_target_names() {
        let mut tree = DomTree::new();
        let a = tree.element(tree.root(), "a");
        let b = tree.element(tree.root(), "b");

        let mut raw = RawEvent::new("mouseover", a);
        raw.from_element = Some(b);
        assert_eq!(normalize(&tree, 0, &raw).related_target, Some(b));

        let mut raw = RawEvent::new("mouseout", a);
        raw.to_element = Some(b);
        assert_eq!(normalize(&tree, 0, &raw).related_target, Some(b));

        // The canonical field wins over legacy aliases.
        let mut raw = RawEvent::new("mouseover", a).related(b);
        raw.from_element = Some(a);
        assert_eq!(normalize(&tree, 0, &raw).related_target, Some(b));
    }

    #[test]
    fn bubbles_come_from_the_table() {
        let tree = DomTree::new();
        let root = tree.root();
        assert!(normalize(&tree, 0, &RawEvent::new("click", root)).bubbles);
        assert!(!normalize(&tree, 0, &RawEvent::new("focus", root)).bubbles);
        // Unknown kinds default to bubbling pass-through.
        assert!(normalize(&tree, 0, &RawEvent::new("step", root)).bubbles);
    }

    #[test]
    fn synthesized_data_never_overwrites_identity() {
        let tree = DomTree::new();
        let root = tree.root();
        let ev = synthesize(
            "play",
            root,
            7,
            Some(json!({"frame": 3, "type": "hijack", "target": 99})),
        );
        assert_eq!(ev.event_type, "play");
        assert_eq!(ev.target, root);
        assert!(ev.original.is_none());
        assert_eq!(ev.detail.get("frame"), Some(&json!(3)));
        assert!(ev.detail.get("type").is_none());
        assert!(ev.detail.get("target").is_none());
        assert_eq!(ev.time_stamp_ms, 7);
    }

    #[test]
    fn non_object_data_lands_under_a_key() {
        let tree = DomTree::new();
        let ev = synthesize("step", tree.root(), 0, Some(json!(42)));
        assert_eq!(ev.detail.get("data"), Some(&json!(42)));
    }
}
