//! Document-tree access layer.
//!
//! The engine never mutates the tree; it only needs ancestor traversal,
//! containment testing and selector matching, so those capabilities are
//! behind the [`DocumentTree`] trait. Any host tree can implement it;
//! [`DomTree`] is a small arena implementation used by the tests and by
//! embedders that have no tree of their own.

use serde::Serialize;

use crate::selector;

/// Handle to a node in a document tree.
///
/// The root handle doubles as the window/document singleton: temporary
/// document-wide bindings (drag move/release, window blur) attach to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TargetId(pub(crate) u32);

/// Capabilities the event engine requires from a document tree.
pub trait DocumentTree {
    /// Parent of `node`, or `None` for the root.
    fn parent(&self, node: TargetId) -> Option<TargetId>;

    /// Ancestor-or-self containment: true when `node` is `ancestor` or a
    /// descendant of it.
    fn contains(&self, ancestor: TargetId, node: TargetId) -> bool;

    /// Lowercase tag name, or `None` for non-element nodes.
    fn tag_name(&self, node: TargetId) -> Option<&str>;

    /// Whether the node carries the given class.
    fn has_class(&self, node: TargetId, class: &str) -> bool;

    /// Full selector evaluation against a single candidate node.
    fn matches(&self, node: TargetId, selector: &str) -> bool;

    /// Whether the node is a text node (text targets are promoted to their
    /// parent element during normalization).
    fn is_text(&self, node: TargetId) -> bool;

    /// The tree root (window/document singleton).
    fn root(&self) -> TargetId;
}

enum NodeKind {
    Element {
        tag: String,
        id: Option<String>,
        classes: Vec<String>,
    },
    Text,
}

struct NodeData {
    parent: Option<TargetId>,
    kind: NodeKind,
}

/// Arena-backed document tree.
pub struct DomTree {
    nodes: Vec<NodeData>,
}

impl DomTree {
    /// Create a tree containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                parent: None,
                kind: NodeKind::Element {
                    tag: "#document".to_string(),
                    id: None,
                    classes: Vec::new(),
                },
            }],
        }
    }

    /// Append an element node under `parent`.
    pub fn element(&mut self, parent: TargetId, tag: &str) -> TargetId {
        self.push(NodeData {
            parent: Some(parent),
            kind: NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
                id: None,
                classes: Vec::new(),
            },
        })
    }

    /// Append a text node under `parent`.
    pub fn text(&mut self, parent: TargetId) -> TargetId {
        self.push(NodeData {
            parent: Some(parent),
            kind: NodeKind::Text,
        })
    }

    /// Set the element's id attribute.
    pub fn set_id(&mut self, node: TargetId, id: &str) {
        if let NodeKind::Element { id: slot, .. } = &mut self.nodes[node.0 as usize].kind {
            *slot = Some(id.to_string());
        }
    }

    /// Add a class to the element's class list.
    pub fn add_class(&mut self, node: TargetId, class: &str) {
        if let NodeKind::Element { classes, .. } = &mut self.nodes[node.0 as usize].kind {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
    }

    fn push(&mut self, data: NodeData) -> TargetId {
        let id = TargetId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    fn node(&self, node: TargetId) -> &NodeData {
        &self.nodes[node.0 as usize]
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree for DomTree {
    fn parent(&self, node: TargetId) -> Option<TargetId> {
        self.node(node).parent
    }

    fn contains(&self, ancestor: TargetId, node: TargetId) -> bool {
        let mut cursor = Some(node);
        while let Some(n) = cursor {
            if n == ancestor {
                return true;
            }
            cursor = self.node(n).parent;
        }
        false
    }

    fn tag_name(&self, node: TargetId) -> Option<&str> {
        match &self.node(node).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text => None,
        }
    }

    fn has_class(&self, node: TargetId, class: &str) -> bool {
        match &self.node(node).kind {
            NodeKind::Element { classes, .. } => classes.iter().any(|c| c == class),
            NodeKind::Text => false,
        }
    }

    fn matches(&self, node: TargetId, raw: &str) -> bool {
        let Some(compounds) = selector::parse_selector(raw) else {
            return false;
        };
        let NodeKind::Element { tag, id, classes } = &self.node(node).kind else {
            return false;
        };
        compounds.iter().any(|compound| {
            if let Some(want) = &compound.tag {
                if want != tag {
                    return false;
                }
            }
            if let Some(want) = &compound.id {
                if id.as_deref() != Some(want.as_str()) {
                    return false;
                }
            }
            compound.classes.iter().all(|c| classes.contains(c))
        })
    }

    fn is_text(&self, node: TargetId) -> bool {
        matches!(self.node(node).kind, NodeKind::Text)
    }

    fn root(&self) -> TargetId {
        TargetId(0)
    }
}
