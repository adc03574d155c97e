//! Selector compilation for delegated handlers.
//!
//! A registered `relay(...)` selector is compiled once, at registration
//! time. Simple selectors (a tag, a single class, or a tag plus one class)
//! get a precompiled fast path that avoids full selector evaluation during
//! dispatch; everything else falls back to [`DocumentTree::matches`].

use crate::tree::{DocumentTree, TargetId};

/// One compound selector: `tag#id.class1.class2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

/// A compiled delegation selector.
#[derive(Debug, Clone)]
pub struct Selector {
    raw: String,
    fast: Option<FastPath>,
}

/// Fast-path predicate for a simple `tag.class` selector.
#[derive(Debug, Clone)]
struct FastPath {
    tag: Option<String>,
    class: Option<String>,
}

impl Selector {
    /// Compile a selector string, deriving the fast path when the selector
    /// is a single compound with no id and at most one class.
    pub fn compile(raw: &str) -> Self {
        let fast = parse_selector(raw).and_then(|compounds| {
            let [compound] = compounds.as_slice() else {
                return None;
            };
            if compound.id.is_some() || compound.classes.len() > 1 {
                return None;
            }
            if compound.tag.is_none() && compound.classes.is_empty() {
                return None;
            }
            Some(FastPath {
                tag: compound.tag.clone(),
                class: compound.classes.first().cloned(),
            })
        });
        Self {
            raw: raw.to_string(),
            fast,
        }
    }

    /// The selector source text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Test the selector against a candidate node.
    pub(crate) fn hits(&self, tree: &dyn DocumentTree, node: TargetId) -> bool {
        if let Some(fast) = &self.fast {
            if let Some(tag) = &fast.tag {
                if tree.tag_name(node) != Some(tag.as_str()) {
                    return false;
                }
            }
            if let Some(class) = &fast.class {
                if !tree.has_class(node, class) {
                    return false;
                }
            }
            return true;
        }
        tree.matches(node, &self.raw)
    }

    #[cfg(test)]
    fn has_fast_path(&self) -> bool {
        self.fast.is_some()
    }
}

/// Parse a comma-separated selector list into compounds. Returns `None` for
/// selectors outside the supported subset; such selectors never match.
pub(crate) fn parse_selector(raw: &str) -> Option<Vec<Compound>> {
    let mut compounds = Vec::new();
    for part in raw.split(',') {
        compounds.push(parse_compound(part.trim())?);
    }
    Some(compounds)
}

fn parse_compound(part: &str) -> Option<Compound> {
    if part.is_empty() {
        return None;
    }
    let mut chars = part.chars().peekable();
    let mut compound = Compound {
        tag: None,
        id: None,
        classes: Vec::new(),
    };

    if chars.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
        let mut tag = String::new();
        while let Some(&c) = chars.peek() {
            if !c.is_ascii_alphanumeric() {
                break;
            }
            tag.push(c);
            chars.next();
        }
        compound.tag = Some(tag.to_ascii_lowercase());
    }

    while let Some(marker) = chars.next() {
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if !(c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                break;
            }
            name.push(c);
            chars.next();
        }
        if name.is_empty() {
            return None;
        }
        match marker {
            '#' if compound.id.is_none() => compound.id = Some(name),
            '.' => compound.classes.push(name),
            _ => return None,
        }
    }

    Some(compound)
}
