//! Registration-name grammar.
//!
//! `type[:relay(selector)][:once|:idle(ms)|:throttle(ms)][.label]`
//!
//! Names are parsed once, at `on`/`off` time, into a typed [`EventName`];
//! dispatch never re-derives behavior from strings. A comma- or
//! whitespace-separated list registers the same listener under each name.
//! Malformed names fail synchronously with [`Error::Syntax`].

use crate::events::qualifier::Qualifier;
use crate::selector::Selector;
use crate::Error;

/// A parsed registration name.
#[derive(Debug, Clone)]
pub struct EventName {
    /// Logical event type (ASCII letters only).
    pub kind: String,
    /// Delegation selector from `:relay(...)`.
    pub selector: Option<Selector>,
    /// Invocation qualifier; at most one per name.
    pub qualifier: Option<Qualifier>,
    /// Disambiguating label from a trailing `.label`.
    pub label: Option<String>,
}

impl EventName {
    /// Parse a single name.
    pub fn parse(name: &str) -> Result<Self, Error> {
        Parser { name, rest: name }.run()
    }

    /// Parse a comma/whitespace-separated list of names. The whole list is
    /// validated before the caller mutates anything.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, Error> {
        let mut names = Vec::new();
        for part in split_names(input) {
            names.push(Self::parse(part)?);
        }
        if names.is_empty() {
            return Err(Error::Syntax {
                name: input.to_string(),
                reason: "empty event name".to_string(),
            });
        }
        Ok(names)
    }

    /// Rebuild the normalized full name; removal matches on this exact form.
    pub fn canonical(&self) -> String {
        let mut out = self.kind.clone();
        if let Some(selector) = &self.selector {
            out.push_str(":relay(");
            out.push_str(selector.raw());
            out.push(')');
        }
        match self.qualifier {
            Some(Qualifier::Once) => out.push_str(":once"),
            Some(Qualifier::Idle(ms)) => {
                out.push_str(":idle(");
                out.push_str(&ms.to_string());
                out.push(')');
            }
            Some(Qualifier::Throttle(ms)) => {
                out.push_str(":throttle(");
                out.push_str(&ms.to_string());
                out.push(')');
            }
            None => {}
        }
        if let Some(label) = &self.label {
            out.push('.');
            out.push_str(label);
        }
        out
    }

    /// A bare type (no selector, qualifier or label) removes every handler
    /// of its kind.
    pub fn is_bare(&self) -> bool {
        self.selector.is_none() && self.qualifier.is_none() && self.label.is_none()
    }
}

/// Validate a bare event kind (used by `fire`, which takes no qualifiers).
pub fn validate_kind(kind: &str) -> Result<(), Error> {
    if !kind.is_empty() && kind.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(Error::Syntax {
            name: kind.to_string(),
            reason: "event type must be one or more ASCII letters".to_string(),
        })
    }
}

/// Split on commas and whitespace at paren depth zero, so relay selectors
/// may contain either.
fn split_names(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' | ' ' | '\t' | '\n' if depth == 0 => {
                if i > start {
                    parts.push(&input[start..i]);
                }
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if start < input.len() {
        parts.push(&input[start..]);
    }
    parts
}

struct Parser<'a> {
    name: &'a str,
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<EventName, Error> {
        let kind = self.take_letters();
        if kind.is_empty() {
            return self.fail("event type must be one or more ASCII letters");
        }

        let mut selector = None;
        let mut qualifier: Option<Qualifier> = None;
        while let Some(rest) = self.rest.strip_prefix(':') {
            self.rest = rest;
            let word = self.take_letters();
            match word {
                "relay" => {
                    if selector.is_some() {
                        return self.fail("duplicate relay selector");
                    }
                    if qualifier.is_some() {
                        return self.fail("relay must precede the qualifier");
                    }
                    let inner = self.take_parenthesized()?;
                    if inner.trim().is_empty() {
                        return self.fail("relay selector must not be empty");
                    }
                    selector = Some(Selector::compile(inner.trim()));
                }
                "once" => {
                    if qualifier.is_some() {
                        return self.fail("at most one of once/idle/throttle");
                    }
                    qualifier = Some(Qualifier::Once);
                }
                "idle" | "throttle" => {
                    if qualifier.is_some() {
                        return self.fail("at most one of once/idle/throttle");
                    }
                    let ms = self.take_duration()?;
                    qualifier = Some(if word == "idle" {
                        Qualifier::Idle(ms)
                    } else {
                        Qualifier::Throttle(ms)
                    });
                }
                _ => return self.fail("unknown qualifier"),
            }
        }

        let label = if let Some(rest) = self.rest.strip_prefix('.') {
            if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_alphanumeric()) {
                return self.fail("label must be alphanumeric");
            }
            self.rest = "";
            Some(rest.to_string())
        } else {
            None
        };

        if !self.rest.is_empty() {
            return self.fail("unexpected trailing characters");
        }

        Ok(EventName {
            kind: kind.to_string(),
            selector,
            qualifier,
            label,
        })
    }

    fn take_letters(&mut self) -> &'a str {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(self.rest.len());
        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        word
    }

    fn take_parenthesized(&mut self) -> Result<&'a str, Error> {
        let Some(rest) = self.rest.strip_prefix('(') else {
            return Err(self.error("expected `(`"));
        };
        let mut depth = 1usize;
        for (i, c) in rest.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.rest = &rest[i + 1..];
                        return Ok(&rest[..i]);
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unbalanced parentheses"))
    }

    fn take_duration(&mut self) -> Result<u32, Error> {
        let inner = self.take_parenthesized()?;
        match inner.parse::<u32>() {
            Ok(ms) if ms > 0 => Ok(ms),
            _ => Err(self.error("duration must be a positive integer")),
        }
    }

    fn fail<T>(&self, reason: &str) -> Result<T, Error> {
        Err(self.error(reason))
    }

    fn error(&self, reason: &str) -> Error {
        Error::Syntax {
            name: self.name.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> EventName {
        EventName::parse(name).expect(name)
    }

    #[test]
    fn parses_every_grammar_slot() {
        let n = parse("click:relay(a.active):idle(250).nav");
        assert_eq!(n.kind, "click");
        assert_eq!(n.selector.as_ref().unwrap().raw(), "a.active");
        assert_eq!(n.qualifier, Some(Qualifier::Idle(250)));
        assert_eq!(n.label.as_deref(), Some("nav"));
        assert_eq!(n.canonical(), "click:relay(a.active):idle(250).nav");
    }

    #[test]
    fn bare_type() {
        let n = parse("click");
        assert!(n.is_bare());
        assert_eq!(n.canonical(), "click");
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in [
            "",
            "click2",
            "3click",
            "click:once:idle(10)",
            "click:idle(0)",
            "click:idle(abc)",
            "click:idle",
            "click:relay()",
            "click:relay(a",
            "click:idle(10):relay(a)",
            "click:bogus",
            "click.",
            "click.two.labels",
            "click!",
        ] {
            assert!(EventName::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn splits_lists_outside_parens() {
        let names = EventName::parse_list("click:relay(a, b), keydown mouseup").unwrap();
        let canon: Vec<String> = names.iter().map(EventName::canonical).collect();
        assert_eq!(canon, vec!["click:relay(a, b)", "keydown", "mouseup"]);
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(EventName::parse_list("  ").is_err());
    }
}
