//! # Selector Engine
//!
//! Snapshot-valid addresses for elements.
//!
//! Priority when generating:
//! 1. the generated class (`.mc-el-…`) when unique in the document
//! 2. a user-authored id (`#hero`) when unique and not owned by the editor
//! 3. a positional path from `body` (or `html` for head content), e.g.
//!    `body > table > tbody > tr:nth-of-type(2) > td`
//!
//! Placeholders and editor chrome are invisible to paths: they are skipped in
//! sibling counts and never get a selector of their own.

use std::fmt;
use std::str::FromStr;

use crate::error::DomError;
use crate::markers::{generated_class, is_editor_internal, is_editor_owned_id};
use crate::tree::{NodeId, NodeKind, Tree};

/// Typed form of a selector string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Class(String),
    Id(String),
    Path(Vec<PathSegment>),
}

/// One `tag` or `tag:nth-of-type(k)` step of a positional path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub tag: String,
    /// 1-based position among same-tag siblings; `None` when the tag is unique
    pub nth: Option<usize>,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nth {
            Some(k) => write!(f, "{}:nth-of-type({})", self.tag, k),
            None => write!(f, "{}", self.tag),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Class(class) => write!(f, ".{}", class),
            Selector::Id(id) => write!(f, "#{}", id),
            Selector::Path(segments) => {
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" > ")?;
                    }
                    write!(f, "{}", segment)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || DomError::InvalidSelector(s.to_string());

        if let Some(class) = s.strip_prefix('.') {
            return is_identifier(class)
                .then(|| Selector::Class(class.to_string()))
                .ok_or_else(invalid);
        }
        if let Some(id) = s.strip_prefix('#') {
            return is_identifier(id)
                .then(|| Selector::Id(id.to_string()))
                .ok_or_else(invalid);
        }

        let mut segments = Vec::new();
        for part in s.split('>') {
            segments.push(parse_segment(part.trim()).ok_or_else(invalid)?);
        }
        match segments.first() {
            Some(first) if first.tag == "body" || first.tag == "html" => {
                Ok(Selector::Path(segments))
            }
            _ => Err(invalid()),
        }
    }
}

fn parse_segment(part: &str) -> Option<PathSegment> {
    let (tag, nth) = match part.split_once(":nth-of-type(") {
        Some((tag, rest)) => {
            let k: usize = rest.strip_suffix(')')?.trim().parse().ok()?;
            if k == 0 {
                return None;
            }
            (tag, Some(k))
        }
        None => (part, None),
    };
    let valid_tag = !tag.is_empty()
        && tag.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    valid_tag.then(|| PathSegment {
        tag: tag.to_ascii_lowercase(),
        nth,
    })
}

/// Characters a generated class or user id may use in a `.x` / `#x` selector
fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Compute a selector for an element; `None` for editor-internal or non-element nodes
pub fn generate(tree: &Tree, node: NodeId) -> Option<Selector> {
    if !tree.is_element(node) || !tree.is_attached(node) || is_editor_internal(tree, node) {
        return None;
    }

    if let Some(class) = generated_class(tree, node) {
        if is_identifier(class) && count_with_class(tree, class) == 1 {
            return Some(Selector::Class(class.to_string()));
        }
    }

    if let Some(id) = tree.get_attr(node, "id") {
        if !is_editor_owned_id(id) && is_identifier(id) && count_with_id(tree, id) == 1 {
            return Some(Selector::Id(id.to_string()));
        }
    }

    positional_path(tree, node).map(Selector::Path)
}

/// Positional path of an element, ignoring its class and id
pub fn path(tree: &Tree, node: NodeId) -> Option<Selector> {
    if !tree.is_element(node) || !tree.is_attached(node) {
        return None;
    }
    positional_path(tree, node).map(Selector::Path)
}

/// Resolve a selector against the current tree
///
/// Not finding anything is an ordinary outcome, not an error.
pub fn resolve(tree: &Tree, selector: &Selector) -> Option<NodeId> {
    let document = tree.document();
    match selector {
        Selector::Class(class) => tree.find_first(document, |t, id| t.has_class(id, class)),
        Selector::Id(value) => tree.find_first(document, |t, id| {
            t.is_element(id) && t.get_attr(id, "id") == Some(value.as_str())
        }),
        Selector::Path(segments) => resolve_path(tree, segments),
    }
}

/// Parse and resolve in one step; unparseable strings resolve to nothing
pub fn resolve_str(tree: &Tree, selector: &str) -> Option<NodeId> {
    let parsed = selector.parse::<Selector>().ok()?;
    resolve(tree, &parsed)
}

fn count_with_class(tree: &Tree, class: &str) -> usize {
    tree.find_all(tree.document(), |t, id| t.has_class(id, class))
        .len()
}

fn count_with_id(tree: &Tree, value: &str) -> usize {
    tree.find_all(tree.document(), |t, id| {
        t.is_element(id) && t.get_attr(id, "id") == Some(value)
    })
    .len()
}

/// Same-tag element siblings that count for `nth-of-type`
fn counted_siblings(tree: &Tree, parent: NodeId, tag: &str) -> Vec<NodeId> {
    tree.children(parent)
        .iter()
        .copied()
        .filter(|c| tree.tag(*c) == Some(tag) && !is_editor_internal(tree, *c))
        .collect()
}

fn positional_path(tree: &Tree, node: NodeId) -> Option<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut current = node;

    loop {
        let tag = tree.tag(current)?;
        let parent = tree.parent(current)?;

        if is_editor_internal(tree, current) {
            return None;
        }

        let at_anchor = match tag {
            "body" => true,
            "html" => matches!(tree.kind(parent), NodeKind::Document),
            _ => false,
        };
        if at_anchor {
            segments.push(PathSegment {
                tag: tag.to_string(),
                nth: None,
            });
            break;
        }

        let siblings = counted_siblings(tree, parent, tag);
        let nth = if siblings.len() > 1 {
            Some(siblings.iter().position(|s| *s == current)? + 1)
        } else {
            None
        };
        segments.push(PathSegment {
            tag: tag.to_string(),
            nth,
        });
        current = parent;
    }

    segments.reverse();
    Some(segments)
}

fn resolve_path(tree: &Tree, segments: &[PathSegment]) -> Option<NodeId> {
    let (first, rest) = segments.split_first()?;
    let mut current = match first.tag.as_str() {
        "html" => tree.html_element()?,
        "body" => tree.body()?,
        _ => return None,
    };

    for segment in rest {
        let siblings = counted_siblings(tree, current, &segment.tag);
        let index = segment.nth.unwrap_or(1) - 1;
        current = *siblings.get(index)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn find_tag(tree: &Tree, tag: &str) -> Vec<NodeId> {
        tree.find_all(tree.document(), |t, id| t.tag(id) == Some(tag))
    }

    #[test]
    fn test_path_ignores_identity() {
        let tree = parse(r#"<p>a</p><div class="mc-root mc-el-s-1" id="mc-el-s-1">x</div>"#);
        let div = find_tag(&tree, "div")[0];
        assert_eq!(path(&tree, div).unwrap().to_string(), "body > div");
    }

    #[test]
    fn test_generated_class_has_priority() {
        let tree = parse(r#"<div id="hero" class="box mc-el-s-1">x</div>"#);
        let div = find_tag(&tree, "div")[0];
        assert_eq!(
            generate(&tree, div),
            Some(Selector::Class("mc-el-s-1".to_string()))
        );
    }

    #[test]
    fn test_user_id_used_before_path() {
        let tree = parse(r#"<div id="hero">x</div>"#);
        let div = find_tag(&tree, "div")[0];
        assert_eq!(generate(&tree, div).unwrap().to_string(), "#hero");
    }

    #[test]
    fn test_editor_owned_id_is_skipped() {
        let tree = parse(r#"<div id="mc-el-s-9">x</div>"#);
        let div = find_tag(&tree, "div")[0];
        assert_eq!(generate(&tree, div).unwrap().to_string(), "body > div");
    }

    #[test]
    fn test_duplicate_id_falls_back_to_path() {
        let tree = parse(r#"<p id="a">1</p><p id="a">2</p>"#);
        let second = find_tag(&tree, "p")[1];
        assert_eq!(
            generate(&tree, second).unwrap().to_string(),
            "body > p:nth-of-type(2)"
        );
    }

    #[test]
    fn test_path_skips_editor_internal_siblings() {
        let tree = parse(
            r#"<div class="mc-ui-toolbar"></div><div>a</div><div class="mc-placeholder">drop</div><div>b</div>"#,
        );
        let divs = find_tag(&tree, "div");
        let b = divs[3];
        let selector = generate(&tree, b).unwrap();
        assert_eq!(selector.to_string(), "body > div:nth-of-type(2)");
        assert_eq!(resolve(&tree, &selector), Some(b));

        assert_eq!(generate(&tree, divs[0]), None);
        assert_eq!(generate(&tree, divs[2]), None);
    }

    #[test]
    fn test_parse_display_roundtrip() {
        for input in [
            ".mc-el-a-1",
            "#hero",
            "body",
            "body > table > tbody > tr:nth-of-type(2) > td",
            "html > head > style",
        ] {
            let selector: Selector = input.parse().unwrap();
            assert_eq!(selector.to_string(), input);
        }
    }

    #[test]
    fn test_invalid_selectors_are_rejected() {
        for input in ["", ".", "#1abc", "div > p", "body > p:nth-of-type(0)", "body >> p", ".a b"] {
            assert!(input.parse::<Selector>().is_err(), "{input} should be invalid");
        }
    }

    #[test]
    fn test_unresolvable_is_none() {
        let tree = parse("<p>x</p>");
        assert_eq!(resolve_str(&tree, "body > p:nth-of-type(3)"), None);
        assert_eq!(resolve_str(&tree, ".missing"), None);
        assert_eq!(resolve_str(&tree, "not a selector!"), None);
    }

    #[test]
    fn test_every_element_resolves_to_itself() {
        let tree = parse(
            r#"<table class="mc-root"><tbody><tr><td class="mc-content"><p>a</p><p>b</p><img src="x"></td><td><h1 id="t">T</h1></td></tr><tr><td></td></tr></tbody></table>"#,
        );
        for node in tree.find_all(tree.document(), |t, id| t.is_element(id)) {
            let selector = generate(&tree, node).expect("selector");
            assert_eq!(resolve(&tree, &selector), Some(node), "{selector}");
        }
    }
}
