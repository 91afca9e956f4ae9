//! # Structural Mutations
//!
//! Every edit the surface can request, expressed as a serializable value.
//!
//! ## Semantics
//!
//! - Targets are selector strings, resolved against the document the mutation
//!   is applied to. A selector that resolves nowhere is an ordinary failure.
//! - Every target must lie inside the root scope. Anything else is rejected
//!   before the tree is touched.
//! - A failed mutation leaves no trace: callers apply to a scratch copy and
//!   only commit on success.
//!
//! ### Inject
//! - The snippet becomes exactly one node: multi-root snippets are wrapped in
//!   a `div`, bare text in a `p`
//! - `<script>` elements and `on*` attributes are stripped
//! - The node gets a fresh generated identity; inline styles of the node and
//!   its descendants are moved into the stylesheet
//! - Dropping on a placeholder fills its container
//! - Before/after the root scope becomes first/last inside it
//!
//! ### Remove / Duplicate
//! - Rules of removed nodes are deleted; duplicated nodes get fresh
//!   identities and copies of their rules

use mailcanvas_css::DeclarationList;
use mailcanvas_dom::markers::{
    generated_class, is_chrome, is_editor_internal, is_generated_identity, is_placeholder,
};
use mailcanvas_dom::serializer::is_void;
use mailcanvas_dom::{parse_fragment_into, selector, DomError, IdGenerator, NodeId, NodeKind, Tree};
use mailcanvas_protocol::DropPosition;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::document::{sanitize_subtree, strip_active_content, Document};
use crate::placeholder;
use crate::scope::{default_insertion_point, is_in_scope, root_scope};
use crate::style_sync::{
    assign_identity, externalize_subtree, remove_rules_for, rule_keys_in, write_rule,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveDirection::Up => f.write_str("up"),
            MoveDirection::Down => f.write_str("down"),
        }
    }
}

fn default_position() -> DropPosition {
    DropPosition::Inside
}

/// Structural edits (JSON: `{"type": "set-text", "selector": ..., ...}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Mutation {
    /// Insert a markup snippet relative to `target` (default insertion point
    /// when absent or unresolved)
    Inject {
        snippet: String,
        #[serde(default)]
        target: Option<String>,
        #[serde(default = "default_position")]
        position: DropPosition,
    },

    /// Remove a node and its rules
    Remove { selector: String },

    /// Swap with the previous or next sibling element
    Move {
        selector: String,
        direction: MoveDirection,
    },

    /// Deep copy inserted right after the original
    Duplicate { selector: String },

    /// Replace inner content (may contain inline markup)
    SetText { selector: String, content: String },

    /// Set or, with a null value, remove one attribute
    SetAttribute {
        selector: String,
        name: String,
        #[serde(default)]
        value: Option<String>,
    },

    /// Replace the node's stylesheet rule
    SetStyle {
        selector: String,
        declarations: DeclarationList,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Document has no unique root scope")]
    NoRootScope,

    #[error("Selector not found: {0}")]
    SelectorNotFound(String),

    #[error("Target outside the root scope: {0}")]
    OutOfScope(String),

    #[error("Target is an editor-internal node: {0}")]
    EditorInternal(String),

    #[error("Operation not allowed on the root scope")]
    ProtectedRoot,

    #[error("No sibling to move {0}")]
    NoSibling(MoveDirection),

    #[error("Snippet has no content")]
    EmptySnippet,

    #[error("Element <{0}> does not hold text")]
    NotTextBearing(String),

    #[error("Attribute is reserved: {0}")]
    ReservedAttribute(String),

    #[error("Invalid attribute name: {0:?}")]
    InvalidAttributeName(String),

    #[error("Unsafe URL rejected for {0}")]
    UnsafeUrl(String),

    #[error("Style value cannot be stored for {0}")]
    UnsafeStyle(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Outcome reported to callers. Rejections are not errors at this level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MutationResult {
    /// Committed; the document is now at `version`
    Applied { version: u64 },
    /// Nothing changed
    Noop { reason: String },
}

impl MutationResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationResult::Applied { .. })
    }
}

/// Session state a mutation needs besides the document
pub struct MutationContext<'a> {
    pub ids: &'a mut IdGenerator,
    pub placeholder_text: &'a str,
}

/// Attributes holding URLs that must not run script
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "background", "xlink:href"];

impl Mutation {
    /// Apply to a working copy
    pub fn apply(&self, doc: &mut Document, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let root = root_scope(doc.tree()).ok_or(MutationError::NoRootScope)?;

        match self {
            Mutation::Inject {
                snippet,
                target,
                position,
            } => Self::apply_inject(doc, ctx, root, snippet, target.as_deref(), *position),

            Mutation::Remove { selector } => Self::apply_remove(doc, ctx, root, selector),

            Mutation::Move {
                selector,
                direction,
            } => Self::apply_move(doc, root, selector, *direction),

            Mutation::Duplicate { selector } => Self::apply_duplicate(doc, ctx, root, selector),

            Mutation::SetText { selector, content } => {
                Self::apply_set_text(doc, ctx, root, selector, content)
            }

            Mutation::SetAttribute {
                selector,
                name,
                value,
            } => Self::apply_set_attribute(doc, root, selector, name, value.as_deref()),

            Mutation::SetStyle {
                selector,
                declarations,
            } => {
                if let Some(decl) = declarations.first_unembeddable() {
                    return Err(MutationError::UnsafeStyle(decl.property.clone()));
                }
                let node = resolve_target(doc.tree(), root, selector)?;
                write_rule(doc, ctx.ids, node, declarations)?;
                Ok(())
            }
        }
    }

    /// Wire name, for logs and undo descriptions
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Inject { .. } => "inject",
            Mutation::Remove { .. } => "remove",
            Mutation::Move { .. } => "move",
            Mutation::Duplicate { .. } => "duplicate",
            Mutation::SetText { .. } => "set-text",
            Mutation::SetAttribute { .. } => "set-attribute",
            Mutation::SetStyle { .. } => "set-style",
        }
    }

    pub fn selector(&self) -> Option<&str> {
        match self {
            Mutation::Inject { target, .. } => target.as_deref(),
            Mutation::Remove { selector }
            | Mutation::Move { selector, .. }
            | Mutation::Duplicate { selector }
            | Mutation::SetText { selector, .. }
            | Mutation::SetAttribute { selector, .. }
            | Mutation::SetStyle { selector, .. } => Some(selector),
        }
    }

    fn apply_inject(
        doc: &mut Document,
        ctx: &mut MutationContext,
        root: NodeId,
        snippet: &str,
        target: Option<&str>,
        position: DropPosition,
    ) -> Result<(), MutationError> {
        let tree = doc.tree();
        let (target, position) = match target {
            Some(sel) => match selector::resolve_str(tree, sel) {
                Some(node) if !is_in_scope(tree, root, node) => {
                    return Err(MutationError::OutOfScope(sel.to_string()));
                }
                Some(node) if is_placeholder(tree, node) => {
                    (tree.parent(node).unwrap_or(root), DropPosition::Inside)
                }
                Some(node) if is_chrome(tree, node) => {
                    return Err(MutationError::EditorInternal(sel.to_string()));
                }
                Some(node) => (node, position),
                None => {
                    debug!(selector = %sel, "Inject target not found; using default insertion point");
                    (default_insertion_point(tree, root), DropPosition::Inside)
                }
            },
            None => (default_insertion_point(tree, root), DropPosition::Inside),
        };

        let node = build_snippet(doc.tree_mut(), snippet)?;
        assign_identity(doc.tree_mut(), ctx.ids, node)?;
        externalize_subtree(doc, ctx.ids, node)?;

        let tree = doc.tree_mut();
        let tag = tree.tag(node).map(str::to_string);
        let placement = placement(tree, root, target, position, tag.as_deref());
        if let Some(host) = placement.host(tree) {
            placeholder::clear(tree, host);
        }
        placement.insert(tree, node)?;

        debug!(
            tag = tag.as_deref().unwrap_or_default(),
            identity = generated_class(tree, node).unwrap_or_default(),
            "Injected snippet"
        );
        Ok(())
    }

    fn apply_remove(
        doc: &mut Document,
        ctx: &mut MutationContext,
        root: NodeId,
        selector: &str,
    ) -> Result<(), MutationError> {
        let node = resolve_target(doc.tree(), root, selector)?;
        if node == root {
            return Err(MutationError::ProtectedRoot);
        }

        let keys = rule_keys_in(doc.tree(), node);
        let parent = doc.tree().parent(node);
        doc.tree_mut().detach(node);
        remove_rules_for(doc, &keys);

        if let Some(parent) = parent {
            let tree = doc.tree_mut();
            if placeholder::is_container(tree, parent) {
                placeholder::ensure(tree, parent, ctx.placeholder_text);
            }
        }
        Ok(())
    }

    fn apply_move(
        doc: &mut Document,
        root: NodeId,
        selector: &str,
        direction: MoveDirection,
    ) -> Result<(), MutationError> {
        let tree = doc.tree_mut();
        let node = resolve_target(tree, root, selector)?;
        if node == root {
            return Err(MutationError::ProtectedRoot);
        }
        let parent = tree.parent(node).ok_or(MutationError::ProtectedRoot)?;

        let siblings: Vec<NodeId> = tree
            .element_children(parent)
            .into_iter()
            .filter(|c| !is_editor_internal(tree, *c))
            .collect();
        let index = siblings
            .iter()
            .position(|s| *s == node)
            .ok_or(MutationError::NoSibling(direction))?;
        let neighbor = match direction {
            MoveDirection::Up => index.checked_sub(1).and_then(|i| siblings.get(i)),
            MoveDirection::Down => siblings.get(index + 1),
        }
        .copied()
        .ok_or(MutationError::NoSibling(direction))?;

        tree.swap_siblings(node, neighbor)?;
        Ok(())
    }

    fn apply_duplicate(
        doc: &mut Document,
        ctx: &mut MutationContext,
        root: NodeId,
        selector: &str,
    ) -> Result<(), MutationError> {
        let node = resolve_target(doc.tree(), root, selector)?;
        if node == root {
            return Err(MutationError::ProtectedRoot);
        }

        let mut sheet = doc.stylesheet();
        let copy = doc.tree_mut().deep_clone(node);
        let tree = doc.tree_mut();

        for element in tree.find_all(copy, |t, id| t.is_element(id)) {
            let old_key = match generated_class(tree, element) {
                Some(class) => Some(format!(".{}", class)),
                None => tree.get_attr(element, "id").map(|id| format!("#{}", id)),
            };
            let rule = old_key
                .as_deref()
                .and_then(|key| sheet.rule(key))
                .map(|rule| rule.declarations.clone());

            // Ids must stay unique; the copy never keeps the original's id
            tree.remove_attr(element, "id");

            let fresh = match generated_class(tree, element).map(str::to_string) {
                Some(old) => {
                    let fresh = ctx.ids.next_identity(tree);
                    replace_class(tree, element, &old, &fresh)?;
                    tree.set_attr(element, "id", fresh.clone())?;
                    Some(fresh)
                }
                None if element == copy || rule.is_some() => {
                    Some(assign_identity(tree, ctx.ids, element)?)
                }
                None => None,
            };

            if let (Some(fresh), Some(declarations)) = (fresh, rule) {
                sheet.upsert(&format!(".{}", fresh), declarations);
            }
        }

        tree.insert_after(node, copy)?;
        doc.store_stylesheet(&sheet);
        Ok(())
    }

    fn apply_set_text(
        doc: &mut Document,
        ctx: &mut MutationContext,
        root: NodeId,
        selector: &str,
        content: &str,
    ) -> Result<(), MutationError> {
        let node = resolve_target(doc.tree(), root, selector)?;
        if node == root {
            return Err(MutationError::ProtectedRoot);
        }
        let tag = doc.tree().tag(node).unwrap_or_default().to_string();
        if !is_text_bearing(&tag) {
            return Err(MutationError::NotTextBearing(tag));
        }

        let tree = doc.tree_mut();
        let fresh: Vec<NodeId> = parse_fragment_into(tree, content)
            .into_iter()
            .filter(|n| tree.tag(*n) != Some("script"))
            .collect();
        tree.clear_children(node);
        for child in &fresh {
            strip_active_content(tree, *child);
            sanitize_subtree(tree, *child);
            tree.append(node, *child)?;
        }
        for child in fresh {
            if doc.tree().is_element(child) {
                externalize_subtree(doc, ctx.ids, child)?;
            }
        }
        Ok(())
    }

    fn apply_set_attribute(
        doc: &mut Document,
        root: NodeId,
        selector: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), MutationError> {
        let tree = doc.tree_mut();
        let node = resolve_target(tree, root, selector)?;

        let name = name.trim().to_ascii_lowercase();
        let valid_name = !name.is_empty()
            && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
        if !valid_name {
            return Err(MutationError::InvalidAttributeName(name));
        }
        if is_reserved_attribute(&name) {
            return Err(MutationError::ReservedAttribute(name));
        }

        match value {
            Some(value) => {
                if URL_ATTRIBUTES.contains(&name.as_str()) && is_script_url(value) {
                    return Err(MutationError::UnsafeUrl(name));
                }
                tree.set_attr(node, name, value)?;
            }
            None => {
                tree.remove_attr(node, &name);
            }
        }
        Ok(())
    }
}

/// Resolve a selector to an in-scope, user-visible element
fn resolve_target(tree: &Tree, root: NodeId, selector: &str) -> Result<NodeId, MutationError> {
    let node = selector::resolve_str(tree, selector)
        .ok_or_else(|| MutationError::SelectorNotFound(selector.to_string()))?;
    if !is_in_scope(tree, root, node) {
        return Err(MutationError::OutOfScope(selector.to_string()));
    }
    if is_editor_internal(tree, node) {
        return Err(MutationError::EditorInternal(selector.to_string()));
    }
    Ok(node)
}

/// Parse a snippet into exactly one detached node
fn build_snippet(tree: &mut Tree, snippet: &str) -> Result<NodeId, MutationError> {
    let roots: Vec<NodeId> = parse_fragment_into(tree, snippet)
        .into_iter()
        .filter(|node| match tree.kind(*node) {
            NodeKind::Element { tag, .. } => tag != "script",
            NodeKind::Text(text) => !text.trim().is_empty(),
            _ => false,
        })
        .collect();

    let node = match roots.as_slice() {
        [] => return Err(MutationError::EmptySnippet),
        [single] if tree.is_element(*single) => *single,
        _ => {
            let all_text = roots.iter().all(|n| matches!(tree.kind(*n), NodeKind::Text(_)));
            let wrapper = tree.create_element(if all_text { "p" } else { "div" });
            for child in &roots {
                tree.append(wrapper, *child)?;
            }
            wrapper
        }
    };

    strip_active_content(tree, node);
    sanitize_subtree(tree, node);
    strip_generated_identities(tree, node);
    Ok(node)
}

/// Pasted markup may carry identities of another document or session
fn strip_generated_identities(tree: &mut Tree, root: NodeId) {
    for node in tree.find_all(root, |t, id| t.is_element(id)) {
        tree.retain_classes(node, |c| !is_generated_identity(c));
        if tree.get_attr(node, "id").is_some_and(is_generated_identity) {
            tree.remove_attr(node, "id");
        }
    }
}

fn replace_class(tree: &mut Tree, node: NodeId, old: &str, new: &str) -> Result<(), DomError> {
    let Some(value) = tree.get_attr(node, "class") else {
        return Ok(());
    };
    let updated = value
        .split_ascii_whitespace()
        .map(|c| if c == old { new } else { c })
        .collect::<Vec<_>>()
        .join(" ");
    tree.set_attr(node, "class", updated)
}

fn is_text_bearing(tag: &str) -> bool {
    !is_void(tag)
        && !matches!(
            tag,
            "table" | "thead" | "tbody" | "tfoot" | "tr" | "colgroup" | "select" | "html" | "head"
                | "body" | "style" | "script"
        )
}

fn is_reserved_attribute(name: &str) -> bool {
    matches!(name, "class" | "id" | "style" | "contenteditable")
        || name.starts_with("on")
        || name.starts_with("data-mc-")
}

fn is_script_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with("javascript:") || compact.starts_with("vbscript:")
}

/// Concrete insertion point after position normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Before(NodeId),
    After(NodeId),
    Prepend(NodeId),
    Append(NodeId),
}

impl Placement {
    /// The element that becomes the new node's parent
    fn host(self, tree: &Tree) -> Option<NodeId> {
        match self {
            Placement::Before(node) | Placement::After(node) => tree.parent(node),
            Placement::Prepend(node) | Placement::Append(node) => Some(node),
        }
    }

    fn insert(self, tree: &mut Tree, node: NodeId) -> Result<(), DomError> {
        match self {
            Placement::Before(reference) => tree.insert_before(reference, node),
            Placement::After(reference) => tree.insert_after(reference, node),
            Placement::Prepend(parent) => tree.insert_at(parent, 0, node),
            Placement::Append(parent) => tree.append(parent, node),
        }
    }
}

fn placement(
    tree: &mut Tree,
    root: NodeId,
    target: NodeId,
    position: DropPosition,
    new_tag: Option<&str>,
) -> Placement {
    match position {
        DropPosition::Inside => inside_of(tree, target),
        DropPosition::Before if target == root => Placement::Prepend(placeholder::cell_host(tree, root)),
        DropPosition::After if target == root => Placement::Append(placeholder::cell_host(tree, root)),
        _ if !fits_beside(tree.tag(target).unwrap_or_default(), new_tag) => inside_of(tree, target),
        DropPosition::Before => Placement::Before(target),
        DropPosition::After => Placement::After(target),
    }
}

fn inside_of(tree: &mut Tree, target: NodeId) -> Placement {
    if tree.tag(target).is_some_and(is_void) {
        return Placement::After(target);
    }
    Placement::Append(placeholder::cell_host(tree, target))
}

/// Table parts only accept siblings of their own kind
fn fits_beside(target_tag: &str, new_tag: Option<&str>) -> bool {
    match target_tag {
        "td" | "th" => matches!(new_tag, Some("td" | "th")),
        "tr" => new_tag == Some("tr"),
        "thead" | "tbody" | "tfoot" => matches!(new_tag, Some("thead" | "tbody" | "tfoot")),
        _ => true,
    }
}
