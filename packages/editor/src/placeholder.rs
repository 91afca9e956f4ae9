//! Placeholder lifecycle
//!
//! A container shows exactly one inert placeholder when it has no other
//! content, and none otherwise. Placeholders are removed before content is
//! injected next to them, reinserted when a removal empties a container, and
//! reconciled once more by [`normalize`] after every committed mutation.

use mailcanvas_dom::markers::{
    is_chrome, is_placeholder, is_root_scope, CONTENT_CELL_CLASS, INERT_ATTR, PLACEHOLDER_CLASS,
};
use mailcanvas_dom::{Attributes, NodeId, NodeKind, Tree};
use tracing::debug;

/// Tags that accept dropped content and may host a placeholder
pub const CONTAINER_TAGS: &[&str] = &[
    "div", "td", "th", "section", "article", "aside", "header", "footer", "main", "nav",
    "blockquote", "center", "figure", "form", "li",
];

/// Table parts that can only host content through a cell
pub(crate) const TABLE_PARTS: &[&str] = &["table", "thead", "tbody", "tfoot", "tr"];

/// New detached placeholder element
pub fn create(tree: &mut Tree, text: &str) -> NodeId {
    let attrs: Attributes = [
        ("class".to_string(), PLACEHOLDER_CLASS.to_string()),
        ("contenteditable".to_string(), "false".to_string()),
        (INERT_ATTR.to_string(), "true".to_string()),
    ]
    .into_iter()
    .collect();
    let node = tree.create_element_with("div", attrs);
    let label = tree.create_text(text);
    // a fresh div always accepts a text child
    let _ = tree.append(node, label);
    node
}

/// RootScope, or an element whose tag is a container
pub fn is_container(tree: &Tree, node: NodeId) -> bool {
    is_root_scope(tree, node)
        || tree
            .tag(node)
            .is_some_and(|tag| CONTAINER_TAGS.contains(&tag) || TABLE_PARTS.contains(&tag))
}

/// True if `node` has a child other than placeholders, chrome, comments and
/// whitespace-only text
pub fn has_content(tree: &Tree, node: NodeId) -> bool {
    tree.children(node).iter().any(|child| match tree.kind(*child) {
        NodeKind::Text(text) => !text.trim().is_empty(),
        NodeKind::Element { .. } => !is_placeholder(tree, *child) && !is_chrome(tree, *child),
        _ => false,
    })
}

pub fn placeholders_in(tree: &Tree, container: NodeId) -> Vec<NodeId> {
    tree.children(container)
        .iter()
        .copied()
        .filter(|c| is_placeholder(tree, *c))
        .collect()
}

/// Drop any placeholder children; returns how many were removed
pub fn clear(tree: &mut Tree, container: NodeId) -> usize {
    let found = placeholders_in(tree, container);
    for node in &found {
        tree.detach(*node);
    }
    found.len()
}

/// Give an empty container its placeholder. Table parts get the row and cell
/// needed to hold it.
pub fn ensure(tree: &mut Tree, container: NodeId, text: &str) -> bool {
    if has_content(tree, container) || !placeholders_in(tree, container).is_empty() {
        return false;
    }
    let host = cell_host(tree, container);
    let marker = create(tree, text);
    if tree.append(host, marker).is_err() {
        return false;
    }
    debug!(container = container.index(), "Inserted placeholder");
    true
}

/// The cell that receives content for `node`: the last cell of a table part,
/// created when the part has none. Other nodes host content themselves.
pub fn cell_host(tree: &mut Tree, node: NodeId) -> NodeId {
    let Some(tag) = tree.tag(node).map(str::to_string) else {
        return node;
    };
    if !TABLE_PARTS.contains(&tag.as_str()) {
        return node;
    }
    if let Some(cell) = tree
        .find_all(node, |t, id| matches!(t.tag(id), Some("td" | "th")))
        .pop()
    {
        return cell;
    }

    let mut parent = node;
    let chain: &[&str] = match tag.as_str() {
        "table" => &["tbody", "tr", "td"],
        "tr" => &["td"],
        _ => &["tr", "td"],
    };
    for part in chain {
        let child = tree.create_element(*part);
        if tree.append(parent, child).is_err() {
            return node;
        }
        parent = child;
    }
    parent
}

/// Reconcile placeholders under `root`
///
/// - placeholders next to real content are removed
/// - duplicates collapse to one
/// - the root and content cells that ended up empty receive one
///
/// Returns whether anything changed.
pub fn normalize(tree: &mut Tree, root: NodeId, text: &str) -> bool {
    let mut changed = false;

    let containers: Vec<NodeId> = tree
        .descendants(root)
        .into_iter()
        .filter(|id| tree.is_element(*id) && !is_placeholder(tree, *id))
        .collect();

    for container in containers {
        let found = placeholders_in(tree, container);
        if found.is_empty() {
            continue;
        }
        if has_content(tree, container) {
            for node in found {
                tree.detach(node);
            }
            changed = true;
        } else if found.len() > 1 {
            for node in &found[1..] {
                tree.detach(*node);
            }
            changed = true;
        }
    }

    let anchors: Vec<NodeId> = std::iter::once(root)
        .chain(tree.find_all(root, |t, id| t.has_class(id, CONTENT_CELL_CLASS)))
        .collect();
    for anchor in anchors {
        if !has_content(tree, anchor) {
            changed |= ensure(tree, anchor, text);
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailcanvas_dom::{inner_html, parse};

    fn root_of(tree: &Tree) -> NodeId {
        tree.find_first(tree.document(), |t, id| is_root_scope(t, id))
            .unwrap()
    }

    #[test]
    fn test_create_is_inert() {
        let mut tree = Tree::new();
        let node = create(&mut tree, "Drop here");
        assert_eq!(tree.get_attr(node, "contenteditable"), Some("false"));
        assert_eq!(tree.get_attr(node, INERT_ATTR), Some("true"));
        assert!(is_placeholder(&tree, node));
    }

    #[test]
    fn test_has_content_ignores_markers() {
        let tree = parse(
            r#"<div class="mc-root">  <div class="mc-placeholder">x</div><!-- c --><div class="mc-ui-frame"></div></div>"#,
        );
        assert!(!has_content(&tree, root_of(&tree)));
    }

    #[test]
    fn test_normalize_removes_stray_and_duplicates() {
        let mut tree = parse(
            r#"<div class="mc-root"><p>a</p><div class="mc-placeholder">x</div><div><div class="mc-placeholder">1</div><div class="mc-placeholder">2</div></div></div>"#,
        );
        let root = root_of(&tree);
        assert!(normalize(&mut tree, root, "Drop"));
        assert_eq!(
            inner_html(&tree, root),
            r#"<p>a</p><div><div class="mc-placeholder">1</div></div>"#
        );
        assert!(!normalize(&mut tree, root, "Drop"));
    }

    #[test]
    fn test_normalize_fills_empty_root() {
        let mut tree = parse(r#"<div class="mc-root"></div>"#);
        let root = root_of(&tree);
        assert!(normalize(&mut tree, root, "Drop"));
        assert_eq!(placeholders_in(&tree, root).len(), 1);
    }

    #[test]
    fn test_empty_table_root_gets_cell() {
        let mut tree = parse(r#"<table class="mc-root"></table>"#);
        let root = root_of(&tree);
        assert!(normalize(&mut tree, root, "Drop"));
        let cell = tree.find_first(root, |t, id| t.tag(id) == Some("td")).unwrap();
        assert_eq!(placeholders_in(&tree, cell).len(), 1);
    }

    #[test]
    fn test_plain_empty_div_is_left_alone() {
        let mut tree = parse(r#"<div class="mc-root"><p>a</p><div class="spacer"></div></div>"#);
        let root = root_of(&tree);
        assert!(!normalize(&mut tree, root, "Drop"));
    }
}
