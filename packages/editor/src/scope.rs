//! Root-scope guard
//!
//! Structural edits are confined to the subtree of the single element carrying
//! the `mc-root` class. Everything else in the document (head, wrapper tables,
//! tracking pixels) is foreign and read-only.

use mailcanvas_dom::markers::{is_root_scope, CONTENT_CELL_CLASS};
use mailcanvas_dom::{NodeId, Tree};
use tracing::warn;

/// The unique RootScope; `None` when missing or ambiguous
pub fn root_scope(tree: &Tree) -> Option<NodeId> {
    let roots = tree.find_all(tree.document(), |t, id| t.is_element(id) && is_root_scope(t, id));
    match roots.as_slice() {
        [root] => Some(*root),
        [] => None,
        many => {
            warn!(count = many.len(), "Multiple root scopes; treating document as unscoped");
            None
        }
    }
}

/// True iff `node` is the root or lies inside it
pub fn is_in_scope(tree: &Tree, root: NodeId, node: NodeId) -> bool {
    tree.is_inclusive_ancestor(root, node)
}

/// Where content goes when no usable target is given: the first content cell,
/// else the first table cell, else the root itself
pub fn default_insertion_point(tree: &Tree, root: NodeId) -> NodeId {
    tree.find_first(root, |t, id| t.has_class(id, CONTENT_CELL_CLASS))
        .or_else(|| tree.find_first(root, |t, id| matches!(t.tag(id), Some("td" | "th"))))
        .unwrap_or(root)
}
