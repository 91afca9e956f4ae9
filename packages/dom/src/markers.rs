//! Reserved marker identifiers.
//!
//! Persisted documents must keep these verbatim: they are how the editor
//! finds the editable region, its own generated identities, the drop-zone
//! placeholders and the embedded stylesheet after a round trip through storage.

use crate::tree::{NodeId, Tree};

/// Class carried by the single editable root
pub const ROOT_SCOPE_CLASS: &str = "mc-root";

/// Prefix of generated identities (`mc-el-<seed>-<n>`)
pub const GENERATED_PREFIX: &str = "mc-el-";

/// Class carried by drop-zone placeholders
pub const PLACEHOLDER_CLASS: &str = "mc-placeholder";

/// Attribute marking a node as inert (placeholders)
pub const INERT_ATTR: &str = "data-mc-inert";

/// Id of the embedded `<style>` element holding generated rules
pub const STYLESHEET_ID: &str = "mc-styles";

/// Class of the default content cell used as the fallback insertion point
pub const CONTENT_CELL_CLASS: &str = "mc-content";

/// Class prefix of editor chrome (selection highlights, drop indicators, toolbars)
pub const CHROME_PREFIX: &str = "mc-ui-";

pub fn is_root_scope(tree: &Tree, id: NodeId) -> bool {
    tree.has_class(id, ROOT_SCOPE_CLASS)
}

pub fn is_placeholder(tree: &Tree, id: NodeId) -> bool {
    tree.has_class(id, PLACEHOLDER_CLASS)
}

/// Chrome elements are whole nodes injected by the rendering surface
pub fn is_chrome(tree: &Tree, id: NodeId) -> bool {
    tree.classes(id).any(|c| c.starts_with(CHROME_PREFIX) && is_chrome_node_class(c))
}

/// Chrome state classes (`mc-ui-selected`, `mc-ui-hover`) decorate real content;
/// only the node-level ones mark an element as chrome.
fn is_chrome_node_class(class: &str) -> bool {
    !matches!(
        class,
        "mc-ui-selected" | "mc-ui-hover" | "mc-ui-editing" | "mc-ui-drop-target"
    )
}

pub fn is_chrome_class(class: &str) -> bool {
    class.starts_with(CHROME_PREFIX)
}

/// Nodes that never take part in selectors or sibling counts
pub fn is_editor_internal(tree: &Tree, id: NodeId) -> bool {
    is_placeholder(tree, id) || is_chrome(tree, id)
}

pub fn is_generated_identity(value: &str) -> bool {
    value.starts_with(GENERATED_PREFIX)
}

/// The generated class token of an element, if any
pub fn generated_class(tree: &Tree, id: NodeId) -> Option<&str> {
    tree.classes(id).find(|c| is_generated_identity(c))
}

/// Ids the editor owns and never offers as user-authored anchors
pub fn is_editor_owned_id(value: &str) -> bool {
    value.starts_with("mc-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_marker_predicates() {
        let tree = parse(
            r#"<div class="mc-root"><div class="mc-placeholder">Drop</div><p class="x mc-el-a-1 mc-ui-selected">Hi</p><div class="mc-ui-toolbar"></div></div>"#,
        );
        let body = tree.body().unwrap();
        let root = tree.children(body)[0];
        let children = tree.element_children(root);

        assert!(is_root_scope(&tree, root));
        assert!(is_placeholder(&tree, children[0]));
        assert!(!is_chrome(&tree, children[1]));
        assert_eq!(generated_class(&tree, children[1]), Some("mc-el-a-1"));
        assert!(is_chrome(&tree, children[2]));
        assert!(is_editor_internal(&tree, children[2]));
    }

    #[test]
    fn test_editor_owned_ids() {
        assert!(is_editor_owned_id("mc-styles"));
        assert!(is_editor_owned_id("mc-el-1-2"));
        assert!(!is_editor_owned_id("hero"));
    }
}
