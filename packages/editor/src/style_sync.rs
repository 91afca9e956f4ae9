//! # Style Synchronizer
//!
//! Inline `style` attributes are transient. Anything that should persist is
//! moved into the embedded stylesheet under a rule keyed by the element's
//! generated class:
//!
//! ```text
//! <div style="padding:8px">          <div class="mc-el-3f2a-1" id="mc-el-3f2a-1">
//!                              →     .mc-el-3f2a-1 { padding: 8px; }
//! ```

use mailcanvas_css::{collapse_box_shorthands, expand_box_shorthands, DeclarationList};
use mailcanvas_dom::markers::generated_class;
use mailcanvas_dom::{DomError, IdGenerator, NodeId, Tree};
use tracing::debug;

use crate::document::Document;

/// Give `node` a generated identity (class token, plus `id` when it has none)
/// unless it already carries one. Returns the generated class.
pub fn ensure_identity(
    tree: &mut Tree,
    ids: &mut IdGenerator,
    node: NodeId,
) -> Result<String, DomError> {
    if let Some(existing) = generated_class(tree, node) {
        return Ok(existing.to_string());
    }
    assign_identity(tree, ids, node)
}

/// Unconditionally assign a fresh identity
pub fn assign_identity(
    tree: &mut Tree,
    ids: &mut IdGenerator,
    node: NodeId,
) -> Result<String, DomError> {
    let identity = ids.next_identity(tree);
    tree.add_class(node, &identity)?;
    if tree.get_attr(node, "id").is_none() {
        tree.set_attr(node, "id", identity.clone())?;
    }
    Ok(identity)
}

/// Selector of the rule that styles `node`: `.generated` or `#id`
pub fn rule_key(doc: &Document, node: NodeId) -> Option<String> {
    let tree = doc.tree();
    if let Some(class) = generated_class(tree, node) {
        return Some(format!(".{}", class));
    }
    tree.get_attr(node, "id").map(|id| format!("#{}", id))
}

/// Move inline declarations of `node` into its stylesheet rule
///
/// Existing declarations of the rule are kept; inline ones win.
pub fn externalize(doc: &mut Document, ids: &mut IdGenerator, node: NodeId) -> Result<bool, DomError> {
    let Some(inline) = doc.tree().get_attr(node, "style").map(DeclarationList::parse) else {
        return Ok(false);
    };
    doc.tree_mut().remove_attr(node, "style");
    if inline.is_empty() {
        return Ok(true);
    }

    let class = ensure_identity(doc.tree_mut(), ids, node)?;
    let key = format!(".{}", class);
    let mut sheet = doc.stylesheet();
    let mut merged = sheet.rule(&key).map(|r| r.declarations.clone()).unwrap_or_default();
    for decl in inline.iter() {
        merged.push(decl.clone());
    }
    debug!(selector = %key, declarations = merged.len(), "Externalized inline style");
    sheet.upsert(&key, merged);
    doc.store_stylesheet(&sheet);
    Ok(true)
}

/// Externalize `root` and every styled element below it
pub fn externalize_subtree(
    doc: &mut Document,
    ids: &mut IdGenerator,
    root: NodeId,
) -> Result<usize, DomError> {
    let styled: Vec<NodeId> = doc
        .tree()
        .find_all(root, |t, id| t.get_attr(id, "style").is_some());
    let mut count = 0;
    for node in styled {
        if externalize(doc, ids, node)? {
            count += 1;
        }
    }
    Ok(count)
}

/// Declarations of the node's rule, as stored
pub fn read_rule(doc: &Document, node: NodeId) -> DeclarationList {
    let Some(key) = rule_key(doc, node) else {
        return DeclarationList::new();
    };
    doc.stylesheet()
        .rule(&key)
        .map(|rule| rule.declarations.clone())
        .unwrap_or_default()
}

/// Declarations of the node's rule with box shorthands expanded per side
pub fn read_rule_for_editing(doc: &Document, node: NodeId) -> DeclarationList {
    expand_box_shorthands(&read_rule(doc, node))
}

/// Replace (or append) the node's rule. An empty list removes the rule.
///
/// Complete sets of side longhands are collapsed back to shorthands. A node
/// with neither a generated class nor an existing `#id` rule gets an identity.
pub fn write_rule(
    doc: &mut Document,
    ids: &mut IdGenerator,
    node: NodeId,
    declarations: &DeclarationList,
) -> Result<(), DomError> {
    let mut sheet = doc.stylesheet();
    let key = match rule_key(doc, node) {
        Some(key) if key.starts_with('.') || sheet.contains(&key) => key,
        _ if declarations.is_empty() => return Ok(()),
        _ => format!(".{}", ensure_identity(doc.tree_mut(), ids, node)?),
    };

    if declarations.is_empty() {
        sheet.remove(&key);
    } else {
        sheet.upsert(&key, collapse_box_shorthands(declarations));
    }
    debug!(selector = %key, "Wrote rule");
    doc.store_stylesheet(&sheet);
    Ok(())
}

/// Rule keys of every element in the subtree of `root`
pub fn rule_keys_in(tree: &Tree, root: NodeId) -> Vec<String> {
    let mut keys = Vec::new();
    for node in tree.find_all(root, |t, id| t.is_element(id)) {
        if let Some(class) = generated_class(tree, node) {
            keys.push(format!(".{}", class));
        }
        if let Some(id) = tree.get_attr(node, "id") {
            keys.push(format!("#{}", id));
        }
    }
    keys
}

/// Remove every rule keyed by one of `keys`; returns how many were removed
pub fn remove_rules_for(doc: &mut Document, keys: &[String]) -> usize {
    let mut sheet = doc.stylesheet();
    let removed = keys.iter().filter(|key| sheet.remove(key)).count();
    if removed > 0 {
        debug!(removed, "Removed rules of deleted nodes");
        doc.store_stylesheet(&sheet);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(doc: &Document, tag: &str) -> NodeId {
        doc.tree()
            .find_first(doc.tree().document(), |t, id| t.tag(id) == Some(tag))
            .unwrap()
    }

    #[test]
    fn test_externalize_roundtrip() {
        let mut doc = Document::parse(r#"<div class="mc-root"><p style="color: red; padding: 4px;">x</p></div>"#);
        let mut ids = IdGenerator::from_seed("t".to_string());
        let p = first(&doc, "p");

        assert!(externalize(&mut doc, &mut ids, p).unwrap());
        assert_eq!(doc.tree().get_attr(p, "style"), None);
        assert_eq!(doc.tree().get_attr(p, "class"), Some("mc-el-t-1"));
        assert_eq!(doc.tree().get_attr(p, "id"), Some("mc-el-t-1"));

        let rule = read_rule(&doc, p);
        assert_eq!(rule.to_pairs(), vec![
            ("color".to_string(), "red".to_string()),
            ("padding".to_string(), "4px".to_string()),
        ]);
    }

    #[test]
    fn test_externalize_keeps_user_id() {
        let mut doc = Document::parse(r#"<h1 id="title" style="margin:0">x</h1>"#);
        let mut ids = IdGenerator::from_seed("t".to_string());
        let h1 = first(&doc, "h1");
        externalize(&mut doc, &mut ids, h1).unwrap();
        assert_eq!(doc.tree().get_attr(h1, "id"), Some("title"));
        assert!(doc.tree().has_class(h1, "mc-el-t-1"));
    }

    #[test]
    fn test_write_rule_replaces_in_place() {
        let mut doc = Document::parse(
            r#"<html><head><style id="mc-styles">.mc-el-t-1 { color: red; }
.other { margin: 0; }</style></head><body><p class="mc-el-t-1">x</p></body></html>"#,
        );
        let mut ids = IdGenerator::from_seed("t".to_string());
        let p = first(&doc, "p");

        write_rule(&mut doc, &mut ids, p, &DeclarationList::parse("color: blue")).unwrap();
        let sheet = doc.stylesheet();
        assert_eq!(sheet.rule_count(), 2);
        assert_eq!(sheet.to_css(), ".mc-el-t-1 { color: blue; }\n.other { margin: 0; }");
    }

    #[test]
    fn test_write_rule_collapses_sides_and_reads_expanded() {
        let mut doc = Document::parse("<p>x</p>");
        let mut ids = IdGenerator::from_seed("t".to_string());
        let p = first(&doc, "p");

        let form = DeclarationList::parse(
            "padding-top: 4px; padding-right: 8px; padding-bottom: 4px; padding-left: 8px",
        );
        write_rule(&mut doc, &mut ids, p, &form).unwrap();
        assert_eq!(read_rule(&doc, p).to_css(), "padding: 4px 8px;");
        assert_eq!(read_rule_for_editing(&doc, p), form);
    }

    #[test]
    fn test_write_empty_removes_rule() {
        let mut doc = Document::parse("<p style=\"color: red\">x</p>");
        let mut ids = IdGenerator::from_seed("t".to_string());
        let p = first(&doc, "p");
        externalize(&mut doc, &mut ids, p).unwrap();

        write_rule(&mut doc, &mut ids, p, &DeclarationList::new()).unwrap();
        assert!(doc.stylesheet().is_empty());
        assert!(read_rule(&doc, p).is_empty());
    }

    #[test]
    fn test_remove_rules_for_subtree() {
        let mut doc = Document::parse(
            r#"<div style="margin: 0"><p style="color: red">x</p></div><span style="color: blue">y</span>"#,
        );
        let mut ids = IdGenerator::from_seed("t".to_string());
        let body = doc.tree().body().unwrap();
        externalize_subtree(&mut doc, &mut ids, body).unwrap();
        assert_eq!(doc.stylesheet().rule_count(), 3);

        let div = first(&doc, "div");
        let keys = rule_keys_in(doc.tree(), div);
        assert_eq!(remove_rules_for(&mut doc, &keys), 2);
        let sheet = doc.stylesheet();
        assert_eq!(sheet.rule_count(), 1);
        assert!(sheet.rule(&format!(".{}", generated_class(doc.tree(), first(&doc, "span")).unwrap())).is_some());
    }
}
