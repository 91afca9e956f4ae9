//! # Document Handle
//!
//! A parsed working copy of the canonical document string.
//!
//! The canonical artifact is always a serialized string; a [`Document`] lives
//! only for the duration of one transform:
//!
//! ```text
//! committed string → parse → mutate → serialize → new committed string
//! ```
//!
//! It also knows where the embedded stylesheet lives and how to build the
//! default skeletons.

use std::fmt;
use std::str::FromStr;

use mailcanvas_css::StyleSheet;
use mailcanvas_dom::markers::{is_chrome, is_chrome_class, is_placeholder, STYLESHEET_ID};
use mailcanvas_dom::{parse, serialize, NodeId, NodeKind, Tree};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::EditorError;
use crate::placeholder;

/// Editable working copy
#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self { tree: parse(html) }
    }

    /// Parse and strip anything the rendering surface may have left behind
    pub fn load(html: &str) -> Self {
        let mut doc = Self::parse(html);
        let removed = doc.sanitize();
        if removed > 0 {
            debug!(removed, "Stripped editor chrome from loaded document");
        }
        doc
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn serialize(&self) -> String {
        serialize(&self.tree)
    }

    /// The `<style id="mc-styles">` element, if present
    pub fn stylesheet_node(&self) -> Option<NodeId> {
        self.tree.find_first(self.tree.document(), |t, id| {
            t.tag(id) == Some("style") && t.get_attr(id, "id") == Some(STYLESHEET_ID)
        })
    }

    /// Parsed contents of the embedded stylesheet (empty when missing)
    pub fn stylesheet(&self) -> StyleSheet {
        match self.stylesheet_node() {
            Some(node) => StyleSheet::parse(&self.tree.text_content(node)),
            None => StyleSheet::new(),
        }
    }

    /// Write the stylesheet back, creating the `<style>` element on first use
    pub fn store_stylesheet(&mut self, sheet: &StyleSheet) {
        let css = sheet.to_css();
        let node = match self.stylesheet_node() {
            Some(node) => node,
            None if css.is_empty() => return,
            None => match self.create_stylesheet_node() {
                Some(node) => node,
                None => {
                    warn!("Document has no head or html element; rules not stored");
                    return;
                }
            },
        };

        if self.tree.text_content(node) == css {
            return;
        }
        self.tree.clear_children(node);
        if !css.is_empty() {
            let text = self.tree.create_text(css);
            // style elements always accept text children
            let _ = self.tree.append(node, text);
        }
    }

    fn create_stylesheet_node(&mut self) -> Option<NodeId> {
        let host = self.tree.head().or_else(|| self.tree.html_element())?;
        let style = self.tree.create_element("style");
        self.tree.set_attr(style, "id", STYLESHEET_ID).ok()?;
        self.tree.append(host, style).ok()?;
        Some(style)
    }

    /// Remove editor chrome; returns how many nodes or tokens were dropped
    pub fn sanitize(&mut self) -> usize {
        let document = self.tree.document();
        sanitize_subtree(&mut self.tree, document)
    }
}

/// Strip chrome nodes, `mc-ui-` class tokens and stray `contenteditable`
/// attributes below (and including) `root`
pub(crate) fn sanitize_subtree(tree: &mut Tree, root: NodeId) -> usize {
    let mut removed = 0;
    for node in tree.descendants(root) {
        if !tree.is_element(node) {
            continue;
        }
        if is_chrome(tree, node) {
            tree.detach(node);
            removed += 1;
            continue;
        }
        if tree.classes(node).any(is_chrome_class) {
            tree.retain_classes(node, |c| !is_chrome_class(c));
            removed += 1;
        }
        if !is_placeholder(tree, node) && tree.remove_attr(node, "contenteditable").is_some() {
            removed += 1;
        }
    }
    removed
}

/// Remove `<script>` elements and `on*` handler attributes from untrusted markup
pub(crate) fn strip_active_content(tree: &mut Tree, root: NodeId) {
    for node in tree.descendants(root) {
        if tree.tag(node) == Some("script") {
            tree.detach(node);
            continue;
        }
        let handlers: Vec<String> = match tree.kind(node) {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .filter(|(name, _)| name.to_ascii_lowercase().starts_with("on"))
                .map(|(name, _)| name.to_string())
                .collect(),
            _ => continue,
        };
        for name in handlers {
            tree.remove_attr(node, &name);
        }
    }
}

/// Default starting documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skeleton {
    /// Table layout: the RootScope is a presentation table whose content
    /// cell holds the placeholder
    #[default]
    Email,
    /// A `div` RootScope holding the placeholder
    Popup,
}

const EMAIL_SKELETON: &str = r#"<!DOCTYPE html><html><head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1"><style id="mc-styles"></style></head><body><table class="mc-root" role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0"><tbody><tr><td class="mc-content" align="center"></td></tr></tbody></table></body></html>"#;

const POPUP_SKELETON: &str = r#"<!DOCTYPE html><html><head><meta charset="utf-8"><style id="mc-styles"></style></head><body><div class="mc-root"></div></body></html>"#;

impl Skeleton {
    /// Serialized skeleton with a placeholder carrying `placeholder_text`
    pub fn build(self, placeholder_text: &str) -> String {
        let (source, host_class) = match self {
            Skeleton::Email => (EMAIL_SKELETON, "mc-content"),
            Skeleton::Popup => (POPUP_SKELETON, "mc-root"),
        };
        let mut doc = Document::parse(source);
        let tree = doc.tree_mut();
        if let Some(host) = tree.find_first(tree.document(), |t, id| t.has_class(id, host_class)) {
            let marker = placeholder::create(tree, placeholder_text);
            let _ = tree.append(host, marker);
        }
        doc.serialize()
    }
}

impl fmt::Display for Skeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skeleton::Email => f.write_str("email"),
            Skeleton::Popup => f.write_str("popup"),
        }
    }
}

impl FromStr for Skeleton {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Skeleton::Email),
            "popup" => Ok(Skeleton::Popup),
            other => Err(EditorError::UnknownSkeleton(other.to_string())),
        }
    }
}
