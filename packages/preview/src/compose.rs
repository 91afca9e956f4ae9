//! Preview composition
//!
//! Emits a minimal standalone page: the template's stylesheets, the root
//! scope, and optionally an external page behind it and the surface bridge.

use mailcanvas_dom::markers::is_root_scope;
use mailcanvas_dom::{outer_html, parse, selector, NodeId, Tree};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::{ComposeError, Result, Viewport};

/// Script attaching hover, selection, inline editing and drag-and-drop
/// handlers inside the rendered page
pub const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// How to present the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewOptions {
    /// Page loaded behind the template (popup previews)
    pub external_page_url: Option<String>,

    pub viewport: Viewport,

    /// Inject the surface bridge
    pub interactive: bool,

    /// Where the bridge posts surface messages when not framed by the shell
    pub message_endpoint: String,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            external_page_url: None,
            viewport: Viewport::default(),
            interactive: false,
            message_endpoint: "/api/message".to_string(),
        }
    }
}

impl PreviewOptions {
    /// Defaults with the bridge enabled
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            ..Self::default()
        }
    }
}

/// Compose the preview page for `document`
pub fn compose(document: &str, options: &PreviewOptions) -> Result<String> {
    let tree = parse(document);
    let root = single_root(&tree)?;

    let title = tree
        .find_first(tree.document(), |t, id| t.tag(id) == Some("title"))
        .map(|id| outer_html(&tree, id))
        .unwrap_or_default();
    let styles: String = tree
        .find_all(tree.document(), |t, id| {
            is_stylesheet(t, id) && !t.is_inclusive_ancestor(root, id)
        })
        .into_iter()
        .map(|id| outer_html(&tree, id))
        .collect();

    let (width, height) = options.viewport.dimensions();
    let backdrop = options.external_page_url.as_deref().and_then(overlay_url);

    let mut page = String::with_capacity(document.len() + BRIDGE_SCRIPT.len() + 512);
    page.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    page.push_str(&format!(
        "<meta name=\"viewport\" content=\"width={}, initial-scale=1\">",
        width
    ));
    page.push_str(&title);
    page.push_str(&styles);
    page.push_str(&frame_style(width, height, backdrop.is_some()));
    page.push_str("</head><body>");

    let content = outer_html(&tree, root);
    match backdrop {
        Some(url) => {
            page.push_str(&format!(
                "<iframe class=\"mc-ui-backdrop\" src=\"{}\" tabindex=\"-1\"></iframe>",
                escape_attribute(url.as_str())
            ));
            page.push_str("<div class=\"mc-ui-overlay\">");
            page.push_str(&content);
            page.push_str("</div>");
        }
        None => page.push_str(&content),
    }

    if options.interactive {
        page.push_str(&bridge(&tree, root, options));
    }
    page.push_str("</body></html>");
    Ok(page)
}

fn single_root(tree: &Tree) -> Result<NodeId> {
    let roots = tree.find_all(tree.document(), |t, id| is_root_scope(t, id));
    match roots.as_slice() {
        [root] => Ok(*root),
        [] => Err(ComposeError::NoRootScope),
        many => Err(ComposeError::AmbiguousRootScope(many.len())),
    }
}

fn is_stylesheet(tree: &Tree, node: NodeId) -> bool {
    match tree.tag(node) {
        Some("style") => true,
        Some("link") => tree
            .get_attr(node, "rel")
            .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet")),
        _ => false,
    }
}

/// Absolute http(s) URLs only
fn overlay_url(raw: &str) -> Option<Url> {
    match Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            warn!(scheme = url.scheme(), "Ignoring external page with unsupported scheme");
            None
        }
        Err(err) => {
            warn!(url = raw, error = %err, "Ignoring invalid external page URL");
            None
        }
    }
}

fn frame_style(width: u32, height: u32, overlay: bool) -> String {
    let mut css = format!(
        "html{{min-height:{}px}}body{{margin:0 auto;max-width:{}px}}\
         .mc-ui-hover{{outline:1px dashed #3b82f6}}\
         .mc-ui-selected{{outline:2px solid #2563eb}}\
         .mc-ui-drop-target{{box-shadow:inset 0 0 0 2px #22c55e}}\
         .mc-placeholder{{padding:24px;border:2px dashed #cbd5e1;color:#64748b;text-align:center}}",
        height, width
    );
    if overlay {
        css.push_str(
            ".mc-ui-backdrop{position:fixed;inset:0;width:100%;height:100%;border:0;pointer-events:none}\
             .mc-ui-overlay{position:fixed;inset:0;display:flex;align-items:center;justify-content:center;overflow:auto}",
        );
    }
    format!("<style class=\"mc-ui-frame\">{}</style>", css)
}

/// The bridge script with its configuration
///
/// The root path anchors positional selectors computed on the surface to the
/// canonical document, where the root may have siblings the preview omits.
fn bridge(tree: &Tree, root: NodeId, options: &PreviewOptions) -> String {
    let root_path = selector::path(tree, root)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "body".to_string());
    let config = serde_json::json!({
        "rootPath": root_path,
        "endpoint": options.message_endpoint,
    });
    // `</` would end the script element early
    let config = config.to_string().replace("</", "<\\/");
    format!(
        "<script class=\"mc-ui-bridge\">window.__MC_BRIDGE__={};\n{}</script>",
        config, BRIDGE_SCRIPT
    )
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
