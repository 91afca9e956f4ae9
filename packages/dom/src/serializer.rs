//! # Serialization
//!
//! Deterministic HTML output following the fragment serialization algorithm:
//! void elements get no end tag, raw-text elements are written verbatim, and
//! `pre`/`textarea`/`listing` keep a leading newline the parser would eat.

use crate::tree::{NodeId, NodeKind, Tree};

/// Serialize the whole document
pub fn serialize(tree: &Tree) -> String {
    let mut out = String::new();
    for child in tree.children(tree.document()) {
        write_node(tree, *child, &mut out, false);
    }
    out
}

/// Serialize a node including its own tags
pub fn outer_html(tree: &Tree, id: NodeId) -> String {
    let mut out = String::new();
    let raw_parent = tree
        .parent(id)
        .and_then(|p| tree.tag(p))
        .map(is_raw_text)
        .unwrap_or(false);
    write_node(tree, id, &mut out, raw_parent);
    out
}

/// Serialize the children of a node
pub fn inner_html(tree: &Tree, id: NodeId) -> String {
    let mut out = String::new();
    let raw = tree.tag(id).map(is_raw_text).unwrap_or(false);
    for child in tree.children(id) {
        write_node(tree, *child, &mut out, raw);
    }
    out
}

fn write_node(tree: &Tree, id: NodeId, out: &mut String, raw_text_parent: bool) {
    match tree.kind(id) {
        NodeKind::Document => {
            for child in tree.children(id) {
                write_node(tree, *child, out, false);
            }
        }
        NodeKind::Doctype { name } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Text(text) => {
            if raw_text_parent {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeKind::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs.iter() {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attribute(value, out);
                out.push('"');
            }
            out.push('>');

            if is_void(tag) {
                return;
            }

            if matches!(tag.as_str(), "pre" | "textarea" | "listing") {
                if let Some(first) = tree.children(id).first() {
                    if tree.text(*first).is_some_and(|t| t.starts_with('\n')) {
                        out.push('\n');
                    }
                }
            }

            let raw = is_raw_text(tag);
            for child in tree.children(id) {
                write_node(tree, *child, out, raw);
            }

            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Elements serialized without an end tag
pub fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "basefont"
            | "bgsound"
            | "br"
            | "col"
            | "embed"
            | "frame"
            | "hr"
            | "img"
            | "input"
            | "keygen"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_raw_text(tag: &str) -> bool {
    matches!(
        tag,
        "style"
            | "script"
            | "xmp"
            | "iframe"
            | "noembed"
            | "noframes"
            | "noscript"
            | "plaintext"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_serialize_full_document() {
        let tree = parse("<p>Hi</p>");
        assert_eq!(
            serialize(&tree),
            "<!DOCTYPE html><html><head></head><body><p>Hi</p></body></html>"
        );
    }

    #[test]
    fn test_void_elements_have_no_end_tag() {
        let tree = parse(r#"<img src="a.png"><br>"#);
        let body = tree.body().unwrap();
        assert_eq!(inner_html(&tree, body), r#"<img src="a.png"><br>"#);
    }

    #[test]
    fn test_text_and_attributes_are_escaped() {
        let tree = parse(r#"<a title="say &quot;hi&quot; &amp; go">1 &lt; 2 &amp;&nbsp;3</a>"#);
        let body = tree.body().unwrap();
        assert_eq!(
            inner_html(&tree, body),
            r#"<a title="say &quot;hi&quot; &amp; go">1 &lt; 2 &amp;&nbsp;3</a>"#
        );
    }

    #[test]
    fn test_style_content_is_raw() {
        let tree = parse("<html><head><style>a > b { color: red; }</style></head><body></body></html>");
        let head = tree.head().unwrap();
        assert_eq!(
            inner_html(&tree, head),
            "<style>a > b { color: red; }</style>"
        );
    }

    #[test]
    fn test_outer_html_of_element() {
        let tree = parse(r#"<div class="x"><span>a</span>b</div>"#);
        let body = tree.body().unwrap();
        let div = tree.children(body)[0];
        assert_eq!(outer_html(&tree, div), r#"<div class="x"><span>a</span>b</div>"#);
    }

    #[test]
    fn test_pre_leading_newline_survives() {
        let tree = parse("<pre>\n\nline</pre>");
        let html = serialize(&tree);
        let again = serialize(&parse(&html));
        assert_eq!(html, again);
        assert!(html.contains("<pre>\n\nline</pre>"));
    }
}
