//! # Parsing
//!
//! html5ever builds an `RcDom`, which is then converted into the owned
//! [`Tree`] arena. The conversion drops processing instructions and flattens
//! `<template>` contents into the element's children.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

use crate::tree::{Attributes, NodeId, Tree};

/// Parse a document string. Never fails.
///
/// Input without `<html>` or `<body>` is treated as a body fragment and wrapped
/// in a minimal skeleton first.
pub fn parse(html: &str) -> Tree {
    let dom = if is_bare_fragment(html) {
        debug!(len = html.len(), "Wrapping bare fragment in skeleton");
        parse_rcdom(&wrap_fragment(html))
    } else {
        parse_rcdom(html)
    };

    let mut tree = Tree::new();
    let document = tree.document();
    for child in dom.document.children.borrow().iter() {
        if let Some(id) = convert_node(&mut tree, child) {
            tree.push_child(document, id);
        }
    }
    tree
}

/// Parse a snippet in body context, creating detached nodes inside `tree`
///
/// Whitespace-only text before the first and after the last top-level node is
/// dropped; whitespace between nodes is kept. An empty result means the
/// snippet carried no content.
pub fn parse_fragment_into(tree: &mut Tree, snippet: &str) -> Vec<NodeId> {
    let dom = parse_rcdom(&wrap_fragment(snippet));
    let Some(body) = find_body(&dom.document) else {
        return Vec::new();
    };

    let children = body.children.borrow();
    let is_blank = |node: &Handle| match &node.data {
        NodeData::Text { contents } => contents.borrow().trim().is_empty(),
        _ => false,
    };
    let Some(first) = children.iter().position(|c| !is_blank(c)) else {
        return Vec::new();
    };
    let last = children.iter().rposition(|c| !is_blank(c)).unwrap_or(first);

    children[first..=last]
        .iter()
        .filter_map(|child| convert_node(tree, child))
        .collect()
}

fn parse_rcdom(html: &str) -> RcDom {
    parse_document(RcDom::default(), ParseOpts::default()).one(html)
}

fn is_bare_fragment(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    !lower.contains("<html") && !lower.contains("<body")
}

fn wrap_fragment(fragment: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head></head><body>{}</body></html>",
        fragment
    )
}

fn find_body(document: &Handle) -> Option<Handle> {
    let html = find_child_element(document, "html")?;
    find_child_element(&html, "body")
}

fn find_child_element(parent: &Handle, tag: &str) -> Option<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .find(|child| matches!(&child.data, NodeData::Element { name, .. } if &*name.local == tag))
        .cloned()
}

/// Convert an rcdom Handle (and its subtree) to a detached tree node
fn convert_node(tree: &mut Tree, handle: &Handle) -> Option<NodeId> {
    match &handle.data {
        NodeData::Document => None,
        NodeData::Doctype { name, .. } => Some(tree.create_doctype(name.to_string())),
        NodeData::Text { contents } => Some(tree.create_text(contents.borrow().to_string())),
        NodeData::Comment { contents } => Some(tree.create_comment(contents.to_string())),
        NodeData::ProcessingInstruction { .. } => None,
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let attributes: Attributes = attrs
                .borrow()
                .iter()
                .map(|attr| {
                    let key = match &attr.name.prefix {
                        Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                        None => attr.name.local.to_string(),
                    };
                    (key, attr.value.to_string())
                })
                .collect();

            let id = tree.create_element_with(name.local.to_string(), attributes);

            for child in handle.children.borrow().iter() {
                if let Some(child_id) = convert_node(tree, child) {
                    tree.push_child(id, child_id);
                }
            }

            if let Some(contents) = template_contents.borrow().as_ref() {
                for child in contents.children.borrow().iter() {
                    if let Some(child_id) = convert_node(tree, child) {
                        tree.push_child(id, child_id);
                    }
                }
            }

            Some(id)
        }
    }
}
