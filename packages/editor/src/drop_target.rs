//! Drop-target resolution
//!
//! Turns the raw element under the pointer into an insertion target and a
//! position. Two modes:
//!
//! - **geometry**: `f = offsetY / height`; `f < 0.25` → before, `f > 0.75` →
//!   after, otherwise inside
//! - **tag heuristic**: containers and table parts → inside, leaves → after
//!
//! Both first walk up to the nearest droppable element below the root scope.
//! Drops with no target, or with no droppable element between the target and
//! the root, go inside the default insertion point.

use mailcanvas_dom::markers::{is_chrome, is_placeholder};
use mailcanvas_dom::{NodeId, Tree};
use mailcanvas_protocol::{DropPosition, DropProbe};

use crate::placeholder::{CONTAINER_TAGS, TABLE_PARTS};
use crate::scope::{default_insertion_point, is_in_scope};

const BEFORE_THRESHOLD: f64 = 0.25;
const AFTER_THRESHOLD: f64 = 0.75;

/// Tags content can be dropped next to, but not into
pub const LEAF_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "img", "a", "hr", "ul", "ol", "button", "pre",
    "picture", "video",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub node: NodeId,
    pub position: DropPosition,
}

pub fn position_from_geometry(probe: DropProbe) -> DropPosition {
    if probe.height <= 0.0 || !probe.height.is_finite() || !probe.offset_y.is_finite() {
        return DropPosition::Inside;
    }
    let fraction = probe.offset_y / probe.height;
    if fraction < BEFORE_THRESHOLD {
        DropPosition::Before
    } else if fraction > AFTER_THRESHOLD {
        DropPosition::After
    } else {
        DropPosition::Inside
    }
}

pub fn position_from_tag(tag: &str) -> DropPosition {
    if is_container_tag(tag) {
        DropPosition::Inside
    } else {
        DropPosition::After
    }
}

/// Table parts count as containers; content dropped in them lands in a cell
fn is_container_tag(tag: &str) -> bool {
    CONTAINER_TAGS.contains(&tag) || TABLE_PARTS.contains(&tag)
}

pub fn is_droppable(tree: &Tree, node: NodeId) -> bool {
    tree.tag(node)
        .is_some_and(|tag| is_container_tag(tag) || LEAF_TAGS.contains(&tag))
        && !is_chrome(tree, node)
}

/// Resolve where a drop lands
///
/// `raw` is the element the surface reported (already resolved from its
/// selector); an explicit `position` beats the `probe`, which beats the tag
/// heuristic. Without a raw element, or when nothing between it and the root
/// is droppable, the drop goes inside the default insertion point. A placeholder under the pointer fills its container. A raw element
/// outside the root scope rejects the drop.
pub fn resolve(
    tree: &Tree,
    root: NodeId,
    raw: Option<NodeId>,
    position: Option<DropPosition>,
    probe: Option<DropProbe>,
) -> Option<DropTarget> {
    let fallback = DropTarget {
        node: default_insertion_point(tree, root),
        position: DropPosition::Inside,
    };
    let Some(raw) = raw else {
        return Some(fallback);
    };
    if !is_in_scope(tree, root, raw) {
        return None;
    }

    if is_placeholder(tree, raw) {
        let container = tree.parent(raw).filter(|p| is_in_scope(tree, root, *p))?;
        return Some(DropTarget {
            node: container,
            position: DropPosition::Inside,
        });
    }

    let node = if raw == root {
        root
    } else {
        let droppable = std::iter::once(raw)
            .chain(tree.ancestors(raw))
            .take_while(|node| *node != root)
            .find(|node| is_droppable(tree, *node));
        match droppable {
            Some(node) => node,
            None => return Some(fallback),
        }
    };

    let position = position
        .or_else(|| probe.map(position_from_geometry))
        .unwrap_or_else(|| position_from_tag(tree.tag(node).unwrap_or_default()));
    Some(DropTarget { node, position })
}
