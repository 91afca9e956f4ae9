//! # Node Tree
//!
//! Owned arena representation of a parsed document.
//!
//! Nodes are addressed by [`NodeId`] indices into a single vector. Detached
//! nodes stay in the arena until the tree is dropped; only nodes reachable from
//! [`Tree::document`] are serialized.

use crate::error::DomError;

/// Index of a node inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Ordered attribute list with unique keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    /// Set a value, keeping the original position when the key exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Doctype { name: String },
    Element { tag: String, attrs: Attributes },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable document tree
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.create_element_with(tag, Attributes::new())
    }

    pub fn create_element_with(&mut self, tag: impl Into<String>, attrs: Attributes) -> NodeId {
        self.create(NodeKind::Element {
            tag: tag.into().to_ascii_lowercase(),
            attrs,
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.create(NodeKind::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.create(NodeKind::Doctype { name: name.into() })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        match self.kind(id) {
            NodeKind::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn attrs_mut(&mut self, id: NodeId) -> Option<&mut Attributes> {
        match self.kind_mut(id) {
            NodeKind::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn get_attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id).and_then(|attrs| attrs.get(name))
    }

    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let attrs = self.attrs_mut(id).ok_or(DomError::NotAnElement)?;
        attrs.set(name, value);
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.attrs_mut(id).and_then(|attrs| attrs.remove(name))
    }

    /// Whitespace-separated class tokens
    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.get_attr(id, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|c| c == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        if self.has_class(id, class) {
            return Ok(());
        }
        let value = match self.get_attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class)
            }
            _ => class.to_string(),
        };
        self.set_attr(id, "class", value)
    }

    /// Keep only the class tokens accepted by `keep`; drops an empty attribute
    pub fn retain_classes(&mut self, id: NodeId, mut keep: impl FnMut(&str) -> bool) {
        let Some(existing) = self.get_attr(id, "class") else {
            return;
        };
        let value = existing
            .split_ascii_whitespace()
            .filter(|c| keep(c))
            .collect::<Vec<_>>()
            .join(" ");
        let changed = value != existing;
        if value.is_empty() {
            self.remove_attr(id, "class");
        } else if changed {
            // set_attr only fails for non-elements, which have no class attribute
            let _ = self.set_attr(id, "class", value);
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Concatenated descendant text
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let NodeKind::Text(text) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Ancestors from the parent up to the document
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// True if `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// True if the node is reachable from the document
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_inclusive_ancestor(self.document(), id)
    }

    /// Pre-order traversal including `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            for child in self.children(node).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn find_first(
        &self,
        root: NodeId,
        pred: impl Fn(&Tree, NodeId) -> bool,
    ) -> Option<NodeId> {
        self.descendants(root).into_iter().find(|id| pred(self, *id))
    }

    pub fn find_all(&self, root: NodeId, pred: impl Fn(&Tree, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| pred(self, *id))
            .collect()
    }

    /// The `<html>` element
    pub fn html_element(&self) -> Option<NodeId> {
        self.children(self.document())
            .iter()
            .copied()
            .find(|c| self.tag(*c) == Some("html"))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.child_by_tag(self.html_element()?, "head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_by_tag(self.html_element()?, "body")
    }

    fn child_by_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.tag(*c) == Some(tag))
    }

    /// True if any attached element uses `value` as its id or as a class token
    pub fn identity_in_use(&self, value: &str) -> bool {
        self.descendants(self.document()).into_iter().any(|id| {
            self.get_attr(id, "id") == Some(value) || self.has_class(id, value)
        })
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if matches!(
            self.kind(parent),
            NodeKind::Text(_) | NodeKind::Comment(_) | NodeKind::Doctype { .. }
        ) {
            return Err(DomError::HierarchyRequest(
                "parent cannot have children".to_string(),
            ));
        }
        if child == self.document() {
            return Err(DomError::HierarchyRequest(
                "document cannot be inserted".to_string(),
            ));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest(
                "insertion would create a cycle".to_string(),
            ));
        }
        Ok(())
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Insert `child` at `index` among the children of `parent`
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) -> Result<(), DomError> {
        if reference == child {
            return Ok(());
        }
        let parent = self
            .parent(reference)
            .ok_or_else(|| DomError::HierarchyRequest("reference has no parent".to_string()))?;
        self.check_insertable(parent, child)?;
        self.detach(child);
        let index = self.index_in_parent(reference).unwrap_or(0);
        self.insert_at(parent, index, child)
    }

    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> Result<(), DomError> {
        if reference == child {
            return Ok(());
        }
        let parent = self
            .parent(reference)
            .ok_or_else(|| DomError::HierarchyRequest("reference has no parent".to_string()))?;
        self.check_insertable(parent, child)?;
        self.detach(child);
        let index = self.index_in_parent(reference).map(|i| i + 1).unwrap_or(0);
        self.insert_at(parent, index, child)
    }

    /// Put `replacement` where `old` was; `old` becomes detached
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) -> Result<(), DomError> {
        if old == replacement {
            return Ok(());
        }
        self.insert_before(old, replacement)?;
        self.detach(old);
        Ok(())
    }

    /// Remove a node from its parent. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Swap two nodes sharing a parent
    pub fn swap_siblings(&mut self, a: NodeId, b: NodeId) -> Result<(), DomError> {
        let parent = self
            .parent(a)
            .ok_or_else(|| DomError::HierarchyRequest("node has no parent".to_string()))?;
        if self.parent(b) != Some(parent) {
            return Err(DomError::HierarchyRequest(
                "nodes are not siblings".to_string(),
            ));
        }
        let children = &mut self.nodes[parent.0].children;
        let ia = children.iter().position(|c| *c == a);
        let ib = children.iter().position(|c| *c == b);
        if let (Some(ia), Some(ib)) = (ia, ib) {
            children.swap(ia, ib);
        }
        Ok(())
    }

    /// Remove every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Deep copy of a subtree; the copy is detached
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let kind = self.kind(id).clone();
        let copy = self.create(kind);
        let children = self.children(id).to_vec();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Attach a freshly created node without hierarchy checks (parser use)
    pub(crate) fn push_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }
}

/// Iterator over the ancestors of a node
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let div = tree.create_element("DIV");
        let a = tree.create_element("p");
        let b = tree.create_element("span");
        let doc = tree.document();
        tree.append(doc, div).unwrap();
        tree.append(div, a).unwrap();
        tree.append(div, b).unwrap();
        (tree, div, a, b)
    }

    #[test]
    fn test_tag_names_are_lowercased() {
        let (tree, div, _, _) = sample();
        assert_eq!(tree.tag(div), Some("div"));
    }

    #[test]
    fn test_attributes_keep_order_and_unique_keys() {
        let mut attrs = Attributes::new();
        attrs.set("href", "a");
        attrs.set("target", "_blank");
        attrs.set("href", "b");
        let collected: Vec<_> = attrs.iter().collect();
        assert_eq!(collected, vec![("href", "b"), ("target", "_blank")]);
        assert_eq!(attrs.remove("href"), Some("b".to_string()));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let (mut tree, div, a, _) = sample();
        let result = tree.append(a, div);
        assert!(matches!(result, Err(DomError::HierarchyRequest(_))));
        assert_eq!(tree.parent(a), Some(div));
    }

    #[test]
    fn test_insert_before_and_after() {
        let (mut tree, div, a, b) = sample();
        let c = tree.create_element("em");
        tree.insert_before(b, c).unwrap();
        assert_eq!(tree.children(div), &[a, c, b]);
        tree.insert_after(b, c).unwrap();
        assert_eq!(tree.children(div), &[a, b, c]);
    }

    #[test]
    fn test_detach_keeps_subtree() {
        let (mut tree, div, a, _) = sample();
        let text = tree.create_text("hi");
        tree.append(a, text).unwrap();
        tree.detach(a);
        assert!(!tree.is_attached(a));
        assert_eq!(tree.children(a), &[text]);
        assert_eq!(tree.element_children(div).len(), 1);
    }

    #[test]
    fn test_deep_clone_is_detached_copy() {
        let (mut tree, div, _, _) = sample();
        let copy = tree.deep_clone(div);
        assert_ne!(copy, div);
        assert!(tree.parent(copy).is_none());
        assert_eq!(tree.children(copy).len(), 2);
        assert_eq!(tree.tag(tree.children(copy)[0]), Some("p"));
    }

    #[test]
    fn test_class_helpers() {
        let (mut tree, div, _, _) = sample();
        tree.add_class(div, "one").unwrap();
        tree.add_class(div, "two").unwrap();
        tree.add_class(div, "one").unwrap();
        assert_eq!(tree.get_attr(div, "class"), Some("one two"));
        tree.retain_classes(div, |c| c != "one");
        assert_eq!(tree.get_attr(div, "class"), Some("two"));
        tree.retain_classes(div, |_| false);
        assert_eq!(tree.get_attr(div, "class"), None);
    }

    #[test]
    fn test_swap_siblings() {
        let (mut tree, div, a, b) = sample();
        tree.swap_siblings(a, b).unwrap();
        assert_eq!(tree.children(div), &[b, a]);
    }
}
