//! Arena-allocated document tree for HTML to Markdown conversion.
//!
//! Nodes live in a single `Vec` owned by [`Dom`] and are addressed by
//! [`NodeId`]. Parent links and ordered child lists are plain indices, so
//! the tree is acyclic and single-rooted by construction, and a node's
//! arena index doubles as the key for per-node side-tables during
//! conversion. Any parser can build this structure to use demark.

use indexmap::IndexMap;

use crate::utilities::is_void;

/// Index of a node within its [`Dom`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// The kind of a tree node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The single root; its output is the concatenation of its children's.
    Document,
    /// An element with a lowercase tag name and insertion-ordered attributes.
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
    },
    /// A run of literal text.
    Text(String),
    /// A comment; always discarded by the engine.
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An owned document tree.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Dom {
    /// Create an empty tree containing only the document root.
    pub fn new() -> Self {
        let root = NodeData {
            kind: NodeKind::Document,
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, including unlinked ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create an element node. Tag identity is case-insensitive; the name
    /// is stored lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_lowercase(),
            attrs: IndexMap::new(),
        })
    }

    /// Create an element node with attributes, preserving attribute order.
    pub fn create_element_with_attrs(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.push(NodeKind::Element {
            tag: tag.to_lowercase(),
            attrs,
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment(text.to_string()))
    }

    /// Append `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Replace a node's child list. Dropped children stay in the arena but
    /// become unreachable, which is all the pre-passes need.
    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        self.nodes[id.0].children = children;
    }

    pub(crate) fn set_text(&mut self, id: NodeId, text: String) {
        if let NodeKind::Text(payload) = &mut self.nodes[id.0].kind {
            *payload = text;
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Text(_))
    }

    /// Lowercase tag name, for element nodes.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Attribute lookup by case-insensitive name.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Text payload, for text nodes.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(payload) => Some(payload),
            _ => None,
        }
    }

    fn sibling_at_offset(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == id)?;
        let target = pos as isize + offset;
        if target < 0 {
            return None;
        }
        siblings.get(target as usize).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling_at_offset(id, -1)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling_at_offset(id, 1)
    }

    /// All text payloads under `id`, concatenated in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        match &self.nodes[id.0].kind {
            NodeKind::Text(payload) => payload.clone(),
            NodeKind::Comment(_) => String::new(),
            _ => self
                .children(id)
                .iter()
                .map(|&child| self.text_content(child))
                .collect(),
        }
    }

    /// Reconstruct the HTML of a node including its own tag, for rules
    /// that keep an element as-is.
    pub fn outer_html(&self, id: NodeId) -> String {
        match &self.nodes[id.0].kind {
            NodeKind::Text(payload) => payload.clone(),
            NodeKind::Comment(payload) => format!("<!--{}-->", payload),
            NodeKind::Element { tag, attrs } => {
                let attrs = attributes_string(attrs);
                if is_void(tag) {
                    if attrs.is_empty() {
                        format!("<{}>", tag)
                    } else {
                        format!("<{} {}>", tag, attrs)
                    }
                } else {
                    let inner = self.inner_html(id);
                    if attrs.is_empty() {
                        format!("<{}>{}</{}>", tag, inner, tag)
                    } else {
                        format!("<{} {}>{}</{}>", tag, attrs, inner, tag)
                    }
                }
            }
            NodeKind::Document => self.inner_html(id),
        }
    }

    /// Reconstruct the HTML of a node's contents.
    pub fn inner_html(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .map(|&child| self.outer_html(child))
            .collect()
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

fn attributes_string(attrs: &IndexMap<String, String>) -> String {
    let mut parts = Vec::new();
    for (name, value) in attrs {
        if value.is_empty() {
            parts.push(name.clone());
        } else {
            parts.push(format!("{}=\"{}\"", name, escape_html_attr(value)));
        }
    }
    parts.join(" ")
}

/// Escape an HTML attribute value.
fn escape_html_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A node together with its owning tree, for navigation inside filters and
/// replacement rules.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    dom: &'a Dom,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn new(dom: &'a Dom, id: NodeId) -> Self {
        Self { dom, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn dom(&self) -> &'a Dom {
        self.dom
    }

    pub fn is_element(&self) -> bool {
        self.dom.is_element(self.id)
    }

    pub fn is_text(&self) -> bool {
        self.dom.is_text(self.id)
    }

    /// Lowercase tag name; empty for non-element nodes.
    pub fn tag_name(&self) -> &'a str {
        self.dom.tag_name(self.id).unwrap_or("")
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.dom.attr(self.id, name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        let dom = self.dom;
        dom.parent(self.id).map(|id| NodeRef::new(dom, id))
    }

    pub fn parent_tag(&self) -> Option<&'a str> {
        let dom = self.dom;
        dom.parent(self.id).and_then(|id| dom.tag_name(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> {
        let dom = self.dom;
        dom.children(self.id)
            .iter()
            .map(move |&id| NodeRef::new(dom, id))
    }

    pub fn element_children(&self) -> impl Iterator<Item = NodeRef<'a>> {
        self.children().filter(|n| n.is_element())
    }

    pub fn first_element_child(&self) -> Option<NodeRef<'a>> {
        self.element_children().next()
    }

    pub fn previous_sibling(&self) -> Option<NodeRef<'a>> {
        let dom = self.dom;
        dom.previous_sibling(self.id).map(|id| NodeRef::new(dom, id))
    }

    pub fn next_sibling(&self) -> Option<NodeRef<'a>> {
        let dom = self.dom;
        dom.next_sibling(self.id).map(|id| NodeRef::new(dom, id))
    }

    /// Position of this node among its parent's element children.
    pub fn element_index(&self) -> usize {
        let Some(parent) = self.parent() else { return 0 };
        parent
            .element_children()
            .position(|n| n.id == self.id)
            .unwrap_or(0)
    }

    /// Text payload, for text nodes.
    pub fn text(&self) -> Option<&'a str> {
        self.dom.text(self.id)
    }

    pub fn text_content(&self) -> String {
        self.dom.text_content(self.id)
    }

    pub fn outer_html(&self) -> String {
        self.dom.outer_html(self.id)
    }

    pub fn is_block(&self) -> bool {
        crate::utilities::is_block(self.tag_name())
    }

    pub fn is_void(&self) -> bool {
        is_void(self.tag_name())
    }
}
