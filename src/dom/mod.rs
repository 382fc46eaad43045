//! Arena DOM for the source document.
//!
//! html5ever parses into this tree via [`sink`]. Nodes are stored in one
//! vector with index links, and carry a tagged [`NodeData`] variant; elements
//! are pre-classified into an [`ElemKind`] so the segmenter dispatches on an
//! enum instead of comparing tag-name strings at every use site.
//!
//! Note: custom marker elements (`<break>`, `<hide>`) must be closed in the
//! source (`<break></break>`), otherwise the parser nests the following
//! content inside them.

pub mod serialize;
pub mod sink;

use html5ever::{LocalName, QualName, ns};

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

/// Classification of the element tags the pipeline dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemKind {
    /// `h1`/`h2`, used for chapter titles.
    Heading,
    Image,
    Anchor,
    Button,
    /// Custom `<break>` element: chapter delimiter.
    Marker,
    /// Custom `<hide>` element: subtree to drop.
    Hide,
    Iframe,
    /// `hr`, discarded during segmentation.
    Rule,
    Other,
}

impl ElemKind {
    fn classify(name: &LocalName) -> Self {
        match name.as_ref() {
            "h1" | "h2" => ElemKind::Heading,
            "img" => ElemKind::Image,
            "a" => ElemKind::Anchor,
            "button" => ElemKind::Button,
            "break" => ElemKind::Marker,
            "hide" => ElemKind::Hide,
            "iframe" => ElemKind::Iframe,
            "hr" => ElemKind::Rule,
            _ => ElemKind::Other,
        }
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    Doctype { name: String },
}

/// An element: qualified name, classification, attributes.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: QualName,
    pub kind: ElemKind,
    pub attrs: Vec<Attr>,
}

/// HTML attribute.
#[derive(Debug, Clone)]
pub struct Attr {
    pub name: QualName,
    pub value: String,
}

impl Element {
    pub fn local_name(&self) -> &str {
        self.name.local.as_ref()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.local.as_ref() == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing value.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(attr) = self
            .attrs
            .iter_mut()
            .find(|a| a.name.local.as_ref() == name)
        {
            attr.value = value.to_string();
        } else {
            self.attrs.push(Attr {
                name: attr_name(name),
                value: value.to_string(),
            });
        }
    }

    /// Append a class token to the `class` attribute.
    pub fn add_class(&mut self, class: &str) {
        match self.attr("class") {
            Some(existing) if !existing.split_whitespace().any(|c| c == class) => {
                let merged = format!("{existing} {class}");
                self.set_attr("class", &merged);
            }
            Some(_) => {}
            None => self.set_attr("class", class),
        }
    }
}

fn attr_name(local: &str) -> QualName {
    QualName::new(None, ns!(), LocalName::from(local))
}

/// A node in the arena.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Arena-backed document tree.
pub struct Dom {
    nodes: Vec<Node>,
    document: NodeId,
}

impl Dom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        dom.document = dom.alloc(Node::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attr>) -> NodeId {
        let kind = ElemKind::classify(&name.local);
        self.alloc(Node::new(NodeData::Element(Element { name, kind, attrs })))
    }

    /// Create an HTML element from a local name and (name, value) pairs.
    pub fn create_named_element(&mut self, local: &str, attrs: &[(&str, &str)]) -> NodeId {
        let name = QualName::new(None, ns!(html), LocalName::from(local));
        let attrs = attrs
            .iter()
            .map(|(n, value)| Attr {
                name: attr_name(n),
                value: (*value).to_string(),
            })
            .collect();
        self.create_element(name, attrs)
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text)))
    }

    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text)))
    }

    pub fn create_doctype(&mut self, name: String) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype { name }))
    }

    // ------------------------------------------------------------------
    // Structure edits
    // ------------------------------------------------------------------

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = NodeId::NONE;
        }

        if last_child.is_some() {
            if let Some(last) = self.get_mut(last_child) {
                last.next_sibling = child;
            }
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Append text, merging into a trailing text node when possible.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child) {
            if let NodeData::Text(existing) = &mut last.data {
                existing.push_str(text);
                return;
            }
        }

        let text_node = self.create_text(text.to_string());
        self.append(parent, text_node);
    }

    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Detach a node (and its subtree) from its parent.
    pub fn detach(&mut self, target: NodeId) {
        let (parent, prev, next) = match self.get(target) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(target) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Replace `old` with `new` in the tree; `old` is detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        self.insert_before(old, new);
        self.detach(old);
    }

    /// Detach all children of a node.
    pub fn clear_children(&mut self, parent: NodeId) {
        let children: Vec<_> = self.children(parent).collect();
        for child in children {
            self.detach(child);
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        let first = self.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        ChildrenIter {
            dom: self,
            current: first,
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.get_mut(id).and_then(|n| match &mut n.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn kind(&self, id: NodeId) -> Option<ElemKind> {
        self.element(id).map(|el| el.kind)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Comment(_)))
    }

    /// The subtree rooted at `id`, in document order, including `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut children: Vec<_> = self.children(current).collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// All descendants of `id` (inclusive) with the given element kind.
    pub fn descendants_of_kind(&self, id: NodeId, kind: ElemKind) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.kind(n) == Some(kind))
            .collect()
    }

    /// First element of `kind` in the whole document, in document order.
    pub fn find_kind(&self, kind: ElemKind) -> Option<NodeId> {
        self.descendants(self.document)
            .into_iter()
            .find(|&n| self.kind(n) == Some(kind))
    }

    /// First element with the given tag name, in document order.
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.document)
            .into_iter()
            .find(|&n| self.element(n).is_some_and(|el| el.local_name() == tag))
    }

    /// The `body` element of a parsed document.
    pub fn body(&self) -> Option<NodeId> {
        self.find_by_tag("body")
    }

    /// Concatenated text of a subtree, each segment trimmed.
    ///
    /// Matches "stripped text" semantics: `<h1> A <b>B</b> </h1>` yields
    /// `"AB"`.
    pub fn stripped_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(NodeData::Text(text)) = self.get(node).map(|n| &n.data) {
                out.push_str(text.trim());
            }
        }
        out
    }

    /// Whether the subtree contains any non-whitespace text.
    pub fn has_text(&self, id: NodeId) -> bool {
        self.descendants(id).into_iter().any(|node| {
            matches!(
                self.get(node).map(|n| &n.data),
                Some(NodeData::Text(text)) if !text.trim().is_empty()
            )
        })
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the children of a node.
pub struct ChildrenIter<'a> {
    dom: &'a Dom,
    current: NodeId,
}

impl Iterator for ChildrenIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_children() {
        let mut dom = Dom::new();
        let div = dom.create_named_element("div", &[]);
        let p1 = dom.create_named_element("p", &[]);
        let p2 = dom.create_named_element("p", &[]);
        dom.append(dom.document(), div);
        dom.append(div, p1);
        dom.append(div, p2);

        let children: Vec<_> = dom.children(div).collect();
        assert_eq!(children, [p1, p2]);
    }

    #[test]
    fn test_detach_middle_child() {
        let mut dom = Dom::new();
        let div = dom.create_named_element("div", &[]);
        let a = dom.create_named_element("p", &[]);
        let b = dom.create_named_element("p", &[]);
        let c = dom.create_named_element("p", &[]);
        dom.append(dom.document(), div);
        for id in [a, b, c] {
            dom.append(div, id);
        }

        dom.detach(b);
        let children: Vec<_> = dom.children(div).collect();
        assert_eq!(children, [a, c]);
    }

    #[test]
    fn test_replace() {
        let mut dom = Dom::new();
        let div = dom.create_named_element("div", &[]);
        let iframe = dom.create_named_element("iframe", &[("src", "x.html")]);
        dom.append(dom.document(), div);
        dom.append(div, iframe);

        let img = dom.create_named_element("img", &[("src", "x.jpg")]);
        dom.replace(iframe, img);

        let children: Vec<_> = dom.children(div).collect();
        assert_eq!(children, [img]);
        assert_eq!(dom.kind(img), Some(ElemKind::Image));
    }

    #[test]
    fn test_kind_classification() {
        let mut dom = Dom::new();
        for (tag, kind) in [
            ("h1", ElemKind::Heading),
            ("h2", ElemKind::Heading),
            ("h3", ElemKind::Other),
            ("img", ElemKind::Image),
            ("a", ElemKind::Anchor),
            ("break", ElemKind::Marker),
            ("hide", ElemKind::Hide),
            ("iframe", ElemKind::Iframe),
            ("hr", ElemKind::Rule),
            ("div", ElemKind::Other),
        ] {
            let id = dom.create_named_element(tag, &[]);
            assert_eq!(dom.kind(id), Some(kind), "tag {tag}");
        }
    }

    #[test]
    fn test_stripped_text() {
        let mut dom = Dom::new();
        let h1 = dom.create_named_element("h1", &[]);
        dom.append(dom.document(), h1);
        dom.append_text(h1, " Intro ");
        let b = dom.create_named_element("b", &[]);
        dom.append(h1, b);
        dom.append_text(b, " Bold ");

        assert_eq!(dom.stripped_text(h1), "IntroBold");
        assert!(dom.has_text(h1));
    }

    #[test]
    fn test_add_class() {
        let mut dom = Dom::new();
        let a = dom.create_named_element("a", &[("class", "link")]);
        dom.element_mut(a).unwrap().add_class("button");
        dom.element_mut(a).unwrap().add_class("button");
        assert_eq!(dom.attr(a, "class"), Some("link button"));
    }
}
