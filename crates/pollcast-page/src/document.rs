//! The page tree and its DOM-like operations.

use crate::error::{Error, Result};
use crate::html;
use crate::node::{Node, NodeData, NodeId};

/// Inline style marking an element hidden.
const HIDDEN_STYLE: &str = "display: none";

/// An arena-backed element tree.
///
/// Detached nodes stay in the arena; they are simply unreachable from the
/// root. Ids are never reused within a document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding an empty `<body>` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::element("body")],
            root: NodeId(0),
        }
    }

    pub(crate) fn with_root(tag: &str) -> Self {
        Self {
            nodes: vec![Node::element(tag)],
            root: NodeId(0),
        }
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated (attached or not).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty. A document always holds its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(Error::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(Error::UnknownNode(id))
    }

    fn attrs_mut(&mut self, id: NodeId) -> Result<&mut Vec<(String, String)>> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attrs, .. } => Ok(attrs),
            NodeData::Text(_) => Err(Error::NotAnElement(id)),
        }
    }

    // --- Construction ---

    /// Allocate a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Allocate a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::text(text))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.node(parent)?.is_element() {
            return Err(Error::NotAnElement(parent));
        }
        if self.node(child)?.parent.is_some() || child == self.root {
            return Err(Error::InvalidTree(format!("{child} is already attached")));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(Error::InvalidTree(format!(
                "{child} is an ancestor of {parent}"
            )));
        }
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Create an element and append it to `parent` in one step.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId> {
        let id = self.create_element(tag);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Create a text node and append it to `parent` in one step.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId> {
        let id = self.create_text(text);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Detach `id` from its parent. The subtree stays in the arena.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        if let Some(parent) = self.node(id)?.parent {
            self.node_mut(parent)?.children.retain(|c| *c != id);
            self.node_mut(id)?.parent = None;
        }
        Ok(())
    }

    /// Detach every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) -> Result<()> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.clear_children(id)?;
        self.append_text(id, text)?;
        Ok(())
    }

    // --- Attributes ---

    /// Attribute value, if the node is an element carrying it.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).ok()?.attr(name)
    }

    /// Set (or overwrite) an attribute, keeping its original position.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let attrs = self.attrs_mut(id)?;
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<bool> {
        let attrs = self.attrs_mut(id)?;
        let before = attrs.len();
        attrs.retain(|(k, _)| k != name);
        Ok(attrs.len() != before)
    }

    /// Tag name of an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.node(id).ok()?.tag()
    }

    /// Whether the node's class list holds `class`.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.node(id).map(|n| n.has_class(class)).unwrap_or(false)
    }

    /// Add a class token if absent.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        if self.has_class(id, class) {
            return Ok(());
        }
        let joined = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &joined)
    }

    /// Class tokens of the node.
    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        match self.node(id) {
            Ok(node) => node.classes().collect(),
            Err(_) => Vec::new(),
        }
    }

    // --- Navigation ---

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok()?.parent
    }

    /// All children, text included.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element children only (`Element.children` in DOM terms).
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.node(*c).map(Node::is_element).unwrap_or(false))
            .collect()
    }

    /// Next sibling that is an element.
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|s| *s == id)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|s| self.node(*s).map(Node::is_element).unwrap_or(false))
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Nearest ancestor-or-self carrying `class`.
    pub fn closest_with_class(&self, id: NodeId, class: &str) -> Option<NodeId> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.has_class(current, class) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    /// Descendants of `root` (excluding `root`) in document order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// `getElementsByClassName` scoped to `root`.
    pub fn elements_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.has_class(*id, class))
            .collect()
    }

    /// `getElementsByTagName` scoped to `root`.
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.tag(*id).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
            .collect()
    }

    /// Descendants whose attribute `name` equals `value`.
    pub fn elements_by_attr(&self, root: NodeId, name: &str, value: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.attr(*id, name) == Some(value))
            .collect()
    }

    // --- Serialization ---

    /// Markup of the children of `id`, as `innerHTML` would produce it.
    pub fn inner_html(&self, id: NodeId) -> String {
        html::inner_html(self, id, &|_| false)
    }

    /// Like [`inner_html`](Self::inner_html) but leaving out every subtree for
    /// which `skip` returns true.
    pub fn inner_html_without(&self, id: NodeId, skip: &dyn Fn(NodeId) -> bool) -> String {
        html::inner_html(self, id, skip)
    }

    /// Markup of `id` itself.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        html::write_node(self, id, &|_| false, &mut out);
        out
    }

    /// Concatenated character data of the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Ok(Node { data: NodeData::Text(t), .. }) = self.node(id) {
            out.push_str(t);
        }
        for d in self.descendants(id) {
            if let Ok(Node { data: NodeData::Text(t), .. }) = self.node(d) {
                out.push_str(t);
            }
        }
        out
    }

    // --- Form controls ---

    /// The `type` of an `<input>`, lowercased; `text` when absent.
    pub fn input_type(&self, id: NodeId) -> Option<String> {
        if self.tag(id)? != "input" {
            return None;
        }
        Some(
            self.attr(id, "type")
                .unwrap_or("text")
                .to_ascii_lowercase(),
        )
    }

    /// Whether an input is checked.
    pub fn is_checked(&self, id: NodeId) -> bool {
        self.attr(id, "checked").is_some()
    }

    /// Set an input's checked state.
    ///
    /// Checking a radio unchecks every other radio sharing its `name`, as a
    /// browser would.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<()> {
        if !checked {
            self.remove_attr(id, "checked")?;
            return Ok(());
        }
        if self.input_type(id).as_deref() == Some("radio") {
            if let Some(name) = self.attr(id, "name").map(str::to_string) {
                let group: Vec<NodeId> = self
                    .elements_by_attr(self.root, "name", &name)
                    .into_iter()
                    .filter(|other| *other != id)
                    .filter(|other| self.input_type(*other).as_deref() == Some("radio"))
                    .collect();
                for other in group {
                    self.remove_attr(other, "checked")?;
                }
            }
        }
        self.set_attr(id, "checked", "")
    }

    // --- Visibility ---

    /// Whether the element is hidden through its inline style.
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.attr(id, "style")
            .is_some_and(|s| s.split(';').any(|decl| is_display_none(decl)))
    }

    /// Hide or show an element through its inline style.
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> Result<()> {
        let remaining: Vec<String> = self
            .attr(id, "style")
            .unwrap_or("")
            .split(';')
            .map(str::trim)
            .filter(|decl| !decl.is_empty() && !is_display_none(decl))
            .map(str::to_string)
            .collect();

        let mut decls = remaining;
        if hidden {
            decls.push(HIDDEN_STYLE.to_string());
        }

        if decls.is_empty() {
            self.remove_attr(id, "style")?;
        } else {
            self.set_attr(id, "style", &decls.join("; "))?;
        }
        Ok(())
    }
}

fn is_display_none(decl: &str) -> bool {
    let mut parts = decl.splitn(2, ':');
    let prop = parts.next().unwrap_or("").trim();
    let value = parts.next().unwrap_or("").trim();
    prop.eq_ignore_ascii_case("display") && value.eq_ignore_ascii_case("none")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz_fragment() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let block = doc.append_element(root, "div").unwrap();
        doc.set_attr(block, "class", "content").unwrap();
        let r1 = doc.append_element(block, "input").unwrap();
        doc.set_attr(r1, "type", "radio").unwrap();
        doc.set_attr(r1, "name", "q1").unwrap();
        let r2 = doc.append_element(block, "input").unwrap();
        doc.set_attr(r2, "type", "radio").unwrap();
        doc.set_attr(r2, "name", "q1").unwrap();
        (doc, block, r1, r2)
    }

    #[test]
    fn elements_by_class_in_document_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.append_element(root, "div").unwrap();
        doc.add_class(a, "content").unwrap();
        let inner = doc.append_element(a, "div").unwrap();
        doc.add_class(inner, "content").unwrap();
        let b = doc.append_element(root, "div").unwrap();
        doc.add_class(b, "content").unwrap();

        assert_eq!(doc.elements_by_class(root, "content"), vec![a, inner, b]);
        // The scope root itself is excluded.
        assert_eq!(doc.elements_by_class(a, "content"), vec![inner]);
    }

    #[test]
    fn radio_group_is_exclusive() {
        let (mut doc, _, r1, r2) = quiz_fragment();
        doc.set_checked(r1, true).unwrap();
        assert!(doc.is_checked(r1));
        doc.set_checked(r2, true).unwrap();
        assert!(!doc.is_checked(r1));
        assert!(doc.is_checked(r2));
    }

    #[test]
    fn checkboxes_are_independent() {
        let mut doc = Document::new();
        let root = doc.root();
        let c1 = doc.append_element(root, "input").unwrap();
        doc.set_attr(c1, "type", "checkbox").unwrap();
        doc.set_attr(c1, "name", "q1").unwrap();
        let c2 = doc.append_element(root, "input").unwrap();
        doc.set_attr(c2, "type", "checkbox").unwrap();
        doc.set_attr(c2, "name", "q1").unwrap();

        doc.set_checked(c1, true).unwrap();
        doc.set_checked(c2, true).unwrap();
        assert!(doc.is_checked(c1) && doc.is_checked(c2));
        doc.set_checked(c1, false).unwrap();
        assert!(!doc.is_checked(c1));
    }

    #[test]
    fn hide_and_show_preserves_other_styles() {
        let mut doc = Document::new();
        let root = doc.root();
        let span = doc.append_element(root, "span").unwrap();
        doc.set_attr(span, "style", "color: red").unwrap();

        doc.set_hidden(span, true).unwrap();
        assert!(doc.is_hidden(span));
        assert_eq!(doc.attr(span, "style"), Some("color: red; display: none"));

        doc.set_hidden(span, false).unwrap();
        assert!(!doc.is_hidden(span));
        assert_eq!(doc.attr(span, "style"), Some("color: red"));
    }

    #[test]
    fn append_rejects_cycles_and_reparenting() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.append_element(root, "div").unwrap();
        let b = doc.append_element(a, "div").unwrap();

        assert!(matches!(doc.append_child(b, a), Err(Error::InvalidTree(_))));
        assert!(matches!(doc.append_child(root, b), Err(Error::InvalidTree(_))));
        let t = doc.create_text("x");
        assert!(matches!(doc.append_child(t, b), Err(Error::NotAnElement(_))));
    }

    #[test]
    fn next_element_sibling_skips_text() {
        let mut doc = Document::new();
        let root = doc.root();
        let marker = doc.append_element(root, "span").unwrap();
        doc.append_text(root, " ").unwrap();
        let div = doc.append_element(root, "div").unwrap();
        assert_eq!(doc.next_element_sibling(marker), Some(div));
        assert_eq!(doc.next_element_sibling(div), None);
    }

    #[test]
    fn set_text_replaces_children() {
        let mut doc = Document::new();
        let root = doc.root();
        let span = doc.append_element(root, "span").unwrap();
        doc.append_element(span, "b").unwrap();
        doc.set_text(span, " ~ 3").unwrap();
        assert_eq!(doc.inner_html(span), " ~ 3");
        assert_eq!(doc.text_content(span), " ~ 3");
    }

    #[test]
    fn closest_with_class_walks_up() {
        let (mut doc, block, r1, _) = quiz_fragment();
        assert_eq!(doc.closest_with_class(r1, "content"), Some(block));
        let loose = doc.append_element(doc.root(), "p").unwrap();
        assert_eq!(doc.closest_with_class(loose, "content"), None);
    }
}
