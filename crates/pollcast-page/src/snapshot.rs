//! Page snapshots exchanged with the host bridge.
//!
//! A snapshot is nested JSON: an element is
//! `{"tag": "div", "attrs": [["class", "content"]], "children": [...]}` and a
//! text node is a bare JSON string. Attributes are pairs so their order is
//! preserved, which matters because attribute order is part of the markup
//! that gets hashed.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{NodeData, NodeId};

/// One node of a nested snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Text(String),
    Element(ElementSpec),
}

/// An element of a nested snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl ElementSpec {
    /// Element with no attributes or children.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    /// Shorthand for the `class` attribute.
    #[must_use]
    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    /// Append an element child.
    #[must_use]
    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(TreeNode::Element(child));
        self
    }

    /// Append a text child.
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.children.push(TreeNode::Text(text.to_string()));
        self
    }
}

impl From<ElementSpec> for TreeNode {
    fn from(spec: ElementSpec) -> Self {
        TreeNode::Element(spec)
    }
}

impl Document {
    /// Build a document from a nested snapshot. Nodes are numbered in
    /// pre-order; the root is always `NodeId(0)`.
    pub fn from_tree(tree: &TreeNode) -> Result<Self> {
        let TreeNode::Element(spec) = tree else {
            return Err(Error::InvalidTree("snapshot root must be an element".into()));
        };
        let mut doc = Document::with_root(&spec.tag);
        let root = doc.root();
        for (name, value) in &spec.attrs {
            doc.set_attr(root, name, value)?;
        }
        build_children(&mut doc, root, &spec.children)?;
        Ok(doc)
    }

    /// Parse a nested JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self> {
        let tree: TreeNode = serde_json::from_str(json)?;
        Self::from_tree(&tree)
    }

    /// Nested snapshot of the subtree at `id`.
    pub fn to_tree(&self, id: NodeId) -> Result<TreeNode> {
        let node = self.node(id)?;
        match &node.data {
            NodeData::Text(text) => Ok(TreeNode::Text(text.clone())),
            NodeData::Element { tag, attrs } => Ok(TreeNode::Element(ElementSpec {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: node
                    .children
                    .iter()
                    .map(|c| self.to_tree(*c))
                    .collect::<Result<Vec<_>>>()?,
            })),
        }
    }

    /// JSON snapshot of the whole document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_tree(self.root())?)?)
    }
}

fn build_children(doc: &mut Document, parent: NodeId, children: &[TreeNode]) -> Result<()> {
    for child in children {
        match child {
            TreeNode::Text(text) => {
                doc.append_text(parent, text)?;
            }
            TreeNode::Element(spec) => {
                let id = doc.append_element(parent, &spec.tag)?;
                for (name, value) in &spec.attrs {
                    doc.set_attr(id, name, value)?;
                }
                build_children(doc, id, &spec.children)?;
            }
        }
    }
    Ok(())
}
