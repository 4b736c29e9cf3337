//! Markup serialization, following the HTML fragment serialization rules
//! closely enough that digests of the same page agree across hosts.

use crate::document::Document;
use crate::node::{NodeData, NodeId};

pub(crate) fn inner_html(doc: &Document, id: NodeId, skip: &dyn Fn(NodeId) -> bool) -> String {
    let mut out = String::new();
    for child in doc.children(id) {
        write_node(doc, *child, skip, &mut out);
    }
    out
}

pub(crate) fn write_node(
    doc: &Document,
    id: NodeId,
    skip: &dyn Fn(NodeId) -> bool,
    out: &mut String,
) {
    if skip(id) {
        return;
    }
    let Ok(node) = doc.node(id) else {
        return;
    };
    match &node.data {
        NodeData::Text(text) => escape_text(text, out),
        NodeData::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            out.push('>');
            if crate::is_void(tag) {
                return;
            }
            for child in &node.children {
                write_node(doc, *child, skip, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
