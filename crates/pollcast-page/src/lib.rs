//! Pollcast Page
//!
//! A headless element tree standing in for the externally rendered quiz page.
//!
//! The overlay never owns the real page. A host bridge captures the page as a
//! [`Document`] snapshot, hands it over, and forwards user interaction as
//! [`PageEvent`]s. Everything the overlay reads (question markup, answer
//! labels, checked inputs) and everything it draws (tally indicators, vote
//! affordances) goes through this tree, which keeps the overlay testable
//! without a browser.
//!
//! # Node identity
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Loading a snapshot
//! with [`Document::from_tree`] numbers nodes in pre-order starting at the
//! root (id 0), so a host can refer to nodes in events without any ids being
//! written into its markup.

mod document;
mod error;
mod event;
mod html;
mod node;
mod snapshot;

pub use document::Document;
pub use error::{Error, Result};
pub use event::PageEvent;
pub use node::{Node, NodeData, NodeId};
pub use snapshot::{ElementSpec, TreeNode};

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Whether `tag` is a void element.
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}
