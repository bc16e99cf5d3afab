//! Blank-node eliminator.
//!
//! Runs after the collapse pre-pass and before traversal: comments go away
//! unconditionally, whitespace-only text nodes go away outside preformatted
//! contexts, and remaining text loses edge whitespace runs that contain a
//! line break. A lone significant space at an inline boundary is kept; the
//! replacement engine's flanking logic decides its fate.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{Dom, NodeId, NodeKind};

static LEADING_BREAK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[\n\r\t\f]\s*").unwrap());
static TRAILING_BREAK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[\n\r\t\f]\s*$").unwrap());

/// Remove comment and blank text nodes, rebuilding each child list rather
/// than unlinking mid-iteration.
pub fn drop_blank_nodes(dom: &mut Dom) {
    visit(dom, dom.root(), false);
}

fn visit(dom: &mut Dom, id: NodeId, preformatted: bool) -> bool {
    if matches!(dom.kind(id), NodeKind::Comment(_)) {
        return false;
    }

    if let NodeKind::Text(payload) = dom.kind(id) {
        if preformatted {
            return true;
        }
        if payload.chars().all(char::is_whitespace) {
            return false;
        }
        let stripped = LEADING_BREAK_RUN.replace(payload, "");
        let stripped = TRAILING_BREAK_RUN.replace(&stripped, "").into_owned();
        dom.set_text(id, stripped);
        return true;
    }

    // Element or document: recurse, keeping only surviving children.
    let preformatted = preformatted || matches!(dom.tag_name(id), Some("pre" | "code"));
    let children = dom.children(id).to_vec();
    let kept: Vec<NodeId> = children
        .into_iter()
        .filter(|&child| visit(dom, child, preformatted))
        .collect();
    dom.set_children(id, kept);
    true
}
