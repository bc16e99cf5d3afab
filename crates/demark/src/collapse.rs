//! Whitespace collapse pre-pass.
//!
//! Removes insignificant whitespace between block-level regions and
//! collapses interior runs to single spaces, before the conversion engine
//! runs. `pre` subtrees are left untouched.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{Dom, NodeId, NodeKind};
use crate::utilities::{is_block, is_void};

static WS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \r\n\t]+").unwrap());

#[derive(Default)]
struct Collapse {
    /// Last text node that still renders, with its pending value.
    prev_text: Option<NodeId>,
    /// Set after a void or preformatted element, whose rendering means a
    /// following leading space is significant.
    keep_leading_ws: bool,
    edits: HashMap<NodeId, String>,
    removals: HashSet<NodeId>,
}

impl Collapse {
    fn current<'a>(&'a self, dom: &'a Dom, id: NodeId) -> &'a str {
        self.edits
            .get(&id)
            .map(String::as_str)
            .or_else(|| dom.text(id))
            .unwrap_or("")
    }

    fn trim_prev(&mut self, dom: &Dom) {
        let Some(prev) = self.prev_text else { return };
        let value = self.current(dom, prev).to_string();
        if let Some(stripped) = value.strip_suffix(' ') {
            if stripped.is_empty() {
                self.removals.insert(prev);
            } else {
                self.edits.insert(prev, stripped.to_string());
            }
        }
    }
}

/// Collapse whitespace across the tree, using the block-element predicate
/// to decide which boundaries make spaces insignificant.
pub fn collapse_whitespace(dom: &mut Dom) {
    let mut state = Collapse::default();
    walk(dom, dom.root(), &mut state);

    // A space left hanging at the very end of the document renders as
    // nothing.
    state.trim_prev(dom);

    let Collapse {
        edits, removals, ..
    } = state;
    for (id, text) in edits {
        dom.set_text(id, text);
    }
    if !removals.is_empty() {
        rebuild(dom, dom.root(), &removals);
    }
}

fn walk(dom: &Dom, id: NodeId, state: &mut Collapse) {
    for &child in dom.children(id) {
        match dom.kind(child) {
            NodeKind::Text(payload) => {
                let mut text = WS_RUN.replace_all(payload, " ").into_owned();
                let prev_ends_in_space = match state.prev_text {
                    Some(prev) => state.current(dom, prev).ends_with(' '),
                    None => true,
                };
                if prev_ends_in_space && !state.keep_leading_ws && text.starts_with(' ') {
                    text.remove(0);
                }
                if text.is_empty() {
                    state.removals.insert(child);
                } else {
                    state.edits.insert(child, text);
                    state.prev_text = Some(child);
                }
            }
            NodeKind::Element { tag, .. } => {
                if is_block(tag) || tag == "br" {
                    state.trim_prev(dom);
                    state.prev_text = None;
                    state.keep_leading_ws = false;
                } else if is_void(tag) {
                    state.prev_text = None;
                    state.keep_leading_ws = true;
                } else if state.prev_text.is_some() {
                    state.keep_leading_ws = false;
                }
                if tag != "pre" {
                    walk(dom, child, state);
                }
            }
            // Comments are transparent here; the blank-node pass drops them.
            NodeKind::Comment(_) | NodeKind::Document => {}
        }
    }
}

fn rebuild(dom: &mut Dom, id: NodeId, removals: &HashSet<NodeId>) {
    let kept: Vec<NodeId> = dom
        .children(id)
        .iter()
        .copied()
        .filter(|child| !removals.contains(child))
        .collect();
    dom.set_children(id, kept);
    for child in dom.children(id).to_vec() {
        rebuild(dom, child, removals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(dom: &Dom) -> String {
        dom.text_content(dom.root())
    }

    #[test]
    fn test_collapses_runs() {
        let mut dom = Dom::new();
        let p = dom.create_element("p");
        let text = dom.create_text("a \n\t  b");
        dom.append(dom.root(), p);
        dom.append(p, text);
        collapse_whitespace(&mut dom);
        assert_eq!(text_of(&dom), "a b");
    }

    #[test]
    fn test_removes_whitespace_between_blocks() {
        let mut dom = Dom::new();
        let h = dom.create_element("h1");
        let ht = dom.create_text("A");
        let gap = dom.create_text("\n  ");
        let p = dom.create_element("p");
        let pt = dom.create_text("B");
        dom.append(dom.root(), h);
        dom.append(h, ht);
        dom.append(dom.root(), gap);
        dom.append(dom.root(), p);
        dom.append(p, pt);
        collapse_whitespace(&mut dom);
        assert_eq!(text_of(&dom), "AB");
        assert_eq!(dom.children(dom.root()).len(), 2);
    }

    #[test]
    fn test_keeps_inline_boundary_space() {
        let mut dom = Dom::new();
        let em = dom.create_element("em");
        let et = dom.create_text("foo");
        let tail = dom.create_text(" bar");
        dom.append(dom.root(), em);
        dom.append(em, et);
        dom.append(dom.root(), tail);
        collapse_whitespace(&mut dom);
        assert_eq!(text_of(&dom), "foo bar");
    }

    #[test]
    fn test_preserves_pre() {
        let mut dom = Dom::new();
        let pre = dom.create_element("pre");
        let code = dom.create_element("code");
        let t = dom.create_text("a    b\n  c");
        dom.append(dom.root(), pre);
        dom.append(pre, code);
        dom.append(code, t);
        collapse_whitespace(&mut dom);
        assert_eq!(dom.text_content(pre), "a    b\n  c");
    }

    #[test]
    fn test_space_after_void_survives() {
        let mut dom = Dom::new();
        let p = dom.create_element("p");
        let a = dom.create_text("a ");
        let img = dom.create_element_with_attrs("img", &[("src", "x.png")]);
        let b = dom.create_text(" b");
        dom.append(dom.root(), p);
        dom.append(p, a);
        dom.append(p, img);
        dom.append(p, b);
        collapse_whitespace(&mut dom);
        assert_eq!(text_of(&dom), "a  b");
    }
}
