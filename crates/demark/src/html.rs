//! HTML parsing support.
//!
//! This module turns an HTML string into the arena [`Dom`] used by demark,
//! with entity decoding handled by the parser and the whitespace collapse
//! pre-pass already applied. Behind the `html` feature so the engine can be
//! used with any other parser that builds a [`Dom`] directly.

use scraper::{ElementRef, Html, Node as ScraperNode};

use crate::collapse::collapse_whitespace;
use crate::dom::{Dom, NodeId};

/// Parse an HTML fragment into a [`Dom`].
///
/// # Example
///
/// ```rust
/// use demark::{parse_fragment, DemarkService};
///
/// let dom = parse_fragment("<h1>Hello <em>World</em></h1>");
///
/// let service = DemarkService::new();
/// let markdown = service.convert_tree(dom).unwrap();
/// assert_eq!(markdown, "# Hello _World_");
/// ```
pub fn parse_fragment(html: &str) -> Dom {
    let document = Html::parse_fragment(html);
    let mut dom = Dom::new();
    let root = dom.root();
    append_children(&mut dom, root, document.root_element());
    collapse_whitespace(&mut dom);
    dom
}

/// Copy a scraper subtree into the arena
fn append_children(dom: &mut Dom, parent: NodeId, element: ElementRef) {
    for child in element.children() {
        match child.value() {
            ScraperNode::Text(text) => {
                let id = dom.create_text(&text.text);
                dom.append(parent, id);
            }
            ScraperNode::Comment(comment) => {
                let id = dom.create_comment(&comment.comment);
                dom.append(parent, id);
            }
            ScraperNode::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    let attrs: Vec<(&str, &str)> = child_element.value().attrs().collect();
                    let id = if attrs.is_empty() {
                        dom.create_element(child_element.value().name())
                    } else {
                        dom.create_element_with_attrs(child_element.value().name(), &attrs)
                    };
                    dom.append(parent, id);
                    append_children(dom, id, child_element);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_fragment() {
        let dom = parse_fragment("<p>Hello World</p>");
        let children = dom.children(dom.root());
        assert_eq!(children.len(), 1);
        assert_eq!(dom.tag_name(children[0]), Some("p"));
        assert_eq!(dom.text_content(children[0]), "Hello World");
    }

    #[test]
    fn test_parse_decodes_entities() {
        let dom = parse_fragment("<p>a &amp; b</p>");
        let p = dom.children(dom.root())[0];
        assert_eq!(dom.text_content(p), "a & b");
    }

    #[test]
    fn test_parse_keeps_comments_for_the_eliminator() {
        let dom = parse_fragment("<p>Hi<!-- c --></p>");
        let p = dom.children(dom.root())[0];
        assert_eq!(dom.children(p).len(), 2);
    }

    #[test]
    fn test_parse_collapses_whitespace() {
        let dom = parse_fragment("<p>a   \n   b</p>");
        let p = dom.children(dom.root())[0];
        assert_eq!(dom.text_content(p), "a b");
    }

    #[test]
    fn test_parse_attributes() {
        let dom = parse_fragment(r#"<a href="https://example.com" title="T">x</a>"#);
        let a = dom.children(dom.root())[0];
        assert_eq!(dom.attr(a, "href"), Some("https://example.com"));
        assert_eq!(dom.attr(a, "title"), Some("T"));
    }
}
