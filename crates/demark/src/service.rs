//! DemarkService - the main entry point for HTML to Markdown conversion.
//!
//! The engine processes an element tree children-first: a breadth-first
//! enumeration of the elements, read in reverse, guarantees every node is
//! visited after all of its descendants. Each element's Markdown lands in a
//! side-table keyed by arena index; the tree itself stays read-only during
//! the fold.

use std::collections::VecDeque;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::clean::drop_blank_nodes;
use crate::dom::{Dom, NodeId, NodeKind, NodeRef};
use crate::rules::{first_match, Rule, Rules};
use crate::utilities::{is_rendered_when_blank, is_void};
use crate::{Error, Result};

/// Heading style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingStyle {
    /// Use ATX-style headings (prefixed with #)
    #[default]
    Atx,
    /// Use setext-style headings for levels 1-2 (underlined with = or -)
    Setext,
}

/// What to do when no rule matches an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedPolicy {
    /// Pass the aggregated content through, dropping the tag
    #[default]
    PassThrough,
    /// Raise [`Error::UnmatchedElement`]
    Error,
}

/// Options for DemarkService
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Heading style (atx or setext)
    pub heading_style: HeadingStyle,

    /// Horizontal rule string
    pub hr: String,

    /// Bullet list marker
    pub bullet_list_marker: char,

    /// Emphasis delimiter
    pub em_delimiter: char,

    /// Strong delimiter
    pub strong_delimiter: String,

    /// Fence string for fenced code blocks
    pub fence: String,

    /// Include the extended-syntax rule layer (tables, strikethrough, ...)
    pub extended_syntax: bool,

    /// Fallback policy for elements no rule matches
    pub unmatched: UnmatchedPolicy,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            hr: "* * *".to_string(),
            bullet_list_marker: '*',
            em_delimiter: '_',
            strong_delimiter: "**".to_string(),
            fence: "```".to_string(),
            extended_syntax: false,
            unmatched: UnmatchedPolicy::PassThrough,
        }
    }
}

/// The main service for converting HTML to Markdown
pub struct DemarkService {
    options: ConvertOptions,
    rules: Rules,
}

impl DemarkService {
    /// Create a new DemarkService with default options
    pub fn new() -> Self {
        Self {
            options: ConvertOptions::default(),
            rules: Rules::new(),
        }
    }

    /// Create a DemarkService with custom options
    pub fn with_options(options: ConvertOptions) -> Self {
        Self {
            options,
            rules: Rules::new(),
        }
    }

    /// Add a caller rule; caller rules outrank every built-in layer
    pub fn add_rule(&mut self, key: &str, rule: Rule) -> &mut Self {
        self.rules.add(key, rule);
        self
    }

    /// Get the current options
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Get mutable access to options
    pub fn options_mut(&mut self) -> &mut ConvertOptions {
        &mut self.options
    }

    /// Convert an HTML fragment to Markdown
    #[cfg(feature = "html")]
    pub fn convert(&self, html: &str) -> Result<String> {
        if html.is_empty() {
            return Ok(String::new());
        }

        // Escape potential ordered-list triggers before the parser can
        // reinterpret them
        let escaped = escape_list_markers(html);
        let dom = crate::html::parse_fragment(&escaped);
        self.convert_tree(dom)
    }

    /// Convert an already-built tree to Markdown. The tree is consumed;
    /// every call owns its own working copy.
    pub fn convert_tree(&self, mut dom: Dom) -> Result<String> {
        drop_blank_nodes(&mut dom);

        let registry = self.rules.compose(self.options.extended_syntax);
        let order = flatten_elements(&dom, dom.root());

        // Computed output per node, keyed by arena index. Reverse
        // breadth-first order writes every descendant before its parent
        // reads it.
        let mut outputs: Vec<Option<String>> = vec![None; dom.len()];

        for &id in order.iter().rev() {
            let content = aggregate_content(&dom, id, &outputs);
            let node = NodeRef::new(&dom, id);
            let tag = node.tag_name();

            if !is_void(tag) && !is_rendered_when_blank(tag) && content.trim().is_empty() {
                outputs[id.index()] = Some(String::new());
                continue;
            }

            let rule = first_match(&registry, tag, &node, &self.options);
            let (leading, trailing, content) = flanking_whitespace(&node, content);

            let replaced = match rule {
                Some(rule) => rule.replace(&node, &content, &self.options),
                None => match self.options.unmatched {
                    UnmatchedPolicy::PassThrough => content,
                    UnmatchedPolicy::Error => {
                        return Err(Error::UnmatchedElement {
                            tag: tag.to_string(),
                        })
                    }
                },
            };

            outputs[id.index()] = Some(format!("{}{}{}", leading, replaced, trailing));
        }

        let output = aggregate_content(&dom, dom.root(), &outputs);
        Ok(normalize(&output))
    }
}

impl Default for DemarkService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "html")]
static OL_TRIGGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\. ").unwrap());

/// Escape `N. ` so literal text cannot be re-read as an ordered-list marker.
#[cfg(feature = "html")]
fn escape_list_markers(html: &str) -> String {
    OL_TRIGGER.replace_all(html, r"${1}\. ").into_owned()
}

/// Breadth-first enumeration of the element nodes under `root`, excluding
/// the root itself. Reversed, this yields a children-before-parents
/// processing order.
fn flatten_elements(dom: &Dom, root: NodeId) -> Vec<NodeId> {
    let mut queue = VecDeque::from([root]);
    let mut order = Vec::new();
    while let Some(id) = queue.pop_front() {
        order.push(id);
        for &child in dom.children(id) {
            if dom.is_element(child) {
                queue.push_back(child);
            }
        }
    }
    order.remove(0);
    order
}

/// Concatenate, in document order, each child's computed output (elements)
/// or literal payload (text).
fn aggregate_content(dom: &Dom, id: NodeId, outputs: &[Option<String>]) -> String {
    let mut out = String::new();
    for &child in dom.children(id) {
        match dom.kind(child) {
            NodeKind::Element { .. } => {
                if let Some(text) = outputs[child.index()].as_deref() {
                    out.push_str(text);
                }
            }
            NodeKind::Text(payload) => out.push_str(payload),
            _ => {}
        }
    }
    out
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Whether the sibling on `side` already renders a space at the boundary.
fn is_flanked(node: &NodeRef, side: Side) -> bool {
    let sibling = match side {
        Side::Left => node.previous_sibling(),
        Side::Right => node.next_sibling(),
    };
    let Some(sibling) = sibling else { return false };

    let text = if sibling.is_text() {
        sibling.text().unwrap_or("").to_string()
    } else if sibling.is_element() && !sibling.is_block() {
        sibling.text_content()
    } else {
        return false;
    };

    match side {
        Side::Left => text.ends_with(' '),
        Side::Right => text.starts_with(' '),
    }
}

/// Decide which boundary spaces an inline element must re-emit itself.
/// Block boundaries separate implicitly, so block elements get none.
fn flanking_whitespace(node: &NodeRef, content: String) -> (&'static str, &'static str, String) {
    if node.is_block() {
        return ("", "", content);
    }

    let is_ws = |c: char| matches!(c, ' ' | '\r' | '\n' | '\t');
    let has_leading = content.starts_with(is_ws);
    let has_trailing = content.ends_with(is_ws);

    let leading = if has_leading && !is_flanked(node, Side::Left) {
        " "
    } else {
        ""
    };
    let trailing = if has_trailing && !is_flanked(node, Side::Right) {
        " "
    } else {
        ""
    };

    let mut content = content;
    if !leading.is_empty() {
        content = content.trim_start().to_string();
    }
    if !trailing.is_empty() {
        content = content.trim_end().to_string();
    }

    (leading, trailing, content)
}

static LEADING_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\t\r\n]+").unwrap());
static TRAILING_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+$").unwrap());
static PADDED_BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s+\n").unwrap());
static EXTRA_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Final cleanup: no blank edges, at most one blank line between blocks.
fn normalize(output: &str) -> String {
    let output = LEADING_BREAKS.replace(output, "");
    let output = TRAILING_WS.replace(&output, "");
    let output = PADDED_BLANK_LINE.replace_all(&output, "\n\n");
    EXTRA_BLANK_LINES.replace_all(&output, "\n\n").into_owned()
}


#[cfg(all(test, feature = "html"))]
mod tests {
    use super::*;
    use crate::rules::Filter;

    fn convert(html: &str) -> String {
        DemarkService::new().convert(html).unwrap()
    }

    fn convert_extended(html: &str) -> String {
        let options = ConvertOptions {
            extended_syntax: true,
            ..Default::default()
        };
        DemarkService::with_options(options).convert(html).unwrap()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(convert(""), "");
    }

    #[test]
    fn test_determinism() {
        let html = "<h1>Title</h1><p>Some <strong>bold</strong> text.</p>";
        assert_eq!(convert(html), convert(html));
    }

    #[test]
    fn test_end_to_end() {
        assert_eq!(
            convert("<h1>Title</h1><p>Some <strong>bold</strong> text.</p>"),
            "# Title\n\nSome **bold** text."
        );
    }

    #[test]
    fn test_simple_paragraph() {
        assert_eq!(convert("<p>Hello World</p>"), "Hello World");
    }

    #[test]
    fn test_heading_atx() {
        assert_eq!(convert("<h2>Title</h2>"), "## Title");
    }

    #[test]
    fn test_heading_setext() {
        let options = ConvertOptions {
            heading_style: HeadingStyle::Setext,
            ..Default::default()
        };
        let service = DemarkService::with_options(options);
        assert_eq!(service.convert("<h1>Title</h1>").unwrap(), "Title\n=====");
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(convert("<em>emphasized</em>"), "_emphasized_");
    }

    #[test]
    fn test_strong() {
        assert_eq!(convert("<strong>bold</strong>"), "**bold**");
    }

    #[test]
    fn test_flanking_no_doubled_space() {
        assert_eq!(convert("<em>foo</em> bar"), "_foo_ bar");
        assert_eq!(convert("<em>foo </em>bar"), "_foo_ bar");
    }

    #[test]
    fn test_flanking_no_invented_space() {
        assert_eq!(convert("a<em>foo</em>b"), "a_foo_b");
    }

    #[test]
    fn test_comment_elision() {
        assert_eq!(convert("<p>Hi<!-- c --></p>"), "Hi");
    }

    #[test]
    fn test_blank_element_elision() {
        assert_eq!(convert("<p>  \n  </p>"), "");
        assert_eq!(convert("<div><span>   </span></div>"), "");
    }

    #[test]
    fn test_void_elements_are_not_elided() {
        assert_eq!(convert("<hr>"), "* * *");
        assert_eq!(convert("a<br>b"), "a  \nb");
    }

    #[test]
    fn test_blank_anchor_still_renders() {
        assert_eq!(
            convert(r#"<a href="https://example.com"></a>"#),
            "[](https://example.com)"
        );
    }

    #[test]
    fn test_inline_link() {
        assert_eq!(
            convert(r#"<a href="https://example.com">Link</a>"#),
            "[Link](https://example.com)"
        );
    }

    #[test]
    fn test_link_with_title() {
        assert_eq!(
            convert(r#"<a href="/x" title="T">Link</a>"#),
            "[Link](/x \"T\")"
        );
    }

    #[test]
    fn test_image() {
        assert_eq!(convert(r#"<img src="test.png" alt="Alt">"#), "![Alt](test.png)");
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(convert("<code>code</code>"), "`code`");
        assert_eq!(convert("<code>a `b` c</code>"), "``a `b` c``");
    }

    #[test]
    fn test_indented_code_block() {
        assert_eq!(
            convert("<pre><code>function() {}</code></pre>"),
            "    function() {}"
        );
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(
            convert("<blockquote><p>Quote</p></blockquote>"),
            "> Quote"
        );
    }

    #[test]
    fn test_blockquote_multiple_paragraphs() {
        assert_eq!(
            convert("<blockquote><p>a</p><p>b</p></blockquote>"),
            "> a\n> \n> b"
        );
    }

    #[test]
    fn test_bullet_list_marker_option() {
        let mut service = DemarkService::new();
        service.options_mut().bullet_list_marker = '-';
        assert_eq!(
            service.convert("<ul><li>One</li></ul>").unwrap(),
            "-   One"
        );
    }

    #[test]
    fn test_unordered_list() {
        assert_eq!(
            convert("<ul><li>One</li><li>Two</li></ul>"),
            "*   One\n*   Two"
        );
    }

    #[test]
    fn test_ordered_list() {
        assert_eq!(
            convert("<ol><li>One</li><li>Two</li></ol>"),
            "1.  One\n2.  Two"
        );
    }

    #[test]
    fn test_nested_list() {
        assert_eq!(
            convert("<ul><li>a<ul><li>b</li></ul></li></ul>"),
            "*   a\n    *   b"
        );
    }

    #[test]
    fn test_list_marker_escaping() {
        assert_eq!(convert("1. not a list"), "1\\. not a list");
        assert_eq!(convert("<p>10. also text</p>"), "10\\. also text");
    }

    #[test]
    fn test_unknown_inline_tag_passes_content_through() {
        assert_eq!(convert("<custom>hi</custom>"), "hi");
    }

    #[test]
    fn test_unknown_block_tags_keep_separation() {
        assert_eq!(convert("<article>a</article><article>b</article>"), "a\n\nb");
    }

    #[test]
    fn test_unmatched_error_policy() {
        let options = ConvertOptions {
            unmatched: UnmatchedPolicy::Error,
            ..Default::default()
        };
        let service = DemarkService::with_options(options);
        let err = service.convert("<custom>hi</custom>").unwrap_err();
        assert!(matches!(err, Error::UnmatchedElement { tag } if tag == "custom"));
    }

    #[test]
    fn test_custom_rule_precedence() {
        let mut service = DemarkService::new();
        service.add_rule(
            "underline-strong",
            Rule::for_tag("strong", |_, content, _| format!("__{}__", content)),
        );
        assert_eq!(service.convert("<strong>bold</strong>").unwrap(), "__bold__");
    }

    #[test]
    fn test_custom_keep_rule_uses_outer_html() {
        let mut service = DemarkService::new();
        service.add_rule(
            "keep-kbd",
            Rule::new(Filter::tag("kbd"), |node, _, _| node.outer_html()),
        );
        assert_eq!(
            service.convert("press <kbd>Ctrl</kbd>").unwrap(),
            "press <kbd>Ctrl</kbd>"
        );
    }

    #[test]
    fn test_strikethrough_requires_extended() {
        assert_eq!(convert_extended("<del>gone</del>"), "~~gone~~");
        assert_eq!(convert("<del>gone</del>"), "gone");
    }

    #[test]
    fn test_fenced_code_requires_extended() {
        assert_eq!(
            convert_extended("<pre><code class=\"language-rust\">let x = 1;</code></pre>"),
            "```rust\nlet x = 1;\n```"
        );
        assert_eq!(
            convert("<pre><code class=\"language-rust\">let x = 1;</code></pre>"),
            "    let x = 1;"
        );
    }

    #[test]
    fn test_table() {
        let html = "<table><thead><tr><th>A</th><th>B</th></tr></thead>\
                    <tbody><tr><td>1</td><td>2</td></tr></tbody></table>";
        assert_eq!(
            convert_extended(html),
            "| A | B |\n| --- | --- |\n| 1 | 2 |"
        );
    }

    #[test]
    fn test_task_list() {
        assert_eq!(
            convert_extended("<ul><li><input type=\"checkbox\" checked>done</li></ul>"),
            "*   [x] done"
        );
        assert_eq!(
            convert_extended("<ul><li><input type=\"checkbox\">open</li></ul>"),
            "*   [ ] open"
        );
    }

    #[test]
    fn test_normalization_collapses_blank_runs() {
        assert_eq!(
            convert("<p>one</p>\n\n\n<p>two</p>"),
            "one\n\ntwo"
        );
    }
}
