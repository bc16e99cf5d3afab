//! Base Markdown rules for HTML to Markdown conversion.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Filter, Rule};
use crate::service::HeadingStyle;
use crate::utilities::{clean_attribute, repeat};

static BLANK_LINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Create the base rule set, in documentation order. Tags are disjoint
/// except for the trailing block catch-all, so ordering here carries no
/// precedence weight of its own.
pub fn base_rules() -> Vec<Rule> {
    vec![
        paragraph_rule(),
        line_break_rule(),
        heading_rule(),
        blockquote_rule(),
        list_rule(),
        list_item_rule(),
        indented_code_block_rule(),
        horizontal_rule(),
        link_rule(),
        emphasis_rule(),
        strong_rule(),
        code_rule(),
        image_rule(),
        block_default_rule(),
    ]
}

fn paragraph_rule() -> Rule {
    Rule::for_tag("p", |_, content, _| format!("\n\n{}\n\n", content.trim()))
}

fn line_break_rule() -> Rule {
    Rule::for_tag("br", |_, _, _| "  \n".to_string())
}

fn heading_rule() -> Rule {
    Rule::new(
        Filter::tags(&["h1", "h2", "h3", "h4", "h5", "h6"]),
        |node, content, options| {
            let tag = node.tag_name();
            let level: usize = tag[1..].parse().unwrap_or(1);

            let content = content.trim();
            if content.is_empty() {
                return String::new();
            }

            match options.heading_style {
                HeadingStyle::Setext if level <= 2 => {
                    let underline = if level == 1 { "=" } else { "-" };
                    format!("\n\n{}\n{}\n\n", content, repeat(underline, content.len()))
                }
                _ => {
                    format!("\n\n{} {}\n\n", repeat("#", level), content)
                }
            }
        },
    )
}

fn blockquote_rule() -> Rule {
    Rule::for_tag("blockquote", |_, content, _| {
        let content = BLANK_LINE_RUNS.replace_all(content.trim(), "\n\n");
        if content.is_empty() {
            return String::new();
        }
        let quoted: Vec<String> = content.lines().map(|line| format!("> {}", line)).collect();
        format!("\n\n{}\n\n", quoted.join("\n"))
    })
}

fn list_rule() -> Rule {
    Rule::new(Filter::tags(&["ul", "ol"]), |node, content, _| {
        let content = content.trim();

        // A list nested in a list item joins its parent item's lines
        let is_nested = node.parent_tag().map(|t| t == "li").unwrap_or(false);

        if is_nested {
            format!("\n{}", content)
        } else {
            format!("\n\n{}\n\n", content)
        }
    })
}

fn list_item_rule() -> Rule {
    Rule::for_tag("li", |node, content, options| {
        let content = content
            .trim()
            .replace("\n\n\n", "\n\n")
            .replace('\n', "\n    "); // Indent continuation lines

        let is_ordered = node.parent_tag().map(|t| t == "ol").unwrap_or(false);

        let prefix = if is_ordered {
            format!("{}.  ", node.element_index() + 1)
        } else {
            format!("{}   ", options.bullet_list_marker)
        };

        format!("{}{}\n", prefix, content)
    })
}

fn indented_code_block_rule() -> Rule {
    Rule::new(
        Filter::predicate(|tag, node, _| {
            tag == "pre" && node.element_children().any(|c| c.tag_name() == "code")
        }),
        |node, _, _| {
            let code_content: String = node
                .element_children()
                .find(|c| c.tag_name() == "code")
                .map(|c| c.text_content())
                .unwrap_or_default();

            let indented: Vec<String> = code_content
                .trim_end_matches('\n')
                .lines()
                .map(|line| format!("    {}", line))
                .collect();

            format!("\n\n{}\n\n", indented.join("\n"))
        },
    )
}

fn horizontal_rule() -> Rule {
    Rule::for_tag("hr", |_, _, options| format!("\n\n{}\n\n", options.hr))
}

fn link_rule() -> Rule {
    Rule::new(
        Filter::predicate(|tag, node, _| tag == "a" && node.attr("href").is_some()),
        |node, content, _| {
            let href = clean_attribute(node.attr("href"));
            let title = node.attr("title");

            if href.is_empty() && title.is_none() {
                return content.to_string();
            }

            let title_part = title.map(|t| format!(" \"{}\"", t)).unwrap_or_default();

            format!("[{}]({}{})", content, href, title_part)
        },
    )
}

fn emphasis_rule() -> Rule {
    Rule::new(Filter::tags(&["em", "i"]), |_, content, options| {
        if content.trim().is_empty() {
            return String::new();
        }
        let delimiter = options.em_delimiter;
        format!("{}{}{}", delimiter, content, delimiter)
    })
}

fn strong_rule() -> Rule {
    Rule::new(Filter::tags(&["strong", "b"]), |_, content, options| {
        if content.trim().is_empty() {
            return String::new();
        }
        let delimiter = &options.strong_delimiter;
        format!("{}{}{}", delimiter, content, delimiter)
    })
}

fn code_rule() -> Rule {
    Rule::new(
        Filter::predicate(|tag, node, _| {
            // Inline <code> only; <pre><code> belongs to the block rules
            tag == "code" && node.parent_tag().map(|t| t != "pre").unwrap_or(true)
        }),
        |node, _, _| {
            let content = node.text_content();
            if content.is_empty() {
                return String::new();
            }

            // The delimiter must be one backtick longer than any run inside
            let max_consecutive_backticks = content
                .chars()
                .fold((0usize, 0usize), |(max, current), c| {
                    if c == '`' {
                        (max.max(current + 1), current + 1)
                    } else {
                        (max, 0)
                    }
                })
                .0;

            let backticks = "`".repeat((max_consecutive_backticks + 1).max(1));

            let needs_space = content.starts_with('`')
                || content.ends_with('`')
                || content.starts_with(' ')
                || content.ends_with(' ');

            if needs_space && max_consecutive_backticks > 0 {
                format!("{} {} {}", backticks, content, backticks)
            } else {
                format!("{}{}{}", backticks, content, backticks)
            }
        },
    )
}

fn image_rule() -> Rule {
    Rule::for_tag("img", |node, _, _| {
        let alt = clean_attribute(node.attr("alt"));
        let src = clean_attribute(node.attr("src"));
        let title = node.attr("title");

        if src.is_empty() {
            return String::new();
        }

        let title_part = title.map(|t| format!(" \"{}\"", t)).unwrap_or_default();

        format!("![{}]({}{})", alt, src, title_part)
    })
}

/// Unknown block-level tags keep their paragraph separation even though the
/// tag itself is dropped.
fn block_default_rule() -> Rule {
    Rule::new(
        Filter::predicate(|_, node, _| node.is_block()),
        |_, content, _| format!("\n\n{}\n\n", content.trim()),
    )
}
