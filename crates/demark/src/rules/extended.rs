//! Extended-syntax rules: strikethrough, tables, fenced code blocks and
//! task-list items. Composed ahead of the base rules when
//! `extended_syntax` is enabled, so the fenced code rule outranks the
//! indented one.

use super::{Filter, Rule};
use crate::dom::NodeRef;

pub fn extended_rules() -> Vec<Rule> {
    vec![
        fenced_code_block_rule(),
        strikethrough_rule(),
        task_list_item_rule(),
        table_cell_rule(),
        table_row_rule(),
        table_rule(),
        table_section_rule(),
    ]
}

fn fenced_code_block_rule() -> Rule {
    Rule::new(
        Filter::predicate(|tag, node, _| {
            tag == "pre" && node.element_children().any(|c| c.tag_name() == "code")
        }),
        |node, _, options| {
            let code_node = node.element_children().find(|c| c.tag_name() == "code");

            let code_node = match code_node {
                Some(c) => c,
                None => return String::new(),
            };

            let code_content = code_node.text_content();

            // Extract language from class
            let class = code_node.attr("class").unwrap_or("");
            let language = class
                .split_whitespace()
                .find(|c| c.starts_with("language-"))
                .map(|c| &c[9..])
                .unwrap_or("");

            let fence = &options.fence;
            format!(
                "\n\n{}{}\n{}\n{}\n\n",
                fence,
                language,
                code_content.trim_end(),
                fence
            )
        },
    )
}

fn strikethrough_rule() -> Rule {
    Rule::new(Filter::tags(&["del", "s", "strike"]), |_, content, _| {
        format!("~~{}~~", content)
    })
}

fn task_list_item_rule() -> Rule {
    Rule::new(
        Filter::predicate(|tag, node, _| {
            tag == "input"
                && node.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox"))
                && node.parent_tag() == Some("li")
        }),
        |node, _, _| {
            if node.has_attr("checked") {
                "[x] ".to_string()
            } else {
                "[ ] ".to_string()
            }
        },
    )
}

/// Render one table cell, opening the row when the cell is first.
fn cell(content: &str, index: usize) -> String {
    let prefix = if index == 0 { "| " } else { " " };
    format!("{}{} |", prefix, content)
}

fn table_cell_rule() -> Rule {
    Rule::new(Filter::tags(&["th", "td"]), |node, content, _| {
        cell(content.trim(), node.element_index())
    })
}

fn table_row_rule() -> Rule {
    Rule::for_tag("tr", |node, content, _| {
        let mut border = String::new();
        if is_heading_row(node) {
            for header in node.element_children() {
                let marker = match header.attr("align").map(str::to_lowercase).as_deref() {
                    Some("left") => ":--",
                    Some("right") => "--:",
                    Some("center") => ":-:",
                    _ => "---",
                };
                border.push_str(&cell(marker, header.element_index()));
            }
        }
        if border.is_empty() {
            format!("\n{}", content)
        } else {
            format!("\n{}\n{}", content, border)
        }
    })
}

fn table_rule() -> Rule {
    Rule::for_tag("table", |_, content, _| format!("\n\n{}\n\n", content.trim_matches('\n')))
}

fn table_section_rule() -> Rule {
    Rule::new(Filter::tags(&["thead", "tbody", "tfoot"]), |_, content, _| {
        content.to_string()
    })
}

/// A row is a heading row when it lives in `thead`, or when it is the first
/// row of the table (or of its first `tbody`) and every cell is a `th`.
fn is_heading_row(tr: &NodeRef) -> bool {
    let Some(parent) = tr.parent() else {
        return false;
    };
    if parent.tag_name() == "thead" {
        return true;
    }

    let is_first_row = parent
        .first_element_child()
        .map(|n| n.id() == tr.id())
        .unwrap_or(false);
    let parent_hosts_rows = parent.tag_name() == "table"
        || (parent.tag_name() == "tbody" && parent.element_index() == 0);
    let mut cells = tr.element_children().peekable();
    let all_header_cells = cells.peek().is_some() && cells.all(|c| c.tag_name() == "th");

    is_first_row && parent_hosts_rows && all_header_cells
}
