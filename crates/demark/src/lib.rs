//! # demark
//!
//! Convert HTML fragments to Markdown.
//!
//! demark applies an ordered, extensible set of rewrite rules to a parsed
//! element tree: elements are processed children-first (a reversed
//! breadth-first order), each rule turns an element's aggregated child
//! output into Markdown text, and a final pass normalizes blank lines.
//!
//! ## Design
//!
//! - **Parser agnostic**: the engine works on an arena [`Dom`] any parser
//!   can build; the bundled `scraper` glue sits behind the default-on
//!   `html` feature.
//! - **Layered rules**: caller rules, then the optional extended-syntax
//!   layer (tables, strikethrough, fenced code, task lists), then the base
//!   rules. First match wins.
//! - **Whitespace correct**: a collapse pre-pass and a blank-node
//!   eliminator run before conversion, and inline elements re-emit the
//!   boundary spaces their neighbors don't already provide.
//!
//! ## Example
//!
//! ```rust
//! let markdown = demark::convert("<h1>Title</h1><p>Some <strong>bold</strong> text.</p>").unwrap();
//! assert_eq!(markdown, "# Title\n\nSome **bold** text.");
//! ```
//!
//! ## Example (custom rules)
//!
//! ```rust
//! use demark::{DemarkService, Rule};
//!
//! let mut service = DemarkService::new();
//! service.add_rule("mark", Rule::for_tag("mark", |_, content, _| {
//!     format!("=={}==", content)
//! }));
//!
//! let markdown = service.convert("<p><mark>hi</mark></p>").unwrap();
//! assert_eq!(markdown, "==hi==");
//! ```

mod clean;
pub mod collapse;
pub mod dom;
#[cfg(feature = "html")]
pub mod html;
pub mod rules;
mod service;
mod utilities;

pub use dom::{Dom, NodeId, NodeKind, NodeRef};
#[cfg(feature = "html")]
pub use html::parse_fragment;
pub use rules::{Filter, Rule, Rules};
pub use service::{ConvertOptions, DemarkService, HeadingStyle, UnmatchedPolicy};
pub use utilities::*;

/// Error type for demark operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No rule matched an element and [`UnmatchedPolicy::Error`] is active
    #[error("no converter rule matched element <{tag}>")]
    UnmatchedElement { tag: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convert an HTML fragment to Markdown with default options.
#[cfg(feature = "html")]
pub fn convert(html: &str) -> Result<String> {
    DemarkService::new().convert(html)
}
