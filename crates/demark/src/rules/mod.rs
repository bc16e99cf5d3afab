//! Rule system for HTML to Markdown conversion.

mod extended;
mod markdown;
mod rule;

pub use extended::extended_rules;
pub use markdown::base_rules;
pub use rule::{Filter, ReplacementFn, Rule};

use indexmap::IndexMap;

use crate::dom::NodeRef;
use crate::service::ConvertOptions;

/// The rule sets a service owns. The precedence-ordered registry used by a
/// conversion call is composed once per call and never mutated mid-traversal.
pub struct Rules {
    /// Caller-supplied rules, keyed by name; insertion order is precedence
    custom_rules: IndexMap<String, Rule>,
    /// Extended-syntax rules (strikethrough, tables, fenced code, tasks)
    extended_rules: Vec<Rule>,
    /// Built-in base rules
    base_rules: Vec<Rule>,
}

impl Rules {
    pub fn new() -> Self {
        Self {
            custom_rules: IndexMap::new(),
            extended_rules: extended_rules(),
            base_rules: base_rules(),
        }
    }

    /// Add a caller rule. Re-using a key replaces that rule in place.
    pub fn add(&mut self, key: &str, rule: Rule) {
        self.custom_rules.insert(key.to_string(), rule);
    }

    /// Compose the registry for one call: caller rules, then extended rules
    /// when enabled, then base rules.
    pub fn compose(&self, extended_syntax: bool) -> Vec<&Rule> {
        let mut registry: Vec<&Rule> = self.custom_rules.values().collect();
        if extended_syntax {
            registry.extend(self.extended_rules.iter());
        }
        registry.extend(self.base_rules.iter());
        registry
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan a composed registry in precedence order; first match wins.
pub fn first_match<'a>(
    registry: &[&'a Rule],
    tag: &str,
    node: &NodeRef,
    options: &ConvertOptions,
) -> Option<&'a Rule> {
    registry
        .iter()
        .copied()
        .find(|rule| rule.filter.matches(tag, node, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;

    #[test]
    fn test_caller_rules_outrank_base() {
        let mut rules = Rules::new();
        rules.add("loud-strong", Rule::for_tag("strong", |_, content, _| {
            format!("!!{}!!", content)
        }));

        let mut dom = Dom::new();
        let strong = dom.create_element("strong");
        dom.append(dom.root(), strong);
        let node = NodeRef::new(&dom, strong);
        let options = ConvertOptions::default();

        let registry = rules.compose(false);
        let rule = first_match(&registry, "strong", &node, &options).unwrap();
        assert_eq!(rule.replace(&node, "x", &options), "!!x!!");
    }

    #[test]
    fn test_extended_layer_is_optional() {
        let rules = Rules::new();
        let mut dom = Dom::new();
        let del = dom.create_element("del");
        dom.append(dom.root(), del);
        let node = NodeRef::new(&dom, del);
        let options = ConvertOptions::default();

        let without = rules.compose(false);
        assert!(first_match(&without, "del", &node, &options).is_none());

        let with = rules.compose(true);
        let rule = first_match(&with, "del", &node, &options).unwrap();
        assert_eq!(rule.replace(&node, "x", &options), "~~x~~");
    }
}
