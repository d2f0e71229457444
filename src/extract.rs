//! Translatable text leaves of hierarchical structures.
//!
//! Works over any [`TextTree`]: rendered UI trees ([`RenderNode`]) and plain
//! nested data such as questionnaire definitions (`serde_json::Value`).
//! Extraction is lazy, pre-order and yields each distinct non-blank leaf once.

use std::collections::{BTreeMap, HashSet};
use std::iter;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Config, ExtractConfig};

/// Which nodes and keys are not translatable.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    excluded_tags: HashSet<String>,
    opt_out_class: String,
    opt_out_attribute: String,
    translatable_attributes: Vec<String>,
    opt_out_key: String,
    identifier_keys: HashSet<String>,
}

impl From<&ExtractConfig> for ExclusionRules {
    fn from(config: &ExtractConfig) -> Self {
        Self {
            excluded_tags: config.excluded_tags.iter().map(|t| t.to_lowercase()).collect(),
            opt_out_class: config.opt_out_class.clone(),
            opt_out_attribute: config.opt_out_attribute.clone(),
            translatable_attributes: config.translatable_attributes.clone(),
            opt_out_key: config.opt_out_key.clone(),
            identifier_keys: config.identifier_keys.iter().cloned().collect(),
        }
    }
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self::from(&Config::default().extract)
    }
}

/// A structure whose string leaves can be read and rewritten.
pub trait TextTree {
    /// True when this node and its whole subtree must be left alone.
    fn is_excluded(&self, rules: &ExclusionRules) -> bool;

    /// Leaves carried by this node itself.
    fn own_texts<'a>(&'a self, rules: &'a ExclusionRules) -> Box<dyn Iterator<Item = &'a str> + 'a>;

    fn child_nodes<'a>(&'a self, rules: &'a ExclusionRules) -> Box<dyn Iterator<Item = &'a Self> + 'a>;

    /// Replace every non-excluded leaf for which `f` returns a value.
    /// Returns the number of leaves changed.
    fn rewrite_texts(&mut self, rules: &ExclusionRules, f: &mut dyn FnMut(&str) -> Option<String>) -> usize;
}

/// Lazy iterator over the distinct text leaves of a tree.
pub struct TextLeaves<'a, T: TextTree> {
    rules: &'a ExclusionRules,
    stack: Vec<Box<dyn Iterator<Item = &'a T> + 'a>>,
    pending: Option<Box<dyn Iterator<Item = &'a str> + 'a>>,
    seen: HashSet<&'a str>,
}

pub fn extract<'a, T: TextTree>(tree: &'a T, rules: &'a ExclusionRules) -> TextLeaves<'a, T> {
    TextLeaves {
        rules,
        stack: vec![Box::new(iter::once(tree))],
        pending: None,
        seen: HashSet::new(),
    }
}

impl<'a, T: TextTree> Iterator for TextLeaves<'a, T> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            if let Some(texts) = self.pending.as_mut() {
                for text in texts.by_ref() {
                    if !text.trim().is_empty() && self.seen.insert(text) {
                        return Some(text);
                    }
                }
                self.pending = None;
            }

            let siblings = self.stack.last_mut()?;
            match siblings.next() {
                None => {
                    self.stack.pop();
                }
                Some(node) if node.is_excluded(self.rules) => {}
                Some(node) => {
                    self.pending = Some(node.own_texts(self.rules));
                    self.stack.push(node.child_nodes(self.rules));
                }
            }
        }
    }
}

/// Element/text tree as produced by the survey front end's renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderNode {
    Element {
        tag: String,
        #[serde(default)]
        attributes: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<RenderNode>,
    },
    Text(String),
}

impl RenderNode {
    pub fn element(tag: &str) -> Self {
        RenderNode::Element {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: &str) -> Self {
        RenderNode::Text(text.to_string())
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let RenderNode::Element { attributes, .. } = &mut self {
            attributes.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn child(mut self, node: RenderNode) -> Self {
        if let RenderNode::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            RenderNode::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            RenderNode::Text(_) => None,
        }
    }
}

impl TextTree for RenderNode {
    fn is_excluded(&self, rules: &ExclusionRules) -> bool {
        let RenderNode::Element { tag, attributes, .. } = self else {
            return false;
        };
        rules.excluded_tags.contains(&tag.to_lowercase())
            || attributes.contains_key(&rules.opt_out_attribute)
            || attributes
                .get("translate")
                .is_some_and(|v| v.eq_ignore_ascii_case("no"))
            || attributes
                .get("class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == rules.opt_out_class))
    }

    fn own_texts<'a>(&'a self, rules: &'a ExclusionRules) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        match self {
            RenderNode::Text(text) => Box::new(iter::once(text.as_str())),
            RenderNode::Element { attributes, .. } => Box::new(
                rules
                    .translatable_attributes
                    .iter()
                    .filter_map(move |name| attributes.get(name).map(String::as_str)),
            ),
        }
    }

    fn child_nodes<'a>(&'a self, _rules: &'a ExclusionRules) -> Box<dyn Iterator<Item = &'a Self> + 'a> {
        match self {
            RenderNode::Element { children, .. } => Box::new(children.iter()),
            RenderNode::Text(_) => Box::new(iter::empty()),
        }
    }

    fn rewrite_texts(&mut self, rules: &ExclusionRules, f: &mut dyn FnMut(&str) -> Option<String>) -> usize {
        if self.is_excluded(rules) {
            return 0;
        }
        match self {
            RenderNode::Text(text) => replace_leaf(text, f),
            RenderNode::Element { attributes, children, .. } => {
                let mut changed = 0;
                for name in &rules.translatable_attributes {
                    if let Some(value) = attributes.get_mut(name) {
                        changed += replace_leaf(value, f);
                    }
                }
                for child in children {
                    changed += child.rewrite_texts(rules, f);
                }
                changed
            }
        }
    }
}

impl TextTree for Value {
    fn is_excluded(&self, rules: &ExclusionRules) -> bool {
        matches!(self, Value::Object(map) if map.get(&rules.opt_out_key) == Some(&Value::Bool(true)))
    }

    fn own_texts<'a>(&'a self, _rules: &'a ExclusionRules) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        match self {
            Value::String(text) => Box::new(iter::once(text.as_str())),
            _ => Box::new(iter::empty()),
        }
    }

    fn child_nodes<'a>(&'a self, rules: &'a ExclusionRules) -> Box<dyn Iterator<Item = &'a Self> + 'a> {
        match self {
            Value::Array(items) => Box::new(items.iter()),
            Value::Object(map) => Box::new(
                map.iter()
                    .filter(move |(key, _)| is_text_key(rules, key))
                    .map(|(_, value)| value),
            ),
            _ => Box::new(iter::empty()),
        }
    }

    fn rewrite_texts(&mut self, rules: &ExclusionRules, f: &mut dyn FnMut(&str) -> Option<String>) -> usize {
        if self.is_excluded(rules) {
            return 0;
        }
        match self {
            Value::String(text) => replace_leaf(text, f),
            Value::Array(items) => items.iter_mut().map(|item| item.rewrite_texts(rules, f)).sum(),
            Value::Object(map) => map
                .iter_mut()
                .filter(|(key, _)| is_text_key(rules, key))
                .map(|(_, value)| value.rewrite_texts(rules, f))
                .sum(),
            _ => 0,
        }
    }
}

fn is_text_key(rules: &ExclusionRules, key: &str) -> bool {
    key != rules.opt_out_key && !rules.identifier_keys.contains(key)
}

fn replace_leaf(leaf: &mut String, f: &mut dyn FnMut(&str) -> Option<String>) -> usize {
    if leaf.trim().is_empty() {
        return 0;
    }
    match f(leaf) {
        Some(new) if new != *leaf => {
            *leaf = new;
            1
        }
        _ => 0,
    }
}
