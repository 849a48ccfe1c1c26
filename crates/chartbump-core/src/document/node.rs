//! In-memory YAML tree
//!
//! Nodes remember where their scalars came from in the source text so that a
//! document can be written back by splicing only the values that changed.

use indexmap::IndexMap;
use std::ops::Range;

use crate::error::{CoreError, Result};

/// Resolved type of a scalar (YAML 1.2 core schema)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Null,
    Bool,
    Int,
    Float,
}

/// How a scalar was written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// Literal (`|`) or folded (`>`) block scalar
    Block,
}

/// Layout of a mapping in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Block,
    Flow,
}

/// Where a scalar's text lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Exact byte range of the scalar (quotes included)
    Source(Range<usize>),
    /// Parsed, but its extent could not be located exactly
    Unlocated,
    /// Created in memory, not present in the source
    Inserted,
}

/// A scalar value together with its source metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    value: String,
    kind: ScalarKind,
    style: ScalarStyle,
    line: usize,
    pub(crate) origin: Origin,
    modified: bool,
}

impl Scalar {
    pub(crate) fn parsed(
        value: String,
        kind: ScalarKind,
        style: ScalarStyle,
        line: usize,
        origin: Origin,
    ) -> Self {
        Self {
            value,
            kind,
            style,
            line,
            origin,
            modified: false,
        }
    }

    pub(crate) fn inserted(value: String, line: usize) -> Self {
        Self {
            value,
            kind: ScalarKind::String,
            style: ScalarStyle::Plain,
            line,
            origin: Origin::Inserted,
            modified: true,
        }
    }

    /// Decoded text of the scalar, whatever its kind
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn style(&self) -> ScalarStyle {
        self.style
    }

    /// Line (1-based) the scalar starts on
    pub fn line(&self) -> usize {
        self.line
    }

    /// The value, if this scalar is a string
    pub fn as_str(&self) -> Option<&str> {
        match self.kind {
            ScalarKind::String => Some(&self.value),
            _ => None,
        }
    }

    /// Whether the value differs from what was parsed
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_inserted(&self) -> bool {
        self.origin == Origin::Inserted
    }

    /// Replace the value with a string
    ///
    /// Setting the value it already holds is a no-op.
    pub fn set(&mut self, value: impl Into<String>) {
        let value = value.into();
        if self.kind == ScalarKind::String && self.value == value {
            return;
        }
        self.value = value;
        self.kind = ScalarKind::String;
        self.modified = true;
    }
}

/// An ordered mapping with string keys
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    entries: IndexMap<String, Node>,
    layout: Layout,
    line: usize,
}

impl Mapping {
    pub(crate) fn new(layout: Layout, line: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            layout,
            line,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Line (1-based) the mapping starts on
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries.get_mut(key)
    }

    /// String value stored under `key`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Node::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Node)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn insert(&mut self, key: String, node: Node) {
        self.entries.insert(key, node);
    }

    /// Set `key` to a string value, appending the key when absent
    ///
    /// Returns whether anything changed.
    pub fn set_str(&mut self, key: &str, value: &str) -> Result<bool> {
        match self.entries.get_mut(key) {
            Some(Node::Scalar(scalar)) => {
                if scalar.as_str() == Some(value) {
                    return Ok(false);
                }
                scalar.set(value);
                Ok(true)
            }
            Some(_) => Err(CoreError::NotAScalar {
                key: key.to_string(),
            }),
            None => {
                let scalar = Scalar::inserted(value.to_string(), self.line);
                self.entries.insert(key.to_string(), Node::Scalar(scalar));
                Ok(true)
            }
        }
    }
}

/// A node of the YAML tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Vec<Node>),
    Scalar(Scalar),
    /// Reference to an anchor; never followed
    Alias,
}

impl Node {
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// The value, if this node is a string scalar
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// Whether any scalar below this node was changed or inserted
    pub fn is_modified(&self) -> bool {
        match self {
            Node::Scalar(s) => s.is_modified(),
            Node::Mapping(m) => m.entries.values().any(Node::is_modified),
            Node::Sequence(items) => items.iter().any(Node::is_modified),
            Node::Alias => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(value: &str, kind: ScalarKind) -> Scalar {
        Scalar::parsed(
            value.to_string(),
            kind,
            ScalarStyle::Plain,
            1,
            Origin::Source(0..value.len()),
        )
    }

    #[test]
    fn test_as_str_only_for_strings() {
        assert_eq!(plain("nginx", ScalarKind::String).as_str(), Some("nginx"));
        assert_eq!(plain("1.0", ScalarKind::Float).as_str(), None);
        assert_eq!(plain("", ScalarKind::Null).as_str(), None);
    }

    #[test]
    fn test_set_same_value_is_noop() {
        let mut scalar = plain("1.0.0", ScalarKind::String);
        scalar.set("1.0.0");
        assert!(!scalar.is_modified());

        scalar.set("1.1.0");
        assert!(scalar.is_modified());
        assert_eq!(scalar.as_str(), Some("1.1.0"));
    }

    #[test]
    fn test_set_retypes_to_string() {
        let mut scalar = plain("1.0", ScalarKind::Float);
        scalar.set("1.0");
        assert!(scalar.is_modified());
        assert_eq!(scalar.kind(), ScalarKind::String);
    }

    #[test]
    fn test_set_str_appends_missing_key() {
        let mut mapping = Mapping::new(Layout::Block, 1);
        mapping.insert(
            "name".to_string(),
            Node::Scalar(plain("demo", ScalarKind::String)),
        );

        assert!(mapping.set_str("version", "0.2.0").unwrap());
        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["name", "version"]);
        assert!(mapping.get("version").unwrap().as_scalar().unwrap().is_inserted());
    }

    #[test]
    fn test_set_str_rejects_nested_value() {
        let mut mapping = Mapping::new(Layout::Block, 1);
        mapping.insert(
            "version".to_string(),
            Node::Mapping(Mapping::new(Layout::Block, 2)),
        );

        let err = mapping.set_str("version", "1.0.0").unwrap_err();
        assert!(matches!(err, CoreError::NotAScalar { ref key } if key == "version"));
    }

    #[test]
    fn test_is_modified_propagates() {
        let mut inner = Mapping::new(Layout::Block, 2);
        inner.insert(
            "tag".to_string(),
            Node::Scalar(plain("1.0", ScalarKind::String)),
        );
        let mut root = Mapping::new(Layout::Block, 1);
        root.insert("image".to_string(), Node::Mapping(inner));
        let mut node = Node::Mapping(root);
        assert!(!node.is_modified());

        node.as_mapping_mut()
            .and_then(|m| m.get_mut("image"))
            .and_then(Node::as_mapping_mut)
            .unwrap()
            .set_str("tag", "2.0")
            .unwrap();
        assert!(node.is_modified());
    }
}
