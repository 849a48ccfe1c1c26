//! Event-driven YAML parser that builds a located [`Node`] tree.

use std::path::Path;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use super::node::{Layout, Mapping, Node, Origin, Scalar, ScalarKind, ScalarStyle};
use crate::error::{CoreError, Result};

/// Parse the first document of `source`.
///
/// Returns `None` when the stream holds no document (empty file, comments only).
pub(crate) fn parse(source: &str, path: Option<&Path>) -> Result<Option<Node>> {
    let mut parser = Parser::new_from_str(source);
    let mut builder = TreeBuilder::new(source);

    parser
        .load(&mut builder, false)
        .map_err(|err| CoreError::Parse {
            path: path.map(Path::to_path_buf),
            message: err.info().to_string(),
            line: err.marker().line(),
            col: err.marker().col() + 1,
        })?;

    Ok(builder.root)
}

/// A collection under construction.
enum Frame {
    Sequence(Vec<Node>),
    Mapping {
        mapping: Mapping,
        key: Option<Key>,
    },
}

enum Key {
    Text(String),
    /// Mapping or sequence used as a key; its entry is not modelled
    Complex,
}

struct TreeBuilder<'a> {
    source: &'a str,
    /// Byte offset of every char, only needed for non-ASCII input
    char_starts: Option<Vec<usize>>,
    stack: Vec<Frame>,
    root: Option<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        let char_starts = if source.is_ascii() {
            None
        } else {
            Some(source.char_indices().map(|(i, _)| i).collect())
        };
        Self {
            source,
            char_starts,
            stack: Vec::new(),
            root: None,
        }
    }

    /// Convert a marker's char index into a byte offset.
    fn byte_offset(&self, marker: &Marker) -> usize {
        match &self.char_starts {
            None => marker.index(),
            Some(starts) => starts
                .get(marker.index())
                .copied()
                .unwrap_or(self.source.len()),
        }
    }

    fn push_complete(&mut self, node: Node) {
        let Some(frame) = self.stack.last_mut() else {
            if self.root.is_none() {
                self.root = Some(node);
            }
            return;
        };

        match frame {
            Frame::Sequence(items) => items.push(node),
            Frame::Mapping { mapping, key } => match key.take() {
                None => {
                    *key = Some(match node {
                        Node::Scalar(scalar) => Key::Text(scalar.value().to_string()),
                        _ => Key::Complex,
                    });
                }
                Some(Key::Text(k)) => mapping.insert(k, node),
                Some(Key::Complex) => {
                    tracing::warn!(
                        line = mapping.line(),
                        "skipping mapping entry with a non-scalar key"
                    );
                }
            },
        }
    }

    fn scalar(&self, value: String, style: TScalarStyle, tag: Option<Tag>, marker: &Marker) -> Scalar {
        let start = self.byte_offset(marker);
        let style = match style {
            TScalarStyle::Plain => ScalarStyle::Plain,
            TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
            TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
            _ => ScalarStyle::Block,
        };

        let tagged_str = tag.as_ref().is_some_and(|t| t.suffix == "str");
        let kind = if style == ScalarStyle::Plain && !tagged_str {
            resolve_plain(&value)
        } else {
            ScalarKind::String
        };

        let origin = locate(self.source, start, style, &value);
        Scalar::parsed(value, kind, style, marker.line(), origin)
    }
}

impl MarkedEventReceiver for TreeBuilder<'_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        match ev {
            Event::Scalar(value, style, _anchor_id, tag) => {
                let scalar = self.scalar(value, style, tag, &marker);
                self.push_complete(Node::Scalar(scalar));
            }

            Event::SequenceStart(_anchor_id, _tag) => {
                self.stack.push(Frame::Sequence(Vec::new()));
            }

            Event::SequenceEnd => {
                if let Some(Frame::Sequence(items)) = self.stack.pop() {
                    self.push_complete(Node::Sequence(items));
                }
            }

            Event::MappingStart(_anchor_id, _tag) => {
                let start = self.byte_offset(&marker);
                let layout = if self.source.get(start..).is_some_and(|s| s.starts_with('{')) {
                    Layout::Flow
                } else {
                    Layout::Block
                };
                self.stack.push(Frame::Mapping {
                    mapping: Mapping::new(layout, marker.line()),
                    key: None,
                });
            }

            Event::MappingEnd => {
                if let Some(Frame::Mapping { mapping, .. }) = self.stack.pop() {
                    self.push_complete(Node::Mapping(mapping));
                }
            }

            Event::Alias(_anchor_id) => self.push_complete(Node::Alias),

            _ => {}
        }
    }
}

/// Find the exact source extent of a scalar starting at byte `start`.
///
/// Plain scalars are located only when they span a single line; block
/// scalars are never located.
fn locate(source: &str, start: usize, style: ScalarStyle, value: &str) -> Origin {
    let Some(rest) = source.get(start..) else {
        return Origin::Unlocated;
    };
    let bytes = rest.as_bytes();

    let end = match style {
        ScalarStyle::Plain => {
            if value.is_empty() || value.contains('\n') || !rest.starts_with(value) {
                return Origin::Unlocated;
            }
            Some(value.len())
        }
        ScalarStyle::SingleQuoted => {
            if bytes.first() != Some(&b'\'') {
                return Origin::Unlocated;
            }
            let mut i = 1;
            let mut end = None;
            while i < bytes.len() {
                if bytes[i] == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 2;
                        continue;
                    }
                    end = Some(i + 1);
                    break;
                }
                i += 1;
            }
            end
        }
        ScalarStyle::DoubleQuoted => {
            if bytes.first() != Some(&b'"') {
                return Origin::Unlocated;
            }
            let mut i = 1;
            let mut end = None;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 2,
                    b'"' => {
                        end = Some(i + 1);
                        break;
                    }
                    _ => i += 1,
                }
            }
            end
        }
        ScalarStyle::Block => None,
    };

    match end {
        Some(len) => Origin::Source(start..start + len),
        None => Origin::Unlocated,
    }
}

/// Resolve the type of a plain scalar per the YAML 1.2 core schema.
pub(crate) fn resolve_plain(value: &str) -> ScalarKind {
    match value {
        "" | "~" | "null" | "Null" | "NULL" => ScalarKind::Null,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => ScalarKind::Bool,
        _ if is_int(value) => ScalarKind::Int,
        _ if is_float(value) => ScalarKind::Float,
        _ => ScalarKind::String,
    }
}

fn all_digits(s: &str, radix: u32) -> bool {
    s.chars().all(|c| c.is_digit(radix))
}

fn is_int(value: &str) -> bool {
    if let Some(octal) = value.strip_prefix("0o") {
        return !octal.is_empty() && all_digits(octal, 8);
    }
    if let Some(hex) = value.strip_prefix("0x") {
        return !hex.is_empty() && all_digits(hex, 16);
    }
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    !digits.is_empty() && all_digits(digits, 10)
}

fn is_float(value: &str) -> bool {
    if matches!(value, ".nan" | ".NaN" | ".NAN") {
        return true;
    }
    let unsigned = value.strip_prefix(['-', '+']).unwrap_or(value);
    if matches!(unsigned, ".inf" | ".Inf" | ".INF") {
        return true;
    }

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(i) => (&unsigned[..i], Some(&unsigned[i + 1..])),
        None => (unsigned, None),
    };

    let mantissa_ok = match mantissa.split_once('.') {
        Some(("", frac)) => !frac.is_empty() && all_digits(frac, 10),
        Some((int, frac)) => all_digits(int, 10) && all_digits(frac, 10),
        None => !mantissa.is_empty() && all_digits(mantissa, 10),
    };
    let exponent_ok = match exponent {
        None => true,
        Some(exp) => {
            let digits = exp.strip_prefix(['-', '+']).unwrap_or(exp);
            !digits.is_empty() && all_digits(digits, 10)
        }
    };

    mantissa_ok && exponent_ok
}
