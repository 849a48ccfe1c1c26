//! Write a modified tree back over its original source text.

use std::ops::Range;

use super::QuoteStyle;
use super::node::{Layout, Node, Origin, Scalar, ScalarKind, ScalarStyle};
use super::parser::resolve_plain;
use crate::error::{CoreError, Result};

#[derive(Default)]
struct Edits {
    /// In-place replacements of located scalars
    splices: Vec<(Range<usize>, String)>,
    /// `key: value` lines appended to the root mapping
    appended: Vec<String>,
}

/// Render `root` over `source`, touching only modified scalars.
pub(crate) fn render(source: &str, root: Option<&Node>, quote: QuoteStyle) -> Result<String> {
    let mut edits = Edits::default();
    if let Some(root) = root {
        collect(root, true, quote, &mut edits)?;
    }

    let mut out = source.to_string();
    edits.splices.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));
    for (range, text) in edits.splices {
        tracing::trace!(?range, %text, "splicing scalar");
        out.replace_range(range, &text);
    }

    if !edits.appended.is_empty() {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        for line in edits.appended {
            out.push_str(&line);
            out.push('\n');
        }
    }

    Ok(out)
}

fn collect(node: &Node, is_root: bool, quote: QuoteStyle, edits: &mut Edits) -> Result<()> {
    match node {
        Node::Scalar(scalar) => splice(scalar, quote, edits),
        Node::Mapping(mapping) => {
            for (key, value) in mapping.iter() {
                match value {
                    Node::Scalar(scalar) if scalar.is_inserted() => {
                        if !is_root || mapping.layout() == Layout::Flow {
                            return Err(CoreError::UnsupportedEdit {
                                line: mapping.line(),
                                reason: format!(
                                    "new key '{}' can only be added to a block mapping at the document root",
                                    key
                                ),
                            });
                        }
                        edits.appended.push(format!(
                            "{}: {}",
                            encode(key, ScalarStyle::Plain, quote),
                            encode(scalar.value(), ScalarStyle::Plain, quote)
                        ));
                    }
                    _ => collect(value, false, quote, edits)?,
                }
            }
            Ok(())
        }
        Node::Sequence(items) => items
            .iter()
            .try_for_each(|item| collect(item, false, quote, edits)),
        Node::Alias => Ok(()),
    }
}

fn splice(scalar: &Scalar, quote: QuoteStyle, edits: &mut Edits) -> Result<()> {
    if !scalar.is_modified() {
        return Ok(());
    }
    match &scalar.origin {
        Origin::Source(range) => {
            edits
                .splices
                .push((range.clone(), encode(scalar.value(), scalar.style(), quote)));
            Ok(())
        }
        _ => Err(CoreError::UnsupportedEdit {
            line: scalar.line(),
            reason: "only single-line plain or quoted scalars can be rewritten".to_string(),
        }),
    }
}

/// Encode a string value, keeping the original quoting where possible.
fn encode(value: &str, style: ScalarStyle, quote: QuoteStyle) -> String {
    match style {
        ScalarStyle::SingleQuoted => single_quoted(value),
        ScalarStyle::DoubleQuoted => double_quoted(value),
        ScalarStyle::Plain | ScalarStyle::Block => {
            if is_plain_safe(value) {
                value.to_string()
            } else {
                match quote {
                    QuoteStyle::Double => double_quoted(value),
                    QuoteStyle::Single => single_quoted(value),
                }
            }
        }
    }
}

/// Whether `value` can be written unquoted and still read back as that string.
fn is_plain_safe(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if value.trim() != value || resolve_plain(value) != ScalarKind::String {
        return false;
    }
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return false;
    }
    if value.contains(": ") || value.contains(" #") || value.ends_with(':') {
        return false;
    }
    !value
        .chars()
        .any(|c| c.is_control() || matches!(c, ',' | '[' | ']' | '{' | '}'))
}

fn single_quoted(value: &str) -> String {
    if value.chars().any(char::is_control) {
        return double_quoted(value);
    }
    format!("'{}'", value.replace('\'', "''"))
}

fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
