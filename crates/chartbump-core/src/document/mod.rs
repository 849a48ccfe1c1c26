//! Comment-preserving YAML documents
//!
//! A [`DocumentProcessor`] loads a file into a [`Document`]: the original text
//! plus an ordered tree whose scalars know their exact source location. Saving
//! splices only the scalars that changed back into the original text, so key
//! order, comments, indentation and quoting of every other node survive
//! byte-for-byte.
//!
//! # Example
//!
//! ```rust
//! use chartbump_core::DocumentProcessor;
//!
//! let processor = DocumentProcessor::new();
//! let mut doc = processor.parse("# chart\nversion: 1.0.0 # current\n").unwrap();
//! doc.root_mapping_mut().unwrap().set_str("version", "1.1.0").unwrap();
//!
//! assert_eq!(processor.render(&doc).unwrap(), "# chart\nversion: 1.1.0 # current\n");
//! ```

mod node;
mod parser;
mod render;

pub use node::{Layout, Mapping, Node, Scalar, ScalarKind, ScalarStyle};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Quote style used when a rewritten plain value needs quoting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    #[default]
    Double,
    Single,
}

/// Options for a [`DocumentProcessor`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessorOptions {
    #[serde(default)]
    pub quote: QuoteStyle,
}

/// A parsed YAML document tied to its source text
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    root: Option<Node>,
    path: Option<PathBuf>,
}

impl Document {
    /// The text the document was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// File the document was loaded from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> Option<&mut Node> {
        self.root.as_mut()
    }

    /// Root mapping, created if the document is empty
    pub fn root_mapping_mut(&mut self) -> Result<&mut Mapping> {
        let root = self
            .root
            .get_or_insert_with(|| Node::Mapping(Mapping::new(Layout::Block, 1)));
        root.as_mapping_mut().ok_or(CoreError::NotAMapping)
    }

    /// Whether any value was changed since parsing
    pub fn is_modified(&self) -> bool {
        self.root.as_ref().is_some_and(Node::is_modified)
    }
}

/// Loads, renders and saves [`Document`]s
///
/// Holds no global state; construct one per run and pass it around.
#[derive(Debug, Clone, Default)]
pub struct DocumentProcessor {
    options: ProcessorOptions,
}

impl DocumentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ProcessorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// Parse YAML text
    pub fn parse(&self, text: &str) -> Result<Document> {
        let root = parser::parse(text, None)?;
        Ok(Document {
            source: text.to_string(),
            root,
            path: None,
        })
    }

    /// Load a YAML file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let root = parser::parse(&source, Some(path))?;
        tracing::debug!(path = %path.display(), "loaded document");
        Ok(Document {
            source,
            root,
            path: Some(path.to_path_buf()),
        })
    }

    /// Render the document, rewriting only modified values
    pub fn render(&self, doc: &Document) -> Result<String> {
        render::render(&doc.source, doc.root.as_ref(), self.options.quote)
    }

    /// Render the document and write it to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P, doc: &Document) -> Result<()> {
        let path = path.as_ref();
        let text = self.render(doc)?;
        std::fs::write(path, text).map_err(|e| CoreError::io(path, e))?;
        tracing::debug!(path = %path.display(), "saved document");
        Ok(())
    }
}
