//! Core error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML{}: {message} (line {line}, column {col})", origin(.path))]
    Parse {
        path: Option<PathBuf>,
        message: String,
        line: usize,
        col: usize,
    },

    #[error("Cannot rewrite value at line {line}: {reason}")]
    UnsupportedEdit { line: usize, reason: String },

    #[error("Expected a mapping at the document root")]
    NotAMapping,

    #[error("Key '{key}' does not hold a scalar value")]
    NotAScalar { key: String },

    #[error("No valid images specified")]
    NoImages,
}

fn origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" in {}", p.display()),
        None => String::new(),
    }
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
