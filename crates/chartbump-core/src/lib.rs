//! chartbump core - version patching for Helm-style charts
//!
//! This crate provides:
//! - `DocumentProcessor` / `Document`: comment-preserving YAML load and save
//! - `image`: image reference classification, matching and retagging
//! - `ChartPatch`: `version` / `appVersion` updates for chart metadata

pub mod chart;
pub mod document;
pub mod error;
pub mod image;

pub use chart::{ChartChanges, ChartPatch, FieldChange};
pub use document::{
    Document, DocumentProcessor, Layout, Mapping, Node, ProcessorOptions, QuoteStyle, Scalar,
    ScalarKind, ScalarStyle,
};
pub use error::{CoreError, Result};
pub use image::{ImageRef, ImageSet, MatchOutcome, Tally, split_reference, urljoin, walk};
