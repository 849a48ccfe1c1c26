//! CLI commands

pub mod bump;
