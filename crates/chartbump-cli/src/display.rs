//! Display formatting for CLI output
//!
//! Progress is printed as styled lines; with `--json` the lines are
//! suppressed and a single [`BumpReport`] is printed instead.

use chartbump_core::ChartChanges;
use console::style;
use serde::Serialize;
use std::fmt::Display;

use crate::error::{CliError, Result};

/// Outcome of the chart metadata step
#[derive(Debug, Clone, Serialize)]
pub struct ChartReport {
    pub file: String,
    pub version: Option<String>,
    pub app_version: Option<String>,
    pub changes: ChartChanges,
    pub saved: bool,
}

/// Outcome of the image tag step
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub file: String,
    pub images: Vec<String>,
    pub version: String,
    pub found: usize,
    pub updated: usize,
    pub saved: bool,
}

/// Everything a run did
#[derive(Debug, Clone, Default, Serialize)]
pub struct BumpReport {
    pub chart: Option<ChartReport>,
    pub images: Option<ImageReport>,
    /// Whether any file was changed
    pub release: bool,
}

/// Prints progress unless JSON output was requested
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// A top-level step
    pub fn step(&self, message: impl Display) {
        if !self.json {
            println!("{} {}", style("→").blue(), message);
        }
    }

    /// Something changed
    pub fn done(&self, message: impl Display) {
        if !self.json {
            println!("  {} {}", style("✓").green(), message);
        }
    }

    /// Nothing to do
    pub fn skip(&self, message: impl Display) {
        if !self.json {
            println!("  {} {}", style("-").dim(), message);
        }
    }

    /// Something was skipped for lack of input
    pub fn warn(&self, message: impl Display) {
        if !self.json {
            println!("  {} {}", style("⚠").yellow(), message);
        }
    }

    /// Final summary line, or the JSON report
    pub fn finish(&self, report: &BumpReport) -> Result<()> {
        if self.json {
            let json = serde_json::to_string_pretty(report)
                .map_err(|e| CliError::internal(format!("failed to serialize report: {}", e)))?;
            println!("{}", json);
        } else if report.release {
            println!("{}", style("Versions bumped").green().bold());
        } else {
            println!("{}", style("No versions changed").yellow().bold());
        }
        Ok(())
    }
}
