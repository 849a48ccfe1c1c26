//! Chart metadata patching (`version` / `appVersion`)

use serde::Serialize;

use crate::document::{Document, Mapping};
use crate::error::Result;

pub const VERSION_KEY: &str = "version";
pub const APP_VERSION_KEY: &str = "appVersion";

/// What happened to one chart field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldChange {
    /// No desired value was given
    Skipped,
    /// Already at the desired value
    Unchanged,
    Updated,
}

/// Per-field result of [`ChartPatch::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartChanges {
    pub version: FieldChange,
    pub app_version: FieldChange,
}

impl ChartChanges {
    /// Whether the chart document needs saving
    pub fn changed(&self) -> bool {
        self.version == FieldChange::Updated || self.app_version == FieldChange::Updated
    }
}

/// Desired chart versions; `None` or empty leaves a field alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartPatch {
    pub version: Option<String>,
    pub app_version: Option<String>,
}

impl ChartPatch {
    pub fn new(version: Option<String>, app_version: Option<String>) -> Self {
        Self {
            version,
            app_version,
        }
    }

    /// Whether there is anything to apply
    pub fn is_empty(&self) -> bool {
        desired(&self.version).is_none() && desired(&self.app_version).is_none()
    }

    /// Apply the patch to a chart document
    ///
    /// An empty document becomes a mapping holding the requested fields.
    pub fn apply(&self, doc: &mut Document) -> Result<ChartChanges> {
        if self.is_empty() {
            return Ok(ChartChanges {
                version: FieldChange::Skipped,
                app_version: FieldChange::Skipped,
            });
        }
        let chart = doc.root_mapping_mut()?;
        Ok(ChartChanges {
            version: patch_field(chart, VERSION_KEY, desired(&self.version))?,
            app_version: patch_field(chart, APP_VERSION_KEY, desired(&self.app_version))?,
        })
    }
}

fn desired(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn patch_field(chart: &mut Mapping, key: &str, desired: Option<&str>) -> Result<FieldChange> {
    let Some(desired) = desired else {
        return Ok(FieldChange::Skipped);
    };
    if chart.set_str(key, desired)? {
        tracing::debug!(key, desired, "chart field updated");
        Ok(FieldChange::Updated)
    } else {
        Ok(FieldChange::Unchanged)
    }
}
