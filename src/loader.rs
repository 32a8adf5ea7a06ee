use anyhow::{Result, Context as AnyhowContext};
use std::fs;
use std::path::Path;
use crate::manager::{ValidationReport, WorkflowManager};
use crate::markup::MarkupFormat;

pub fn load_markup(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow markup from {}", path.display()))
}

/// Reads `path` into `manager` as its current document and returns the
/// validation report produced on the way.
pub fn load_workflow(manager: &mut WorkflowManager, path: impl AsRef<Path>) -> Result<ValidationReport> {
    let path = path.as_ref();
    let markup = load_markup(path)?;

    let report = manager
        .set_markup(&markup)
        .with_context(|| format!("Failed to decode workflow markup from {}", path.display()))?;

    Ok(report.clone())
}

/// Writes the manager's current document to `path` in `format`.
pub fn save_workflow(manager: &WorkflowManager, path: impl AsRef<Path>, format: MarkupFormat) -> Result<()> {
    let path = path.as_ref();
    let markup = manager
        .to_markup(format)
        .with_context(|| format!("Failed to render workflow as {}", format))?;

    fs::write(path, markup)
        .with_context(|| format!("Failed to write workflow markup to {}", path.display()))
}
