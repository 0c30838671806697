//! JSON output helpers.
//!
//! Provides the error-object formatter used by `--json` when a run fails,
//! and the summary formatter used when it succeeds.

use anyhow::{Context, Result};

use crate::domain::ProvisionSummary;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "...",
///   "stage": "..."
/// }
/// ```
/// `stage` is `null` for failures outside the stage sequence.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str, stage: Option<&str>) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
        "stage": stage,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Format the success summary, next steps included.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_summary(summary: &ProvisionSummary) -> Result<String> {
    let mut value = serde_json::to_value(summary).context("JSON serialization failed")?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("next_steps".to_string(), serde_json::json!(summary.next_steps()));
    }
    serde_json::to_string_pretty(&value).context("JSON serialization failed")
}

/// Machine-readable code and failing stage for any error a run can end with.
#[must_use]
pub fn classify(err: &anyhow::Error) -> (&'static str, Option<&'static str>) {
    use crate::domain::{ConfigError, ProvisionError, StageFailure};

    if let Some(failure) = err.downcast_ref::<StageFailure>() {
        let code = failure.provision_error().map_or("stage_failed", ProvisionError::code);
        return (code, Some(failure.stage.name()));
    }
    if let Some(e) = err.downcast_ref::<ProvisionError>() {
        return (e.code(), None);
    }
    if err.chain().any(|c| c.downcast_ref::<ConfigError>().is_some()) {
        return ("invalid_config", None);
    }
    ("error", None)
}
