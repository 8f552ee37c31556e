//! Experiment directory naming.

use chrono::{DateTime, Utc};

/// Replace path separators and whitespace so user-supplied identifiers can
/// never escape or nest inside the output root.
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == '/' || c == '\\' || c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Short model name: the segment after the last `/` for org-scoped ids
/// ("prajjwal1/bert-tiny" -> "bert-tiny").
pub fn model_short_name(model_name: &str) -> &str {
    model_name.rsplit('/').next().unwrap_or(model_name)
}

/// `exp_<timestamp>_<dataset>_<model-short>`, second granularity. Unique for
/// sequential invocations; concurrent same-second starts are not disambiguated.
pub fn experiment_name(dataset_name: &str, model_name: &str, now: DateTime<Utc>) -> String {
    let timestamp = now.format("%Y%m%d_%H%M%S");
    let dataset_safe = sanitize_component(dataset_name);
    let model_safe = sanitize_component(model_short_name(model_name));
    format!("exp_{timestamp}_{dataset_safe}_{model_safe}")
}
