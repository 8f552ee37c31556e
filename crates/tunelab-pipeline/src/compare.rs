//! Metric reports and baseline/fine-tuned comparison.

use crate::error::PipelineResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One model's evaluation result (`<metrics>.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub model_path: String,
    pub num_samples: u64,
    pub metrics: BTreeMap<String, f64>,
    pub requested_metrics: Vec<String>,
}

impl MetricsReport {
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn write(&self, path: &Path) -> PipelineResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub baseline: f64,
    pub fine_tuned: f64,
    pub absolute_diff: f64,
    pub percent_change: f64,
}

/// Full comparison document (`comparison.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub baseline: MetricsReport,
    pub fine_tuned: MetricsReport,
    pub comparison: BTreeMap<String, MetricDelta>,
}

/// Compare two reports over the metrics they share.
pub fn compare_reports(baseline: &MetricsReport, fine_tuned: &MetricsReport) -> ComparisonResult {
    let mut comparison = BTreeMap::new();
    for (name, &base_value) in &baseline.metrics {
        let Some(&new_value) = fine_tuned.metrics.get(name) else {
            continue;
        };
        let absolute_diff = new_value - base_value;
        let percent_change = if base_value == 0.0 {
            0.0
        } else {
            absolute_diff / base_value * 100.0
        };
        comparison.insert(
            name.clone(),
            MetricDelta { baseline: base_value, fine_tuned: new_value, absolute_diff, percent_change },
        );
    }

    ComparisonResult {
        baseline: baseline.clone(),
        fine_tuned: fine_tuned.clone(),
        comparison,
    }
}

impl ComparisonResult {
    /// Metrics where fine-tuning strictly improved on the baseline.
    pub fn improvements(&self) -> Vec<&str> {
        self.comparison
            .iter()
            .filter(|(_, delta)| delta.absolute_diff > 0.0)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn write(&self, path: &Path) -> PipelineResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Plain-text table for the saved report and console output.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<12} {:>10} {:>12} {:>10} {:>10}\n",
            "Metric", "Baseline", "Fine-tuned", "Diff", "Change %"
        ));
        out.push_str(&"-".repeat(58));
        out.push('\n');
        for (name, delta) in &self.comparison {
            out.push_str(&format!(
                "{:<12} {:>10.4} {:>12.4} {:>+10.4} {:>+9.2}%\n",
                name, delta.baseline, delta.fine_tuned, delta.absolute_diff, delta.percent_change
            ));
        }
        let improvements = self.improvements();
        out.push('\n');
        if improvements.is_empty() {
            out.push_str("No metric improved over the baseline.\n");
        } else {
            out.push_str(&format!("Improved metrics: {}\n", improvements.join(", ")));
        }
        out
    }
}
