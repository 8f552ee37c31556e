use crate::error::TrainingResult;
use std::path::{Path, PathBuf};

/// Filesystem layout of one experiment directory.
///
/// ```text
/// exp_<timestamp>_<dataset>_<model>/
///   data/<split>/data.jsonl + data/metadata.json
///   models/base/  models/fine-tuned/
///   metrics/  predictions/  comparison/  cache/
///   experiment_metadata.json
/// ```
#[derive(Debug, Clone)]
pub struct ExperimentLayout {
    root: PathBuf,
}

impl ExperimentLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn split_dir(&self, split: &str) -> PathBuf {
        self.data_dir().join(split)
    }

    pub fn split_file(&self, split: &str) -> PathBuf {
        self.split_dir(split).join("data.jsonl")
    }

    pub fn dataset_manifest_path(&self) -> PathBuf {
        self.data_dir().join("metadata.json")
    }

    pub fn base_model_dir(&self) -> PathBuf {
        self.root.join("models").join("base")
    }

    pub fn fine_tuned_model_dir(&self) -> PathBuf {
        self.root.join("models").join("fine-tuned")
    }

    pub fn metrics_dir(&self) -> PathBuf {
        self.root.join("metrics")
    }

    pub fn base_metrics_path(&self) -> PathBuf {
        self.metrics_dir().join("base_model_metrics.json")
    }

    pub fn fine_tuned_metrics_path(&self) -> PathBuf {
        self.metrics_dir().join("fine_tuned_metrics.json")
    }

    pub fn predictions_dir(&self) -> PathBuf {
        self.root.join("predictions")
    }

    pub fn base_predictions_path(&self) -> PathBuf {
        self.predictions_dir().join("base_predictions.jsonl")
    }

    pub fn fine_tuned_predictions_path(&self) -> PathBuf {
        self.predictions_dir().join("fine_tuned_predictions.jsonl")
    }

    pub fn comparison_dir(&self) -> PathBuf {
        self.root.join("comparison")
    }

    pub fn comparison_path(&self) -> PathBuf {
        self.comparison_dir().join("comparison.json")
    }

    pub fn report_path(&self) -> PathBuf {
        self.comparison_dir().join("report.txt")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join("experiment_metadata.json")
    }

    pub fn ensure_dirs(&self) -> TrainingResult<()> {
        std::fs::create_dir_all(self.data_dir())?;
        std::fs::create_dir_all(self.base_model_dir())?;
        std::fs::create_dir_all(self.fine_tuned_model_dir())?;
        std::fs::create_dir_all(self.metrics_dir())?;
        std::fs::create_dir_all(self.predictions_dir())?;
        std::fs::create_dir_all(self.comparison_dir())?;
        std::fs::create_dir_all(self.cache_dir())?;
        Ok(())
    }
}
