//! Boundary traits for the external capability providers.
//!
//! The orchestration core depends only on these traits, so concrete ML
//! plumbing (hub clients, trainer backends, metric math) stays substitutable
//! with stubs in tests.

use crate::config::TrainingConfig;
use crate::dataset::{FetchedDataset, LabeledExample};
use crate::error::ProviderError;
use crate::progress::ProgressSink;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Sidecar describing a downloaded model (`model_metadata.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub model_type: String,
    pub saved_path: PathBuf,
    pub cache_dir: Option<PathBuf>,
}

pub const MODEL_ARTIFACT_FILE: &str = "model_metadata.json";

impl ModelArtifact {
    pub fn path_for(model_dir: &Path) -> PathBuf {
        model_dir.join(MODEL_ARTIFACT_FILE)
    }

    pub fn write(&self, model_dir: &Path) -> Result<(), ProviderError> {
        std::fs::write(Self::path_for(model_dir), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(model_dir: &Path) -> Result<Self, ProviderError> {
        let bytes = std::fs::read(Self::path_for(model_dir))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Fetches named splits of labeled text examples for a dataset identifier.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    fn id(&self) -> &'static str;

    async fn fetch(
        &self,
        name: &str,
        max_samples: Option<usize>,
    ) -> Result<FetchedDataset, ProviderError>;
}

/// Downloads (and publishes) pretrained models with their tokenizers.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &'static str;

    /// Materialize `name` into `dest`. When `force` is false an existing
    /// complete artifact short-circuits the download.
    async fn download(
        &self,
        name: &str,
        dest: &Path,
        force: bool,
    ) -> Result<ModelArtifact, ProviderError>;

    /// Publish a local model directory under `name`; returns the published
    /// location.
    async fn upload(&self, model_dir: &Path, name: &str) -> Result<PathBuf, ProviderError>;
}

/// Inputs handed to a trainer backend for one fine-tuning run.
#[derive(Debug, Clone, Copy)]
pub struct TrainRequest<'a> {
    pub model_name: &'a str,
    /// Base model directory, when one has been materialized locally.
    pub base_model_dir: Option<&'a Path>,
    pub train_examples: &'a [LabeledExample],
    pub val_examples: &'a [LabeledExample],
    pub config: &'a TrainingConfig,
    pub output_dir: &'a Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainOutcome {
    pub total_steps: u64,
}

/// Inference settings for evaluation.
#[derive(Debug, Clone)]
pub struct PredictOptions {
    pub batch_size: u32,
    pub max_length: u32,
    /// Seed for deterministic behavior on models without trained weights.
    pub seed: u64,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self { batch_size: 32, max_length: 512, seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: i64,
    pub confidence: f64,
}

/// Performs the fine-tuning loop and inference; the orchestrator controls
/// only its inputs, outputs, and working directory.
#[async_trait]
pub trait TrainerBackend: Send + Sync {
    fn id(&self) -> &'static str;

    async fn train(
        &self,
        request: TrainRequest<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<TrainOutcome, ProviderError>;

    async fn predict(
        &self,
        model_dir: &Path,
        examples: &[LabeledExample],
        options: &PredictOptions,
    ) -> Result<Vec<Prediction>, ProviderError>;
}

/// Fixed vocabulary of evaluation metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Accuracy,
    /// Weighted F1.
    F1,
    /// Weighted precision.
    Precision,
    /// Weighted recall.
    Recall,
}

impl MetricKind {
    pub const ALL: [Self; 4] = [Self::Accuracy, Self::F1, Self::Precision, Self::Recall];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::F1 => "f1",
            Self::Precision => "precision",
            Self::Recall => "recall",
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accuracy" => Ok(Self::Accuracy),
            "f1" => Ok(Self::F1),
            "precision" => Ok(Self::Precision),
            "recall" => Ok(Self::Recall),
            other => Err(ProviderError::Metric(format!(
                "unknown metric '{other}' (expected one of: accuracy, f1, precision, recall)"
            ))),
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes name -> score mappings from parallel label sequences.
pub trait MetricComputer: Send + Sync {
    fn compute(
        &self,
        true_labels: &[i64],
        predicted_labels: &[i64],
        requested: &[MetricKind],
    ) -> Result<BTreeMap<String, f64>, ProviderError>;
}
