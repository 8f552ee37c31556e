//! End-to-end experiment orchestration.
//!
//! Six strictly sequential stages: dataset acquisition, base model
//! acquisition, cached fine-tuning, two evaluations, comparison. A stage
//! failure aborts the rest and surfaces the experiment directory; partial
//! outputs are left in place for inspection.

use crate::compare::{compare_reports, ComparisonResult, MetricsReport};
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::evaluate::{evaluation_params, run_evaluation};
use crate::naming::experiment_name;
use crate::profiles::{resolve, TrainingProfile};
use crate::train::{run_training, TrainReport};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tunelab_training::{
    evaluation_split, write_jsonl_examples, DatasetManifest, DatasetProvider, ExperimentLayout,
    MetricComputer, ModelProvider, NullProgressSink, ProgressSink, StageEvent, TrainerBackend,
    TrainingConfig, TrainingError, TRAIN_SPLIT,
};

#[derive(Debug, Clone)]
pub struct ExperimentRequest {
    pub dataset_name: String,
    pub model_name: String,
    pub profile: String,
    pub output_root: PathBuf,
    /// Re-download the base model even when a complete copy exists.
    pub force_refresh: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedProfileConfig {
    pub max_samples: Option<u64>,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDirectories {
    pub experiment_root: String,
    pub data: String,
    pub base_model: String,
    pub fine_tuned_model: String,
    pub metrics: String,
    pub predictions: String,
    pub comparison: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentFiles {
    pub dataset_manifest: String,
    pub base_metrics: String,
    pub fine_tuned_metrics: String,
    pub base_predictions: String,
    pub fine_tuned_predictions: String,
    pub comparison: String,
    pub comparison_report: String,
}

/// Canonical record of a completed run (`experiment_metadata.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub experiment_id: String,
    pub dataset_name: String,
    pub model_name: String,
    pub profile: String,
    pub profile_config: ResolvedProfileConfig,
    pub timestamp: String,
    pub directories: ExperimentDirectories,
    pub files: ExperimentFiles,
}

/// Write a fetched dataset under `data_dir`: one `<split>/data.jsonl` per
/// split plus the `metadata.json` manifest. Shared by the pipeline and the
/// standalone `dataset download` command.
pub fn materialize_dataset(
    dataset: &tunelab_training::FetchedDataset,
    data_dir: &std::path::Path,
    max_samples: Option<usize>,
) -> PipelineResult<DatasetManifest> {
    for split in &dataset.splits {
        let split_dir = data_dir.join(&split.name);
        std::fs::create_dir_all(&split_dir)?;
        write_jsonl_examples(&split_dir.join("data.jsonl"), &split.examples)?;
    }

    let manifest = DatasetManifest {
        name: dataset.name.clone(),
        total_samples: dataset.total_samples(),
        splits: dataset.split_names(),
        max_samples: max_samples.map(|n| n as u64),
    };
    std::fs::create_dir_all(data_dir)?;
    std::fs::write(
        data_dir.join("metadata.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;
    Ok(manifest)
}

/// The orchestrator. Depends only on the provider traits, so every external
/// collaborator can be swapped for a stub.
pub struct ExperimentPipeline {
    dataset_provider: Arc<dyn DatasetProvider>,
    model_provider: Arc<dyn ModelProvider>,
    backend: Arc<dyn TrainerBackend>,
    metrics: Arc<dyn MetricComputer>,
    progress: Arc<dyn ProgressSink>,
}

impl ExperimentPipeline {
    pub fn new(
        dataset_provider: Arc<dyn DatasetProvider>,
        model_provider: Arc<dyn ModelProvider>,
        backend: Arc<dyn TrainerBackend>,
        metrics: Arc<dyn MetricComputer>,
    ) -> Self {
        Self {
            dataset_provider,
            model_provider,
            backend,
            metrics,
            progress: Arc::new(NullProgressSink),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Run the full experiment. The profile is validated before any
    /// filesystem side effect.
    pub async fn run(&self, request: &ExperimentRequest) -> PipelineResult<ExperimentSummary> {
        let profile = resolve(&request.profile)
            .ok_or_else(|| PipelineError::UnknownProfile(request.profile.clone()))?;
        let config = profile.training_config(&request.model_name);

        let experiment_id =
            experiment_name(&request.dataset_name, &request.model_name, Utc::now());
        let layout = ExperimentLayout::new(request.output_root.join(&experiment_id));
        layout.ensure_dirs()?;
        info!(experiment = %experiment_id, profile = profile.name, "starting experiment");

        let manifest = self
            .acquire_dataset(&layout, &request.dataset_name, &profile)
            .await
            .map_err(|e| PipelineError::stage(Stage::Dataset, layout.root(), e))?;

        self.acquire_base_model(&layout, &request.model_name, request.force_refresh)
            .await
            .map_err(|e| PipelineError::stage(Stage::BaseModel, layout.root(), e))?;

        let train_report = self
            .fine_tune(&layout, &manifest, &config)
            .await
            .map_err(|e| PipelineError::stage(Stage::FineTune, layout.root(), e))?;
        if train_report.skipped {
            info!("fine-tuning skipped, cached artifact reused");
        }

        let eval_split = evaluation_split(&manifest.splits)
            .ok_or(PipelineError::MissingEvaluationSplit)
            .map_err(|e| PipelineError::stage(Stage::EvaluateBase, layout.root(), e))?;

        let base_report = self
            .evaluate(&layout, layout.base_model_dir(), eval_split, &config, true)
            .await
            .map_err(|e| PipelineError::stage(Stage::EvaluateBase, layout.root(), e))?;

        let fine_tuned_report = self
            .evaluate(&layout, layout.fine_tuned_model_dir(), eval_split, &config, false)
            .await
            .map_err(|e| PipelineError::stage(Stage::EvaluateFineTuned, layout.root(), e))?;

        let comparison = self
            .compare(&layout, &base_report, &fine_tuned_report)
            .map_err(|e| PipelineError::stage(Stage::Compare, layout.root(), e))?;
        info!(improved = ?comparison.improvements(), "comparison complete");

        let summary = self.build_summary(&layout, request, &profile, &config, experiment_id);
        std::fs::write(layout.summary_path(), serde_json::to_string_pretty(&summary)?)?;
        Ok(summary)
    }

    async fn acquire_dataset(
        &self,
        layout: &ExperimentLayout,
        dataset_name: &str,
        profile: &TrainingProfile,
    ) -> PipelineResult<DatasetManifest> {
        self.started(Stage::Dataset);
        let dataset = self.dataset_provider.fetch(dataset_name, profile.max_samples).await?;
        let manifest = materialize_dataset(&dataset, &layout.data_dir(), profile.max_samples)?;
        self.finished(Stage::Dataset);
        Ok(manifest)
    }

    async fn acquire_base_model(
        &self,
        layout: &ExperimentLayout,
        model_name: &str,
        force: bool,
    ) -> PipelineResult<()> {
        self.started(Stage::BaseModel);
        self.model_provider.download(model_name, &layout.base_model_dir(), force).await?;
        self.finished(Stage::BaseModel);
        Ok(())
    }

    async fn fine_tune(
        &self,
        layout: &ExperimentLayout,
        manifest: &DatasetManifest,
        config: &TrainingConfig,
    ) -> PipelineResult<TrainReport> {
        if !manifest.splits.iter().any(|s| s == TRAIN_SPLIT) {
            return Err(TrainingError::Dataset(format!(
                "dataset '{}' has no '{TRAIN_SPLIT}' split",
                manifest.name
            ))
            .into());
        }
        let val_split = evaluation_split(&manifest.splits)
            .ok_or(PipelineError::MissingEvaluationSplit)?;

        let base_model_dir = layout.base_model_dir();
        run_training(
            self.backend.as_ref(),
            self.progress.as_ref(),
            config,
            &layout.split_file(TRAIN_SPLIT),
            &layout.split_file(val_split),
            Some(&base_model_dir),
            &layout.fine_tuned_model_dir(),
            false,
        )
        .await
    }

    async fn evaluate(
        &self,
        layout: &ExperimentLayout,
        model_dir: PathBuf,
        eval_split: &str,
        config: &TrainingConfig,
        is_base: bool,
    ) -> PipelineResult<MetricsReport> {
        let stage = if is_base { Stage::EvaluateBase } else { Stage::EvaluateFineTuned };
        self.started(stage);

        let (output_file, predictions_file) = if is_base {
            (layout.base_metrics_path(), layout.base_predictions_path())
        } else {
            (layout.fine_tuned_metrics_path(), layout.fine_tuned_predictions_path())
        };

        let params = evaluation_params(
            model_dir,
            layout.split_file(eval_split),
            output_file,
            Some(predictions_file),
            config.seed,
        );
        let report =
            run_evaluation(self.backend.as_ref(), self.metrics.as_ref(), &params).await?;

        self.finished(stage);
        Ok(report)
    }

    fn compare(
        &self,
        layout: &ExperimentLayout,
        base: &MetricsReport,
        fine_tuned: &MetricsReport,
    ) -> PipelineResult<ComparisonResult> {
        self.started(Stage::Compare);
        let result = compare_reports(base, fine_tuned);
        result.write(&layout.comparison_path())?;
        std::fs::write(layout.report_path(), result.render_text())?;
        self.finished(Stage::Compare);
        Ok(result)
    }

    fn build_summary(
        &self,
        layout: &ExperimentLayout,
        request: &ExperimentRequest,
        profile: &TrainingProfile,
        config: &TrainingConfig,
        experiment_id: String,
    ) -> ExperimentSummary {
        let display = |p: PathBuf| p.to_string_lossy().to_string();
        ExperimentSummary {
            experiment_id,
            dataset_name: request.dataset_name.clone(),
            model_name: request.model_name.clone(),
            profile: profile.name.to_string(),
            profile_config: ResolvedProfileConfig {
                max_samples: profile.max_samples.map(|n| n as u64),
                training: config.clone(),
            },
            timestamp: Utc::now().to_rfc3339(),
            directories: ExperimentDirectories {
                experiment_root: layout.root().to_string_lossy().to_string(),
                data: display(layout.data_dir()),
                base_model: display(layout.base_model_dir()),
                fine_tuned_model: display(layout.fine_tuned_model_dir()),
                metrics: display(layout.metrics_dir()),
                predictions: display(layout.predictions_dir()),
                comparison: display(layout.comparison_dir()),
            },
            files: ExperimentFiles {
                dataset_manifest: display(layout.dataset_manifest_path()),
                base_metrics: display(layout.base_metrics_path()),
                fine_tuned_metrics: display(layout.fine_tuned_metrics_path()),
                base_predictions: display(layout.base_predictions_path()),
                fine_tuned_predictions: display(layout.fine_tuned_predictions_path()),
                comparison: display(layout.comparison_path()),
                comparison_report: display(layout.report_path()),
            },
        }
    }

    fn started(&self, stage: Stage) {
        self.progress.on_event(StageEvent::Started { stage: stage.as_str().to_string() });
    }

    fn finished(&self, stage: Stage) {
        self.progress.on_event(StageEvent::Finished { stage: stage.as_str().to_string() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tunelab_backends::{BuiltinMetrics, LinearClassifierBackend};
    use tunelab_training::{
        FetchedDataset, FetchedSplit, LabeledExample, ModelArtifact, ProviderError,
    };

    struct StubDatasetProvider {
        splits: Vec<(&'static str, usize)>,
    }

    fn labeled_examples(count: usize) -> Vec<LabeledExample> {
        (0..count)
            .map(|i| {
                if i % 2 == 0 {
                    LabeledExample { text: format!("wonderful great film {i}"), label: 1 }
                } else {
                    LabeledExample { text: format!("terrible boring film {i}"), label: 0 }
                }
            })
            .collect()
    }

    #[async_trait]
    impl DatasetProvider for StubDatasetProvider {
        fn id(&self) -> &'static str {
            "stub-dataset"
        }

        async fn fetch(
            &self,
            name: &str,
            max_samples: Option<usize>,
        ) -> Result<FetchedDataset, ProviderError> {
            let splits = self
                .splits
                .iter()
                .map(|&(split, count)| FetchedSplit {
                    name: split.to_string(),
                    examples: labeled_examples(max_samples.map_or(count, |cap| count.min(cap))),
                })
                .collect();
            Ok(FetchedDataset { name: name.to_string(), splits })
        }
    }

    struct StubModelProvider;

    #[async_trait]
    impl ModelProvider for StubModelProvider {
        fn id(&self) -> &'static str {
            "stub-model"
        }

        async fn download(
            &self,
            name: &str,
            dest: &std::path::Path,
            _force: bool,
        ) -> Result<ModelArtifact, ProviderError> {
            std::fs::create_dir_all(dest)?;
            std::fs::write(dest.join("config.json"), "{\"model_type\": \"stub\"}")?;
            std::fs::write(dest.join("model.safetensors"), b"weights")?;
            let artifact = ModelArtifact {
                name: name.to_string(),
                model_type: "stub".to_string(),
                saved_path: dest.to_path_buf(),
                cache_dir: None,
            };
            artifact.write(dest)?;
            Ok(artifact)
        }

        async fn upload(
            &self,
            _model_dir: &std::path::Path,
            _name: &str,
        ) -> Result<PathBuf, ProviderError> {
            unimplemented!()
        }
    }

    struct FailingDatasetProvider;

    #[async_trait]
    impl DatasetProvider for FailingDatasetProvider {
        fn id(&self) -> &'static str {
            "failing-dataset"
        }

        async fn fetch(
            &self,
            _name: &str,
            _max_samples: Option<usize>,
        ) -> Result<FetchedDataset, ProviderError> {
            Err(ProviderError::Dataset("hub unreachable".to_string()))
        }
    }

    fn pipeline(dataset: Arc<dyn DatasetProvider>) -> ExperimentPipeline {
        ExperimentPipeline::new(
            dataset,
            Arc::new(StubModelProvider),
            Arc::new(LinearClassifierBackend::new()),
            Arc::new(BuiltinMetrics),
        )
    }

    fn request(output_root: PathBuf) -> ExperimentRequest {
        ExperimentRequest {
            dataset_name: "imdb".to_string(),
            model_name: "prajjwal1/bert-tiny".to_string(),
            profile: "quick".to_string(),
            output_root,
            force_refresh: false,
        }
    }

    #[tokio::test]
    async fn test_full_experiment_produces_all_artifacts() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::new(StubDatasetProvider {
            splits: vec![("train", 24), ("test", 8), ("validation", 6)],
        }));

        let summary = pipeline.run(&request(temp.path().to_path_buf())).await.unwrap();

        let root = PathBuf::from(&summary.directories.experiment_root);
        assert!(root.starts_with(temp.path()));
        assert!(root.join("experiment_metadata.json").exists());
        assert!(PathBuf::from(&summary.files.dataset_manifest).exists());
        assert!(PathBuf::from(&summary.files.base_metrics).exists());
        assert!(PathBuf::from(&summary.files.fine_tuned_metrics).exists());
        assert!(PathBuf::from(&summary.files.base_predictions).exists());
        assert!(PathBuf::from(&summary.files.fine_tuned_predictions).exists());
        assert!(PathBuf::from(&summary.files.comparison).exists());
        assert!(PathBuf::from(&summary.files.comparison_report).exists());

        assert_eq!(summary.profile, "quick");
        assert_eq!(summary.profile_config.max_samples, Some(100));
        assert_eq!(summary.profile_config.training.epochs, 1);

        // The trained classifier separates the stub data perfectly.
        let fine_tuned = MetricsReport::load(&PathBuf::from(&summary.files.fine_tuned_metrics))
            .unwrap();
        assert!((fine_tuned.metrics["accuracy"] - 1.0).abs() < 1e-9);
        // Evaluation ran against the preferred 'test' split.
        assert_eq!(fine_tuned.num_samples, 8);
    }

    #[tokio::test]
    async fn test_evaluation_falls_back_to_validation_split() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::new(StubDatasetProvider {
            splits: vec![("train", 24), ("validation", 6)],
        }));

        let summary = pipeline.run(&request(temp.path().to_path_buf())).await.unwrap();
        let report =
            MetricsReport::load(&PathBuf::from(&summary.files.base_metrics)).unwrap();
        assert_eq!(report.num_samples, 6);
    }

    #[tokio::test]
    async fn test_missing_evaluation_split_fails_the_pipeline() {
        let temp = TempDir::new().unwrap();
        let pipeline =
            pipeline(Arc::new(StubDatasetProvider { splits: vec![("train", 24)] }));

        let err = pipeline.run(&request(temp.path().to_path_buf())).await.unwrap_err();
        match err {
            PipelineError::Stage { stage, experiment_dir, .. } => {
                assert_eq!(stage, Stage::FineTune);
                assert!(experiment_dir.exists(), "partial outputs must be preserved");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_profile_rejected_before_side_effects() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::new(StubDatasetProvider {
            splits: vec![("train", 24), ("test", 8)],
        }));

        let mut req = request(temp.path().to_path_buf());
        req.profile = "turbo".to_string();
        let err = pipeline.run(&req).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownProfile(_)));

        // Nothing was created under the output root.
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_dataset_failure_reports_stage_and_directory() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::new(FailingDatasetProvider));

        let err = pipeline.run(&request(temp.path().to_path_buf())).await.unwrap_err();
        match err {
            PipelineError::Stage { stage, experiment_dir, source } => {
                assert_eq!(stage, Stage::Dataset);
                assert!(experiment_dir.exists());
                assert!(source.to_string().contains("hub unreachable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_sample_cap_limits_materialized_splits() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::new(StubDatasetProvider {
            splits: vec![("train", 500), ("test", 500)],
        }));

        let summary = pipeline.run(&request(temp.path().to_path_buf())).await.unwrap();
        let manifest: DatasetManifest = serde_json::from_slice(
            &std::fs::read(PathBuf::from(&summary.files.dataset_manifest)).unwrap(),
        )
        .unwrap();
        // quick profile caps each split at 100 samples.
        assert_eq!(manifest.max_samples, Some(100));
        assert_eq!(manifest.total_samples, 200);
    }
}
