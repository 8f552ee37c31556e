//! The fine-tuning stage: cache consultation, trainer invocation, metadata
//! persistence.

use crate::error::PipelineResult;
use std::path::Path;
use tracing::info;
use tunelab_training::{
    check_cache, fingerprint, file_mtime, read_jsonl_examples, CacheStatus, ProgressSink,
    StageEvent, TrainRequest, TrainerBackend, TrainingConfig, TrainingMetadata,
};

const STAGE: &str = "train";

#[derive(Debug, Clone)]
pub struct TrainReport {
    /// True when a valid cached artifact was reused and the trainer never ran.
    pub skipped: bool,
    pub metadata: TrainingMetadata,
}

/// Fine-tune `config.model_name` on the given inputs, reusing the artifact
/// in `output_dir` when the cache validator accepts it.
///
/// The metadata sidecar is written twice: once with `completed = false`
/// before the trainer starts, and again with `completed = true` only after
/// every model file is on disk. A run killed in between leaves the first
/// version behind, which the validator rejects on the next invocation.
pub async fn run_training(
    backend: &dyn TrainerBackend,
    progress: &dyn ProgressSink,
    config: &TrainingConfig,
    train_data: &Path,
    val_data: &Path,
    base_model_dir: Option<&Path>,
    output_dir: &Path,
    force: bool,
) -> PipelineResult<TrainReport> {
    let config_hash = fingerprint(config)?;

    if force {
        info!("training cache bypassed (--force)");
    } else {
        match check_cache(output_dir, config, train_data, val_data)? {
            CacheStatus::Valid => {
                progress.on_event(StageEvent::Skipped {
                    stage: STAGE.to_string(),
                    reason: "training cache valid, reusing existing model".to_string(),
                });
                let metadata = TrainingMetadata::load(output_dir)?;
                return Ok(TrainReport { skipped: true, metadata });
            }
            CacheStatus::Invalid(reason) => {
                info!(%reason, "training cache miss");
            }
        }
    }

    let train_examples = read_jsonl_examples(train_data)?;
    let val_examples = read_jsonl_examples(val_data)?;

    progress.on_event(StageEvent::Started { stage: STAGE.to_string() });
    std::fs::create_dir_all(output_dir)?;

    // Input mtimes are captured now, so edits made while training runs
    // invalidate the artifact on the next cache check.
    let mut metadata = TrainingMetadata {
        model_name: config.model_name.clone(),
        train_data_path: train_data.to_string_lossy().to_string(),
        train_data_mtime: file_mtime(train_data)?,
        val_data_path: val_data.to_string_lossy().to_string(),
        val_data_mtime: file_mtime(val_data)?,
        config_hash: config_hash.0,
        training_params: config.clone(),
        training_samples: train_examples.len() as u64,
        validation_samples: val_examples.len() as u64,
        total_steps: config.total_steps(train_examples.len()),
        completed: false,
    };
    metadata.write(output_dir)?;

    let outcome = backend
        .train(
            TrainRequest {
                model_name: &config.model_name,
                base_model_dir,
                train_examples: &train_examples,
                val_examples: &val_examples,
                config,
                output_dir,
            },
            progress,
        )
        .await?;

    metadata.total_steps = outcome.total_steps;
    metadata.completed = true;
    metadata.write(output_dir)?;

    progress.on_event(StageEvent::Finished { stage: STAGE.to_string() });
    Ok(TrainReport { skipped: false, metadata })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tunelab_training::{
        write_jsonl_examples, LabeledExample, PredictOptions, Prediction, ProviderError,
        TrainOutcome, MODEL_CONFIG_FILE,
    };

    /// Counts invocations and writes the minimum viable artifact.
    #[derive(Default)]
    struct CountingBackend {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl TrainerBackend for CountingBackend {
        fn id(&self) -> &'static str {
            "counting"
        }

        async fn train(
            &self,
            request: TrainRequest<'_>,
            _progress: &dyn ProgressSink,
        ) -> Result<TrainOutcome, ProviderError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            std::fs::create_dir_all(request.output_dir)?;
            std::fs::write(request.output_dir.join(MODEL_CONFIG_FILE), "{}")?;
            std::fs::write(request.output_dir.join("model.json"), "{}")?;
            Ok(TrainOutcome { total_steps: 7 })
        }

        async fn predict(
            &self,
            _model_dir: &Path,
            _examples: &[LabeledExample],
            _options: &PredictOptions,
        ) -> Result<Vec<Prediction>, ProviderError> {
            unimplemented!("not used in these tests")
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<StageEvent>>,
    }

    impl ProgressSink for RecordingSink {
        fn on_event(&self, event: StageEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl RecordingSink {
        fn skipped_count(&self) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| matches!(e, StageEvent::Skipped { .. }))
                .count()
        }
    }

    struct Fixture {
        _temp: TempDir,
        train_path: PathBuf,
        val_path: PathBuf,
        output_dir: PathBuf,
        config: TrainingConfig,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let train_path = temp.path().join("train.jsonl");
        let val_path = temp.path().join("val.jsonl");
        write_jsonl_examples(
            &train_path,
            &[
                LabeledExample { text: "good".to_string(), label: 1 },
                LabeledExample { text: "bad".to_string(), label: 0 },
            ],
        )
        .unwrap();
        write_jsonl_examples(
            &val_path,
            &[LabeledExample { text: "fine".to_string(), label: 1 }],
        )
        .unwrap();

        let output_dir = temp.path().join("fine-tuned");
        let config = TrainingConfig {
            model_name: "distilbert-base-uncased".to_string(),
            ..Default::default()
        };
        Fixture { _temp: temp, train_path, val_path, output_dir, config }
    }

    #[tokio::test]
    async fn test_second_run_reuses_cached_artifact() {
        let f = fixture();
        let backend = CountingBackend::default();
        let sink = RecordingSink::default();

        let first = run_training(
            &backend, &sink, &f.config, &f.train_path, &f.val_path, None, &f.output_dir, false,
        )
        .await
        .unwrap();
        assert!(!first.skipped);
        assert!(first.metadata.completed);
        assert_eq!(first.metadata.total_steps, 7);

        let second = run_training(
            &backend, &sink, &f.config, &f.train_path, &f.val_path, None, &f.output_dir, false,
        )
        .await
        .unwrap();
        assert!(second.skipped);
        assert_eq!(second.metadata, first.metadata);

        // The trainer ran exactly once and the skip was signalled.
        assert_eq!(backend.runs.load(Ordering::SeqCst), 1);
        assert_eq!(sink.skipped_count(), 1);
    }

    #[tokio::test]
    async fn test_force_retrains_despite_valid_cache() {
        let f = fixture();
        let backend = CountingBackend::default();
        let sink = RecordingSink::default();

        for _ in 0..2 {
            run_training(
                &backend, &sink, &f.config, &f.train_path, &f.val_path, None, &f.output_dir, true,
            )
            .await
            .unwrap();
        }
        assert_eq!(backend.runs.load(Ordering::SeqCst), 2);
        assert_eq!(sink.skipped_count(), 0);
    }

    #[tokio::test]
    async fn test_changed_config_retrains() {
        let f = fixture();
        let backend = CountingBackend::default();
        let sink = RecordingSink::default();

        run_training(
            &backend, &sink, &f.config, &f.train_path, &f.val_path, None, &f.output_dir, false,
        )
        .await
        .unwrap();

        let changed = TrainingConfig { epochs: f.config.epochs + 1, ..f.config.clone() };
        let report = run_training(
            &backend, &sink, &changed, &f.train_path, &f.val_path, None, &f.output_dir, false,
        )
        .await
        .unwrap();

        assert!(!report.skipped);
        assert_eq!(backend.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_interrupted_run_is_not_reused() {
        let f = fixture();
        let backend = CountingBackend::default();
        let sink = RecordingSink::default();

        run_training(
            &backend, &sink, &f.config, &f.train_path, &f.val_path, None, &f.output_dir, false,
        )
        .await
        .unwrap();

        // Simulate a crash between the two metadata writes.
        let mut metadata = TrainingMetadata::load(&f.output_dir).unwrap();
        metadata.completed = false;
        metadata.write(&f.output_dir).unwrap();

        let report = run_training(
            &backend, &sink, &f.config, &f.train_path, &f.val_path, None, &f.output_dir, false,
        )
        .await
        .unwrap();

        assert!(!report.skipped, "incomplete artifact must not be reused");
        assert_eq!(backend.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_backend_leaves_incomplete_metadata() {
        struct FailingBackend;

        #[async_trait]
        impl TrainerBackend for FailingBackend {
            fn id(&self) -> &'static str {
                "failing"
            }

            async fn train(
                &self,
                _request: TrainRequest<'_>,
                _progress: &dyn ProgressSink,
            ) -> Result<TrainOutcome, ProviderError> {
                Err(ProviderError::Trainer("out of memory".to_string()))
            }

            async fn predict(
                &self,
                _model_dir: &Path,
                _examples: &[LabeledExample],
                _options: &PredictOptions,
            ) -> Result<Vec<Prediction>, ProviderError> {
                unimplemented!()
            }
        }

        let f = fixture();
        let sink = RecordingSink::default();
        let err = run_training(
            &FailingBackend, &sink, &f.config, &f.train_path, &f.val_path, None, &f.output_dir,
            false,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("out of memory"));

        // The sidecar exists but is marked incomplete.
        let metadata = TrainingMetadata::load(&f.output_dir).unwrap();
        assert!(!metadata.completed);
    }
}
