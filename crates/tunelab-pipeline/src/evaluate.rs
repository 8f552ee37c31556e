//! The evaluation stage: inference, metric computation, report persistence.

use crate::compare::MetricsReport;
use crate::error::PipelineResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use tunelab_training::{
    read_jsonl_examples, MetricComputer, MetricKind, PredictOptions, TrainerBackend,
};

#[derive(Debug, Clone)]
pub struct EvaluationParams {
    pub model_path: PathBuf,
    pub data_path: PathBuf,
    pub output_file: PathBuf,
    pub batch_size: u32,
    pub max_length: u32,
    pub seed: u64,
    pub metrics: Vec<MetricKind>,
    /// Where to log per-example predictions, if anywhere.
    pub log_predictions: Option<PathBuf>,
}

/// One line of the predictions log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub text: String,
    pub true_label: i64,
    pub predicted_label: i64,
    pub confidence: f64,
}

/// Evaluate the model at `params.model_path` against a JSONL data file and
/// persist the resulting report.
pub async fn run_evaluation(
    backend: &dyn TrainerBackend,
    computer: &dyn MetricComputer,
    params: &EvaluationParams,
) -> PipelineResult<MetricsReport> {
    let examples = read_jsonl_examples(&params.data_path)?;

    let options = PredictOptions {
        batch_size: params.batch_size,
        max_length: params.max_length,
        seed: params.seed,
    };
    let predictions = backend.predict(&params.model_path, &examples, &options).await?;

    if let Some(log_path) = &params.log_predictions {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = String::new();
        for (ex, pred) in examples.iter().zip(predictions.iter()) {
            let record = PredictionRecord {
                text: ex.text.clone(),
                true_label: ex.label,
                predicted_label: pred.label,
                confidence: pred.confidence,
            };
            out.push_str(&serde_json::to_string(&record)?);
            out.push('\n');
        }
        std::fs::write(log_path, out)?;
    }

    let true_labels: Vec<i64> = examples.iter().map(|ex| ex.label).collect();
    let predicted_labels: Vec<i64> = predictions.iter().map(|p| p.label).collect();
    let scores = computer.compute(&true_labels, &predicted_labels, &params.metrics)?;

    let report = MetricsReport {
        model_path: params.model_path.to_string_lossy().to_string(),
        num_samples: examples.len() as u64,
        metrics: scores,
        requested_metrics: params.metrics.iter().map(|m| m.as_str().to_string()).collect(),
    };
    report.write(&params.output_file)?;

    info!(
        model = %params.model_path.display(),
        samples = report.num_samples,
        "evaluation complete"
    );
    Ok(report)
}

/// Default evaluation parameters for a model/data/output triple, matching
/// the experiment pipeline's settings.
pub fn evaluation_params(
    model_path: PathBuf,
    data_path: PathBuf,
    output_file: PathBuf,
    log_predictions: Option<PathBuf>,
    seed: u64,
) -> EvaluationParams {
    EvaluationParams {
        model_path,
        data_path,
        output_file,
        batch_size: 32,
        max_length: 512,
        seed,
        metrics: MetricKind::ALL.to_vec(),
        log_predictions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tunelab_backends::BuiltinMetrics;
    use tunelab_training::{
        write_jsonl_examples, LabeledExample, Prediction, ProgressSink, ProviderError,
        TrainOutcome, TrainRequest,
    };

    /// Predicts the true label for texts containing "good", 0 otherwise.
    struct KeywordBackend;

    #[async_trait]
    impl TrainerBackend for KeywordBackend {
        fn id(&self) -> &'static str {
            "keyword"
        }

        async fn train(
            &self,
            _request: TrainRequest<'_>,
            _progress: &dyn ProgressSink,
        ) -> Result<TrainOutcome, ProviderError> {
            unimplemented!()
        }

        async fn predict(
            &self,
            _model_dir: &Path,
            examples: &[LabeledExample],
            _options: &PredictOptions,
        ) -> Result<Vec<Prediction>, ProviderError> {
            Ok(examples
                .iter()
                .map(|ex| Prediction {
                    label: i64::from(ex.text.contains("good")),
                    confidence: 0.9,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_evaluation_writes_report_and_predictions() {
        let temp = TempDir::new().unwrap();
        let data_path = temp.path().join("test.jsonl");
        write_jsonl_examples(
            &data_path,
            &[
                LabeledExample { text: "good movie".to_string(), label: 1 },
                LabeledExample { text: "bad movie".to_string(), label: 0 },
                LabeledExample { text: "good plot".to_string(), label: 0 },
            ],
        )
        .unwrap();

        let params = evaluation_params(
            temp.path().join("model"),
            data_path,
            temp.path().join("metrics").join("out.json"),
            Some(temp.path().join("predictions").join("out.jsonl")),
            42,
        );

        let report = run_evaluation(&KeywordBackend, &BuiltinMetrics, &params).await.unwrap();

        assert_eq!(report.num_samples, 3);
        // Two of three predictions match the true label.
        assert!((report.metrics["accuracy"] - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.requested_metrics, vec!["accuracy", "f1", "precision", "recall"]);

        let loaded = MetricsReport::load(&params.output_file).unwrap();
        assert_eq!(loaded, report);

        let log = std::fs::read_to_string(params.log_predictions.as_ref().unwrap()).unwrap();
        let records: Vec<PredictionRecord> =
            log.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].true_label, 1);
        assert_eq!(records[0].predicted_label, 1);
        assert!((records[0].confidence - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_evaluation_without_prediction_log() {
        let temp = TempDir::new().unwrap();
        let data_path = temp.path().join("test.jsonl");
        write_jsonl_examples(
            &data_path,
            &[LabeledExample { text: "good".to_string(), label: 1 }],
        )
        .unwrap();

        let params = evaluation_params(
            temp.path().join("model"),
            data_path,
            temp.path().join("out.json"),
            None,
            42,
        );
        let report = run_evaluation(&KeywordBackend, &BuiltinMetrics, &params).await.unwrap();
        assert!((report.metrics["accuracy"] - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_evaluation_fails_on_missing_data() {
        let temp = TempDir::new().unwrap();
        let params = evaluation_params(
            temp.path().join("model"),
            temp.path().join("absent.jsonl"),
            temp.path().join("out.json"),
            None,
            42,
        );
        assert!(run_evaluation(&KeywordBackend, &BuiltinMetrics, &params).await.is_err());
    }
}
