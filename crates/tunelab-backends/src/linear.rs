//! Local trainer backend: a hashed bag-of-words centroid classifier.
//!
//! This is the minimal backend that makes the pipeline runnable without an
//! external ML framework: training computes one centroid per class over
//! hashed token counts, prediction scores cosine similarity against the
//! centroids. Deterministic for a fixed config and dataset.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tunelab_training::{
    LabeledExample, PredictOptions, Prediction, ProgressSink, ProviderError, StageEvent,
    TrainOutcome, TrainRequest, TrainerBackend, MODEL_CONFIG_FILE,
};

const NUM_BUCKETS: usize = 1024;
const MODEL_FILE: &str = "model.json";
const TOKENIZER_FILE: &str = "tokenizer.json";

#[derive(Debug, Clone, Default)]
pub struct LinearClassifierBackend;

impl LinearClassifierBackend {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinearModel {
    classes: Vec<i64>,
    log_priors: Vec<f64>,
    centroids: Vec<Vec<f64>>,
    num_buckets: usize,
}

#[derive(Debug, Serialize)]
struct TokenizerDescriptor {
    #[serde(rename = "type")]
    kind: &'static str,
    num_buckets: usize,
    lowercase: bool,
}

#[derive(Debug, Serialize)]
struct ConfigDescriptor {
    model_type: &'static str,
    num_labels: usize,
}

fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Hash up to `max_length` lowercased alphanumeric tokens into a normalized
/// bucket-count vector.
fn vectorize(text: &str, max_length: usize) -> Vec<f64> {
    let mut counts = vec![0f64; NUM_BUCKETS];
    let lowered = text.to_lowercase();
    for token in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .take(max_length)
    {
        counts[(fnv1a(token) % NUM_BUCKETS as u64) as usize] += 1.0;
    }

    let norm = counts.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for v in &mut counts {
            *v /= norm;
        }
    }
    counts
}

fn softmax_confidence(scores: &[f64], best: usize) -> f64 {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let denom: f64 = scores.iter().map(|s| (s - max).exp()).sum();
    (scores[best] - max).exp() / denom
}

impl LinearModel {
    fn fit(examples: &[LabeledExample], max_length: usize) -> Result<Self, ProviderError> {
        if examples.is_empty() {
            return Err(ProviderError::Trainer("training set is empty".to_string()));
        }

        let mut by_class: BTreeMap<i64, (Vec<f64>, u64)> = BTreeMap::new();
        for ex in examples {
            let vector = vectorize(&ex.text, max_length);
            let entry = by_class
                .entry(ex.label)
                .or_insert_with(|| (vec![0f64; NUM_BUCKETS], 0));
            for (acc, v) in entry.0.iter_mut().zip(vector.iter()) {
                *acc += v;
            }
            entry.1 += 1;
        }

        let total = examples.len() as f64;
        let mut classes = Vec::new();
        let mut log_priors = Vec::new();
        let mut centroids = Vec::new();
        for (class, (mut sum, count)) in by_class {
            let norm = sum.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for v in &mut sum {
                    *v /= norm;
                }
            }
            classes.push(class);
            log_priors.push((count as f64 / total).ln());
            centroids.push(sum);
        }

        Ok(Self { classes, log_priors, centroids, num_buckets: NUM_BUCKETS })
    }

    fn predict_one(&self, text: &str, max_length: usize) -> Prediction {
        let vector = vectorize(text, max_length);
        let scores: Vec<f64> = self
            .centroids
            .iter()
            .map(|centroid| vector.iter().zip(centroid.iter()).map(|(a, b)| a * b).sum())
            .collect();

        let best = scores
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map_or(0, |(i, _)| i);

        Prediction {
            label: self.classes[best],
            confidence: softmax_confidence(&scores, best),
        }
    }

    fn save(&self, dir: &Path) -> Result<(), ProviderError> {
        std::fs::write(dir.join(MODEL_FILE), serde_json::to_string(self)?)?;
        Ok(())
    }

    fn load(dir: &Path) -> Result<Self, ProviderError> {
        let bytes = std::fs::read(dir.join(MODEL_FILE))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Deterministic stand-in for an untrained classification head: labels are
/// drawn from the example's text hash over the label set observed in the
/// evaluation data.
fn untrained_prediction(text: &str, classes: &[i64], seed: u64) -> Prediction {
    let pick = (fnv1a(text) ^ seed) % classes.len() as u64;
    Prediction {
        label: classes[pick as usize],
        confidence: 1.0 / classes.len() as f64,
    }
}

#[async_trait]
impl TrainerBackend for LinearClassifierBackend {
    fn id(&self) -> &'static str {
        "linear-classifier"
    }

    async fn train(
        &self,
        request: TrainRequest<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<TrainOutcome, ProviderError> {
        request.config.validate().map_err(ProviderError::Training)?;
        std::fs::create_dir_all(request.output_dir)?;

        progress.on_event(StageEvent::Message {
            stage: "train".to_string(),
            message: format!(
                "fitting {} on {} examples ({} validation)",
                request.model_name,
                request.train_examples.len(),
                request.val_examples.len()
            ),
        });

        let max_length = request.config.max_length as usize;
        let model = LinearModel::fit(request.train_examples, max_length)?;

        let tokenizer = TokenizerDescriptor {
            kind: "hashing",
            num_buckets: NUM_BUCKETS,
            lowercase: true,
        };
        let config = ConfigDescriptor {
            model_type: "linear-text-classifier",
            num_labels: model.classes.len(),
        };

        // Weights land before the descriptors; the training metadata sidecar
        // is the caller's responsibility and is written after all of these.
        model.save(request.output_dir)?;
        std::fs::write(
            request.output_dir.join(TOKENIZER_FILE),
            serde_json::to_string_pretty(&tokenizer)?,
        )?;
        std::fs::write(
            request.output_dir.join(MODEL_CONFIG_FILE),
            serde_json::to_string_pretty(&config)?,
        )?;

        let correct = request
            .val_examples
            .iter()
            .filter(|ex| model.predict_one(&ex.text, max_length).label == ex.label)
            .count();
        progress.on_event(StageEvent::Message {
            stage: "train".to_string(),
            message: format!(
                "validation accuracy {:.3}",
                if request.val_examples.is_empty() {
                    0.0
                } else {
                    correct as f64 / request.val_examples.len() as f64
                }
            ),
        });

        Ok(TrainOutcome { total_steps: request.config.total_steps(request.train_examples.len()) })
    }

    async fn predict(
        &self,
        model_dir: &Path,
        examples: &[LabeledExample],
        options: &PredictOptions,
    ) -> Result<Vec<Prediction>, ProviderError> {
        if examples.is_empty() {
            return Err(ProviderError::Trainer("no examples to evaluate".to_string()));
        }

        let max_length = options.max_length as usize;

        if model_dir.join(MODEL_FILE).exists() {
            let model = LinearModel::load(model_dir)?;
            let mut predictions = Vec::with_capacity(examples.len());
            for batch in examples.chunks(options.batch_size.max(1) as usize) {
                predictions.extend(batch.iter().map(|ex| model.predict_one(&ex.text, max_length)));
            }
            return Ok(predictions);
        }

        // No locally trained weights: behave like a freshly initialized head.
        let mut classes: Vec<i64> = examples.iter().map(|ex| ex.label).collect();
        classes.sort_unstable();
        classes.dedup();
        Ok(examples
            .iter()
            .map(|ex| untrained_prediction(&ex.text, &classes, options.seed))
            .collect())
    }
}
