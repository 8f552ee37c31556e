use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Hyperparameters for one fine-tuning run.
///
/// Two configs are equivalent iff every field compares equal; equivalence is
/// what the fingerprint captures, independent of field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub model_name: String,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    pub warmup_steps: u32,
    pub save_steps: u32,
    pub logging_steps: u32,
    pub eval_steps: u32,
    pub max_length: u32,
    pub gradient_accumulation_steps: u32,
    pub fp16: bool,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_name: String::new(),
            epochs: 3,
            batch_size: 16,
            learning_rate: 2e-5,
            warmup_steps: 100,
            save_steps: 500,
            logging_steps: 50,
            eval_steps: 250,
            max_length: 512,
            gradient_accumulation_steps: 1,
            fp16: false,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.model_name.trim().is_empty() {
            return Err(TrainingError::InvalidConfig("model_name is required".to_string()));
        }
        if self.epochs == 0 {
            return Err(TrainingError::InvalidConfig("epochs must be >= 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::InvalidConfig("batch_size must be >= 1".to_string()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TrainingError::InvalidConfig("learning_rate must be > 0".to_string()));
        }
        if self.max_length == 0 {
            return Err(TrainingError::InvalidConfig("max_length must be >= 1".to_string()));
        }
        if self.gradient_accumulation_steps == 0 {
            return Err(TrainingError::InvalidConfig(
                "gradient_accumulation_steps must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Optimizer steps for a dataset of `num_examples`, accounting for
    /// gradient accumulation.
    pub fn total_steps(&self, num_examples: usize) -> u64 {
        let effective_batch = u64::from(self.batch_size) * u64::from(self.gradient_accumulation_steps);
        let steps_per_epoch = (num_examples as u64).div_ceil(effective_batch).max(1);
        steps_per_epoch * u64::from(self.epochs)
    }
}

/// SHA-256 digest of a config's canonical serialization, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigFingerprint(pub String);

impl std::fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Fingerprint a config for use as a training-cache key.
///
/// The config is flattened to key/value pairs, keys are sorted
/// lexicographically, and the resulting `key=value` lines are hashed, so the
/// digest never depends on field declaration or insertion order.
pub fn fingerprint(config: &TrainingConfig) -> TrainingResult<ConfigFingerprint> {
    config.validate()?;

    let value = serde_json::to_value(config)?;
    let fields = value
        .as_object()
        .ok_or_else(|| TrainingError::InvalidConfig("config did not serialize to an object".to_string()))?;

    let sorted: BTreeMap<&String, &serde_json::Value> = fields.iter().collect();
    let mut canonical = String::new();
    for (key, val) in sorted {
        canonical.push_str(key);
        canonical.push('=');
        canonical.push_str(&val.to_string());
        canonical.push('\n');
    }

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(ConfigFingerprint(hex::encode(hasher.finalize())))
}
