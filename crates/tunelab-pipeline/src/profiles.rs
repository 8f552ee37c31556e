//! Named training presets.
//!
//! The table is a fixed enumeration resolved by name; entries are complete
//! (every hyperparameter pinned) so a profile plus a model name fully
//! determines the training config.

use tunelab_training::TrainingConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingProfile {
    pub name: &'static str,
    pub description: &'static str,
    /// Per-split cap applied when downloading the dataset; `None` keeps
    /// everything.
    pub max_samples: Option<usize>,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    pub warmup_steps: u32,
    pub save_steps: u32,
    pub logging_steps: u32,
    pub eval_steps: u32,
}

pub const PROFILE_NAMES: [&str; 3] = ["quick", "default", "full"];

pub fn resolve(name: &str) -> Option<TrainingProfile> {
    match name {
        "quick" => Some(TrainingProfile {
            name: "quick",
            description: "Fast testing profile with minimal samples",
            max_samples: Some(100),
            epochs: 1,
            batch_size: 32,
            learning_rate: 2e-5,
            warmup_steps: 50,
            save_steps: 500,
            logging_steps: 50,
            eval_steps: 250,
        }),
        "default" => Some(TrainingProfile {
            name: "default",
            description: "Balanced training profile for typical experiments",
            max_samples: Some(1000),
            epochs: 3,
            batch_size: 16,
            learning_rate: 2e-5,
            warmup_steps: 100,
            save_steps: 500,
            logging_steps: 50,
            eval_steps: 250,
        }),
        "full" => Some(TrainingProfile {
            name: "full",
            description: "Complete training with all available data",
            max_samples: None,
            epochs: 5,
            batch_size: 8,
            learning_rate: 2e-5,
            warmup_steps: 200,
            save_steps: 1000,
            logging_steps: 100,
            eval_steps: 500,
        }),
        _ => None,
    }
}

impl TrainingProfile {
    /// Expand the profile into a full training config for `model_name`.
    /// Sequence length, gradient accumulation, precision, and seed are fixed
    /// at the experiment level rather than varied per profile.
    pub fn training_config(&self, model_name: &str) -> TrainingConfig {
        TrainingConfig {
            model_name: model_name.to_string(),
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            warmup_steps: self.warmup_steps,
            save_steps: self.save_steps,
            logging_steps: self.logging_steps,
            eval_steps: self.eval_steps,
            max_length: 512,
            gradient_accumulation_steps: 2,
            fp16: false,
            seed: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_named_profiles_resolve() {
        for name in PROFILE_NAMES {
            assert!(resolve(name).is_some(), "profile {name} missing");
        }
    }

    #[test]
    fn test_unknown_profile_is_rejected() {
        assert!(resolve("turbo").is_none());
        assert!(resolve("").is_none());
    }

    #[test]
    fn test_quick_profile_values() {
        let quick = resolve("quick").unwrap();
        assert_eq!(quick.max_samples, Some(100));
        assert_eq!(quick.epochs, 1);
        assert_eq!(quick.batch_size, 32);
    }

    #[test]
    fn test_full_profile_has_no_sample_cap() {
        assert_eq!(resolve("full").unwrap().max_samples, None);
    }

    #[test]
    fn test_training_config_carries_fixed_experiment_settings() {
        let config = resolve("default").unwrap().training_config("distilbert-base-uncased");
        assert_eq!(config.model_name, "distilbert-base-uncased");
        assert_eq!(config.epochs, 3);
        assert_eq!(config.max_length, 512);
        assert_eq!(config.gradient_accumulation_steps, 2);
        assert!(!config.fp16);
        assert_eq!(config.seed, 42);
        config.validate().unwrap();
    }
}
