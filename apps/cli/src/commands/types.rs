//! Subcommand type definitions shared between main.rs and tests.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum DatasetCommand {
    /// Download a dataset from the HuggingFace Hub
    Download {
        /// Dataset name (e.g., 'imdb', 'ag_news')
        #[arg(long)]
        name: String,

        /// Directory to save the downloaded dataset
        #[arg(long)]
        output_dir: PathBuf,

        /// Maximum number of samples per split (useful for testing)
        #[arg(long)]
        max_samples: Option<usize>,

        /// Re-download even when the dataset is already materialized
        #[arg(long)]
        force: bool,
    },

    /// Split a JSONL dataset into training and validation sets
    Split {
        /// Path to the input data (JSONL format)
        #[arg(long)]
        input_path: PathBuf,

        /// Directory to save train/validation splits
        #[arg(long)]
        output_dir: PathBuf,

        /// Proportion of data for training (e.g., 0.9)
        #[arg(long)]
        train_ratio: f64,

        /// Proportion of data for validation (e.g., 0.1)
        #[arg(long)]
        val_ratio: f64,

        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Maintain class distribution across the splits
        #[arg(long)]
        stratify: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ModelCommand {
    /// Download a pre-trained model from the HuggingFace Hub
    Download {
        /// Model name (e.g., 'distilbert-base-uncased')
        #[arg(long)]
        name: String,

        /// Directory to save the downloaded model
        #[arg(long)]
        output_dir: PathBuf,

        /// Hub cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Re-download even when a complete copy exists
        #[arg(long)]
        force: bool,
    },

    /// Publish a model directory into the local registry
    Upload {
        /// Path to the model directory to publish
        #[arg(long)]
        model_dir: PathBuf,

        /// Name to publish the model under
        #[arg(long)]
        name: String,

        /// Registry root directory
        #[arg(long, default_value = "model-registry")]
        registry: PathBuf,
    },
}
