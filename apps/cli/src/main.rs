//! Tunelab CLI - fine-tuning experiment harness
//!
//! This CLI provides a `tunelab` command for downloading datasets and
//! models, fine-tuning text classifiers with a training cache, evaluating
//! them, and running end-to-end comparison experiments.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::types::{DatasetCommand, ModelCommand};

/// Tunelab - fine-tune and evaluate text-classification models
#[derive(Parser, Debug)]
#[command(
    name = "tunelab",
    author,
    version,
    about = "Tunelab - fine-tuning experiment harness",
    long_about = "Tunelab downloads datasets and pretrained models, fine-tunes text\nclassifiers with a fingerprint-based training cache, evaluates them, and\nchains everything into reproducible end-to-end experiments."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dataset management commands
    #[command(subcommand)]
    Dataset(DatasetCommand),

    /// Model management commands
    #[command(subcommand)]
    Model(ModelCommand),

    /// Fine-tune a model on training data
    Train {
        /// Model to fine-tune (HuggingFace model name)
        #[arg(long)]
        model_name: String,

        /// Path to training data (JSONL format)
        #[arg(long)]
        train_data: PathBuf,

        /// Path to validation data (JSONL format)
        #[arg(long)]
        val_data: PathBuf,

        /// Directory to save the fine-tuned model
        #[arg(long)]
        output_dir: PathBuf,

        /// Number of training epochs
        #[arg(long, default_value_t = 3)]
        epochs: u32,

        /// Training batch size
        #[arg(long, default_value_t = 16)]
        batch_size: u32,

        /// Learning rate
        #[arg(long, default_value_t = 2e-5)]
        learning_rate: f64,

        /// Number of warmup steps
        #[arg(long, default_value_t = 100)]
        warmup_steps: u32,

        /// Save checkpoint every N steps
        #[arg(long, default_value_t = 500)]
        save_steps: u32,

        /// Log metrics every N steps
        #[arg(long, default_value_t = 50)]
        logging_steps: u32,

        /// Evaluate every N steps
        #[arg(long, default_value_t = 250)]
        eval_steps: u32,

        /// Maximum sequence length
        #[arg(long, default_value_t = 512)]
        max_length: u32,

        /// Number of gradient accumulation steps
        #[arg(long, default_value_t = 1)]
        gradient_accumulation_steps: u32,

        /// Enable mixed precision training (FP16)
        #[arg(long)]
        fp16: bool,

        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Retrain even when the training cache is valid
        #[arg(long)]
        force: bool,
    },

    /// Evaluate model performance on test data
    Evaluate {
        /// Path to model (base or fine-tuned)
        #[arg(long)]
        model_path: PathBuf,

        /// Path to test/validation data (JSONL format)
        #[arg(long)]
        test_data: PathBuf,

        /// Path to save metrics (JSON format)
        #[arg(long)]
        output_file: PathBuf,

        /// Batch size for inference
        #[arg(long, default_value_t = 32)]
        batch_size: u32,

        /// Maximum sequence length
        #[arg(long, default_value_t = 512)]
        max_length: u32,

        /// Metrics to compute (can specify multiple)
        #[arg(long, num_args = 1.., default_values_t = ["accuracy".to_string(), "f1".to_string(), "precision".to_string(), "recall".to_string()])]
        metrics: Vec<String>,

        /// Optional path to save predictions (JSONL format)
        #[arg(long)]
        log_predictions: Option<PathBuf>,
    },

    /// Compare baseline and fine-tuned model performance
    Compare {
        /// Path to baseline model metrics (JSON format)
        #[arg(long)]
        baseline_metrics: PathBuf,

        /// Path to fine-tuned model metrics (JSON format)
        #[arg(long)]
        fine_tuned_metrics: PathBuf,

        /// Directory to save comparison results
        #[arg(long)]
        output_dir: PathBuf,

        /// Output format: 'table' or 'json'
        #[arg(long, default_value = "table")]
        format: String,

        /// Save a plain-text report
        #[arg(long)]
        save_report: bool,
    },

    /// Run a complete fine-tuning experiment end-to-end
    RunExperiment {
        /// Dataset name from the HuggingFace Hub (e.g., 'imdb')
        #[arg(long)]
        dataset_name: String,

        /// Model name from the HuggingFace Hub (e.g., 'distilbert-base-uncased')
        #[arg(long)]
        model_name: String,

        /// Training profile: 'quick', 'default', or 'full'
        #[arg(long, default_value = "default")]
        profile: String,

        /// Root directory for experiments
        #[arg(long, default_value = "./experiments")]
        output_root: PathBuf,

        /// Hub cache directory for model downloads
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Re-download the base model even when a complete copy exists
        #[arg(long)]
        force_refresh: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber =
        FmtSubscriber::builder().with_max_level(level).without_time().with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Dataset(command) => commands::dataset::execute(command).await,
        Command::Model(command) => commands::model::execute(command).await,
        Command::Train {
            model_name,
            train_data,
            val_data,
            output_dir,
            epochs,
            batch_size,
            learning_rate,
            warmup_steps,
            save_steps,
            logging_steps,
            eval_steps,
            max_length,
            gradient_accumulation_steps,
            fp16,
            seed,
            force,
        } => {
            commands::train::execute(commands::train::TrainArgs {
                model_name,
                train_data,
                val_data,
                output_dir,
                epochs,
                batch_size,
                learning_rate,
                warmup_steps,
                save_steps,
                logging_steps,
                eval_steps,
                max_length,
                gradient_accumulation_steps,
                fp16,
                seed,
                force,
            })
            .await
        }
        Command::Evaluate {
            model_path,
            test_data,
            output_file,
            batch_size,
            max_length,
            metrics,
            log_predictions,
        } => {
            commands::evaluate::execute(
                model_path,
                test_data,
                output_file,
                batch_size,
                max_length,
                metrics,
                log_predictions,
            )
            .await
        }
        Command::Compare { baseline_metrics, fine_tuned_metrics, output_dir, format, save_report } => {
            commands::compare::execute(
                baseline_metrics,
                fine_tuned_metrics,
                output_dir,
                format,
                save_report,
            )
        }
        Command::RunExperiment {
            dataset_name,
            model_name,
            profile,
            output_root,
            cache_dir,
            force_refresh,
        } => {
            commands::experiment::execute(
                dataset_name,
                model_name,
                profile,
                output_root,
                cache_dir,
                force_refresh,
            )
            .await
        }
    }
}
