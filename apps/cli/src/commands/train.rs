//! Training command implementation.

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::PathBuf;
use tunelab_backends::LinearClassifierBackend;
use tunelab_pipeline::run_training;
use tunelab_training::{StdoutProgressSink, TrainingConfig};

#[derive(Debug, Clone)]
pub struct TrainArgs {
    pub model_name: String,
    pub train_data: PathBuf,
    pub val_data: PathBuf,
    pub output_dir: PathBuf,
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
    pub force: bool,
}

pub async fn execute(args: TrainArgs) -> Result<()> {
    println!("{}", "Training Configuration".bold().blue());
    println!("  {}", format!("Model: {}", args.model_name).dimmed());
    println!("  {}", format!("Training data: {}", args.train_data.display()).dimmed());
    println!("  {}", format!("Validation data: {}", args.val_data.display()).dimmed());
    println!("  {}", format!("Output directory: {}", args.output_dir.display()).dimmed());
    println!(
        "  {}",
        format!(
            "Epochs: {}, batch size: {}, learning rate: {}",
            args.epochs, args.batch_size, args.learning_rate
        )
        .dimmed()
    );
    println!("  {}", format!("FP16: {}, seed: {}", args.fp16, args.seed).dimmed());

    if !args.train_data.exists() {
        bail!("Training data not found: {}", args.train_data.display());
    }
    if !args.val_data.exists() {
        bail!("Validation data not found: {}", args.val_data.display());
    }

    let config = TrainingConfig {
        model_name: args.model_name,
        epochs: args.epochs,
        batch_size: args.batch_size,
        learning_rate: args.learning_rate,
        warmup_steps: args.warmup_steps,
        save_steps: args.save_steps,
        logging_steps: args.logging_steps,
        eval_steps: args.eval_steps,
        max_length: args.max_length,
        gradient_accumulation_steps: args.gradient_accumulation_steps,
        fp16: args.fp16,
        seed: args.seed,
    };
    config.validate()?;

    let backend = LinearClassifierBackend::new();
    let report = run_training(
        &backend,
        &StdoutProgressSink,
        &config,
        &args.train_data,
        &args.val_data,
        None,
        &args.output_dir,
        args.force,
    )
    .await?;

    println!();
    if report.skipped {
        println!("{}", "Training skipped - cached model is up to date".bold().yellow());
    } else {
        println!("{}", "Training complete".bold().green());
        println!("  Total steps: {}", report.metadata.total_steps.to_string().cyan());
    }
    println!(
        "  Samples: {} train / {} validation",
        report.metadata.training_samples.to_string().cyan(),
        report.metadata.validation_samples.to_string().cyan()
    );
    println!("  Model: {}", args.output_dir.display().to_string().dimmed());
    Ok(())
}
