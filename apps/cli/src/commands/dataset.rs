//! Dataset command implementations.

use crate::commands::types::DatasetCommand;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tunelab_backends::HubDatasetProvider;
use tunelab_pipeline::{materialize_dataset, split_examples, validate_ratios, SplitSpec};
use tunelab_training::{read_jsonl_examples, write_jsonl_examples, DatasetProvider};

pub async fn execute(command: DatasetCommand) -> Result<()> {
    match command {
        DatasetCommand::Download { name, output_dir, max_samples, force } => {
            download(name, output_dir, max_samples, force).await
        }
        DatasetCommand::Split { input_path, output_dir, train_ratio, val_ratio, seed, stratify } => {
            split(input_path, output_dir, train_ratio, val_ratio, seed, stratify)
        }
    }
}

async fn download(
    name: String,
    output_dir: PathBuf,
    max_samples: Option<usize>,
    force: bool,
) -> Result<()> {
    println!("{} {}", "Downloading dataset:".bold().blue(), name);
    println!("  {}", format!("Output directory: {}", output_dir.display()).dimmed());
    if let Some(cap) = max_samples {
        println!("  {}", format!("Max samples per split: {cap}").dimmed());
    }

    let manifest_path = output_dir.join("metadata.json");
    if manifest_path.exists() && !force {
        println!();
        println!("{}", "Dataset already downloaded (use --force to re-download).".yellow());
        return Ok(());
    }

    let provider = HubDatasetProvider::new();
    let dataset = provider
        .fetch(&name, max_samples)
        .await
        .with_context(|| format!("Failed to download dataset '{name}'"))?;
    let manifest = materialize_dataset(&dataset, &output_dir, max_samples)?;

    println!();
    println!("{}", "Dataset downloaded".bold().green());
    println!("  Splits: {}", manifest.splits.join(", ").cyan());
    println!("  Total samples: {}", manifest.total_samples.to_string().cyan());
    println!("  Manifest: {}", manifest_path.display().to_string().dimmed());
    Ok(())
}

fn split(
    input_path: PathBuf,
    output_dir: PathBuf,
    train_ratio: f64,
    val_ratio: f64,
    seed: u64,
    stratify: bool,
) -> Result<()> {
    println!("{}", "Splitting dataset".bold().blue());
    println!("  {}", format!("Input: {}", input_path.display()).dimmed());
    println!("  {}", format!("Train/Val ratio: {train_ratio}/{val_ratio}, seed {seed}").dimmed());

    // Fail on bad arguments before touching the filesystem.
    validate_ratios(train_ratio, val_ratio)?;

    if !input_path.exists() {
        bail!("Input data not found: {}", input_path.display());
    }

    let examples = read_jsonl_examples(&input_path)?;
    let spec = SplitSpec { train_ratio, val_ratio, seed, stratify };
    let (train, val) = split_examples(&examples, &spec)?;

    std::fs::create_dir_all(&output_dir)?;
    let train_path = output_dir.join("train.jsonl");
    let val_path = output_dir.join("val.jsonl");
    write_jsonl_examples(&train_path, &train)?;
    write_jsonl_examples(&val_path, &val)?;

    println!();
    println!("{}", "Split complete".bold().green());
    println!("  Train: {} examples -> {}", train.len().to_string().cyan(), train_path.display());
    println!("  Validation: {} examples -> {}", val.len().to_string().cyan(), val_path.display());
    Ok(())
}
