//! Evaluation command implementation.

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::str::FromStr;
use tunelab_backends::{BuiltinMetrics, LinearClassifierBackend};
use tunelab_pipeline::{run_evaluation, EvaluationParams};
use tunelab_training::MetricKind;

pub async fn execute(
    model_path: PathBuf,
    test_data: PathBuf,
    output_file: PathBuf,
    batch_size: u32,
    max_length: u32,
    metrics: Vec<String>,
    log_predictions: Option<PathBuf>,
) -> Result<()> {
    println!("{}", "Evaluation Configuration".bold().blue());
    println!("  {}", format!("Model: {}", model_path.display()).dimmed());
    println!("  {}", format!("Test data: {}", test_data.display()).dimmed());
    println!("  {}", format!("Metrics: {}", metrics.join(", ")).dimmed());
    if let Some(log) = &log_predictions {
        println!("  {}", format!("Predictions log: {}", log.display()).dimmed());
    }

    // Validate everything before any side effect.
    let requested = metrics
        .iter()
        .map(|name| MetricKind::from_str(name))
        .collect::<Result<Vec<_>, _>>()?;
    if !model_path.exists() {
        bail!("Model not found: {}", model_path.display());
    }
    if !test_data.exists() {
        bail!("Test data not found: {}", test_data.display());
    }

    let params = EvaluationParams {
        model_path,
        data_path: test_data,
        output_file: output_file.clone(),
        batch_size,
        max_length,
        seed: 42,
        metrics: requested,
        log_predictions,
    };
    let report = run_evaluation(&LinearClassifierBackend::new(), &BuiltinMetrics, &params).await?;

    println!();
    println!("{}", "Evaluation complete".bold().green());
    println!("  Samples: {}", report.num_samples.to_string().cyan());
    for (name, value) in &report.metrics {
        println!("  {name:<12} {}", format!("{value:.4}").cyan());
    }
    println!("  Saved to: {}", output_file.display().to_string().dimmed());
    Ok(())
}
