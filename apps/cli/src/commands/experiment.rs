//! End-to-end experiment command implementation.

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tunelab_backends::{BuiltinMetrics, HubDatasetProvider, HubModelProvider, LinearClassifierBackend};
use tunelab_pipeline::{
    resolve_profile, ExperimentPipeline, ExperimentRequest, PipelineError, PROFILE_NAMES,
};
use tunelab_training::StdoutProgressSink;

pub async fn execute(
    dataset_name: String,
    model_name: String,
    profile: String,
    output_root: PathBuf,
    cache_dir: Option<PathBuf>,
    force_refresh: bool,
) -> Result<()> {
    // The profile gates everything else; reject it before any side effect.
    let Some(resolved) = resolve_profile(&profile) else {
        bail!("Invalid profile '{profile}'. Must be one of: {}", PROFILE_NAMES.join(", "));
    };

    println!();
    println!("{}", "Model Fine-Tuning Experiment".bold().cyan());
    println!();
    println!("{}", "Experiment Configuration".bold().blue());
    println!("  {}", format!("Dataset: {dataset_name}").dimmed());
    println!("  {}", format!("Model: {model_name}").dimmed());
    println!("  {}", format!("Profile: {} - {}", resolved.name, resolved.description).dimmed());
    println!("  {}", format!("Output root: {}", output_root.display()).dimmed());
    if let Some(cache) = &cache_dir {
        println!("  {}", format!("Cache directory: {}", cache.display()).dimmed());
    }
    println!();

    let mut model_provider = HubModelProvider::new();
    if let Some(cache) = cache_dir {
        model_provider = model_provider.with_cache_dir(cache);
    }

    let pipeline = ExperimentPipeline::new(
        Arc::new(HubDatasetProvider::new()),
        Arc::new(model_provider),
        Arc::new(LinearClassifierBackend::new()),
        Arc::new(BuiltinMetrics),
    )
    .with_progress(Arc::new(StdoutProgressSink));

    let request = ExperimentRequest {
        dataset_name,
        model_name,
        profile,
        output_root,
        force_refresh,
    };

    match pipeline.run(&request).await {
        Ok(summary) => {
            println!();
            println!("{}", "Experiment Complete".bold().green());
            println!();
            println!("{}", "Results Summary".bold().blue());
            println!("  Experiment ID: {}", summary.experiment_id.cyan());
            println!("  Directory: {}", summary.directories.experiment_root.cyan());
            println!();
            println!("{}", "Key Outputs".bold().blue());
            println!("  Base model metrics: {}", summary.files.base_metrics);
            println!("  Fine-tuned metrics: {}", summary.files.fine_tuned_metrics);
            println!("  Comparison report: {}", summary.files.comparison_report);
            println!("  Experiment metadata: {}", summary.directories.experiment_root);
            println!();
            println!("{}", "Next Steps".bold().blue());
            println!("  View comparison: cat {}", summary.files.comparison_report);
            println!("  Use fine-tuned model: {}", summary.directories.fine_tuned_model);
            Ok(())
        }
        Err(error) => {
            println!();
            println!("{}", "Experiment Failed".bold().red());
            println!("{}", format!("Error: {error}").red());
            if let PipelineError::Stage { experiment_dir, .. } = &error {
                println!();
                println!("{}", "Partial results may be available in:".dimmed());
                println!("{}", experiment_dir.display().to_string().dimmed());
            }
            Err(error.into())
        }
    }
}
