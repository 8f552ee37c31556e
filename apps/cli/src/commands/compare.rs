//! Comparison command implementation.

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::PathBuf;
use tunelab_pipeline::{compare_reports, MetricsReport};

pub fn execute(
    baseline_metrics: PathBuf,
    fine_tuned_metrics: PathBuf,
    output_dir: PathBuf,
    format: String,
    save_report: bool,
) -> Result<()> {
    println!("{}", "Comparison Configuration".bold().blue());
    println!("  {}", format!("Baseline metrics: {}", baseline_metrics.display()).dimmed());
    println!("  {}", format!("Fine-tuned metrics: {}", fine_tuned_metrics.display()).dimmed());
    println!("  {}", format!("Output directory: {}", output_dir.display()).dimmed());

    let valid_formats = ["table", "json"];
    if !valid_formats.contains(&format.as_str()) {
        bail!("Invalid format '{format}'. Must be one of: {}", valid_formats.join(", "));
    }
    if !baseline_metrics.exists() {
        bail!("Baseline metrics not found: {}", baseline_metrics.display());
    }
    if !fine_tuned_metrics.exists() {
        bail!("Fine-tuned metrics not found: {}", fine_tuned_metrics.display());
    }

    let baseline = MetricsReport::load(&baseline_metrics)?;
    let fine_tuned = MetricsReport::load(&fine_tuned_metrics)?;
    let result = compare_reports(&baseline, &fine_tuned);

    std::fs::create_dir_all(&output_dir)?;
    let comparison_path = output_dir.join("comparison.json");
    result.write(&comparison_path)?;

    println!();
    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print!("{}", result.render_text()),
    }

    if save_report {
        let report_path = output_dir.join("report.txt");
        std::fs::write(&report_path, result.render_text())?;
        println!("Report saved to: {}", report_path.display().to_string().dimmed());
    }
    println!("Comparison saved to: {}", comparison_path.display().to_string().dimmed());
    Ok(())
}
