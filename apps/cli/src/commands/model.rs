//! Model command implementations.

use crate::commands::types::ModelCommand;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tunelab_backends::HubModelProvider;
use tunelab_training::ModelProvider;

pub async fn execute(command: ModelCommand) -> Result<()> {
    match command {
        ModelCommand::Download { name, output_dir, cache_dir, force } => {
            download(name, output_dir, cache_dir, force).await
        }
        ModelCommand::Upload { model_dir, name, registry } => {
            upload(model_dir, name, registry).await
        }
    }
}

async fn download(
    name: String,
    output_dir: PathBuf,
    cache_dir: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    println!("{} {}", "Downloading model:".bold().blue(), name);
    println!("  {}", format!("Output directory: {}", output_dir.display()).dimmed());
    if let Some(cache) = &cache_dir {
        println!("  {}", format!("Cache directory: {}", cache.display()).dimmed());
    }

    let mut provider = HubModelProvider::new();
    if let Some(cache) = cache_dir {
        provider = provider.with_cache_dir(cache);
    }

    let artifact = provider
        .download(&name, &output_dir, force)
        .await
        .with_context(|| format!("Failed to download model '{name}'"))?;

    println!();
    println!("{}", "Model ready".bold().green());
    println!("  Type: {}", artifact.model_type.cyan());
    println!("  Saved to: {}", artifact.saved_path.display().to_string().dimmed());
    Ok(())
}

async fn upload(model_dir: PathBuf, name: String, registry: PathBuf) -> Result<()> {
    println!("{} {}", "Publishing model:".bold().blue(), name);
    println!("  {}", format!("Source: {}", model_dir.display()).dimmed());

    if !model_dir.exists() {
        anyhow::bail!("Model directory not found: {}", model_dir.display());
    }

    let provider = HubModelProvider::new().with_registry_dir(registry);
    let published = provider
        .upload(&model_dir, &name)
        .await
        .with_context(|| format!("Failed to publish model '{name}'"))?;

    println!();
    println!("{}", "Model published".bold().green());
    println!("  Location: {}", published.display().to_string().cyan());
    Ok(())
}
