//! Model provider backed by the HuggingFace hub, plus a local publish
//! registry.

use async_trait::async_trait;
use hf_hub::api::tokio::ApiBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tunelab_training::{has_model_outputs, ModelArtifact, ModelProvider, ProviderError};

/// Weight files probed on the hub, in preference order.
const WEIGHT_CANDIDATES: &[&str] = &["model.safetensors", "pytorch_model.bin"];

/// Tokenizer files; at least one of the required set must exist.
const TOKENIZER_REQUIRED: &[&str] = &["tokenizer.json", "vocab.txt"];
const TOKENIZER_OPTIONAL: &[&str] = &["tokenizer_config.json", "special_tokens_map.json"];

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone)]
pub struct HubModelProvider {
    cache_dir: Option<PathBuf>,
    registry_dir: PathBuf,
}

impl Default for HubModelProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HubModelProvider {
    pub fn new() -> Self {
        Self { cache_dir: None, registry_dir: PathBuf::from("model-registry") }
    }

    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = Some(cache_dir);
        self
    }

    pub fn with_registry_dir(mut self, registry_dir: PathBuf) -> Self {
        self.registry_dir = registry_dir;
        self
    }

    async fn snapshot(&self, name: &str, dest: &Path) -> Result<(), ProviderError> {
        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(cache) = &self.cache_dir {
            builder = builder.with_cache_dir(cache.clone());
        }
        let api = builder
            .build()
            .map_err(|e| ProviderError::Model(format!("hub client init failed: {e}")))?;
        let repo = api.model(name.to_string());

        std::fs::create_dir_all(dest)?;

        let config = repo.get(CONFIG_FILE).await.map_err(|e| {
            ProviderError::Model(format!("download of {CONFIG_FILE} for '{name}' failed: {e}"))
        })?;
        std::fs::copy(&config, dest.join(CONFIG_FILE))?;

        let mut got_weights = false;
        for candidate in WEIGHT_CANDIDATES {
            if let Ok(path) = repo.get(candidate).await {
                std::fs::copy(&path, dest.join(candidate))?;
                got_weights = true;
                break;
            }
        }
        if !got_weights {
            return Err(ProviderError::Model(format!(
                "'{name}' has none of the supported weight files ({})",
                WEIGHT_CANDIDATES.join(", ")
            )));
        }

        let mut got_tokenizer = false;
        for candidate in TOKENIZER_REQUIRED {
            if let Ok(path) = repo.get(candidate).await {
                std::fs::copy(&path, dest.join(candidate))?;
                got_tokenizer = true;
            }
        }
        if !got_tokenizer {
            return Err(ProviderError::Model(format!("'{name}' has no tokenizer files")));
        }
        for candidate in TOKENIZER_OPTIONAL {
            if let Ok(path) = repo.get(candidate).await {
                std::fs::copy(&path, dest.join(candidate))?;
            }
        }

        Ok(())
    }
}

/// Read `model_type` from a downloaded config descriptor.
fn model_type_of(model_dir: &Path) -> String {
    std::fs::read(model_dir.join(CONFIG_FILE))
        .ok()
        .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
        .and_then(|config| config.get("model_type").and_then(|v| v.as_str().map(String::from)))
        .unwrap_or_else(|| "unknown".to_string())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' || c.is_whitespace() { '_' } else { c })
        .collect()
}

#[async_trait]
impl ModelProvider for HubModelProvider {
    fn id(&self) -> &'static str {
        "hf-hub"
    }

    async fn download(
        &self,
        name: &str,
        dest: &Path,
        force: bool,
    ) -> Result<ModelArtifact, ProviderError> {
        if !force && has_model_outputs(dest) {
            if let Ok(existing) = ModelArtifact::load(dest) {
                debug!(model = name, "reusing existing model artifact");
                return Ok(existing);
            }
        }

        info!(model = name, dest = %dest.display(), "downloading model");
        self.snapshot(name, dest).await?;

        let artifact = ModelArtifact {
            name: name.to_string(),
            model_type: model_type_of(dest),
            saved_path: dest.to_path_buf(),
            cache_dir: self.cache_dir.clone(),
        };
        artifact.write(dest)?;
        Ok(artifact)
    }

    async fn upload(&self, model_dir: &Path, name: &str) -> Result<PathBuf, ProviderError> {
        if !has_model_outputs(model_dir) {
            return Err(ProviderError::Model(format!(
                "{} is not a complete model directory (missing config or weights)",
                model_dir.display()
            )));
        }

        let published = self.registry_dir.join(sanitize_name(name));
        std::fs::create_dir_all(&published)?;
        for entry in std::fs::read_dir(model_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                std::fs::copy(entry.path(), published.join(entry.file_name()))?;
            }
        }

        let artifact = ModelArtifact {
            name: name.to_string(),
            model_type: model_type_of(model_dir),
            saved_path: published.clone(),
            cache_dir: None,
        };
        artifact.write(&published)?;

        info!(model = name, path = %published.display(), "published model");
        Ok(published)
    }
}
