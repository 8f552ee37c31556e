use crate::config::TrainingConfig;
use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

pub const TRAINING_METADATA_FILE: &str = "training_metadata.json";

/// Sidecar written into the fine-tuned model directory.
///
/// Created with `completed: false` before the trainer runs and rewritten
/// with `completed: true` only once every model/tokenizer file is on disk,
/// so an interrupted run is never mistaken for a usable artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub model_name: String,
    pub train_data_path: String,
    pub train_data_mtime: f64,
    pub val_data_path: String,
    pub val_data_mtime: f64,
    pub config_hash: String,
    pub training_params: TrainingConfig,
    pub training_samples: u64,
    pub validation_samples: u64,
    pub total_steps: u64,
    pub completed: bool,
}

impl TrainingMetadata {
    pub fn path_for(model_dir: &Path) -> PathBuf {
        model_dir.join(TRAINING_METADATA_FILE)
    }

    pub fn load(model_dir: &Path) -> TrainingResult<Self> {
        let path = Self::path_for(model_dir);
        let bytes = std::fs::read(&path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            TrainingError::Metadata(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write the sidecar atomically: the document is staged next to its
    /// destination and renamed into place, so readers never observe a
    /// partially written file.
    pub fn write(&self, model_dir: &Path) -> TrainingResult<()> {
        let path = Self::path_for(model_dir);
        let staged = path.with_extension("json.tmp");
        std::fs::write(&staged, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&staged, &path)?;
        Ok(())
    }
}

/// Modification time of a file as fractional seconds since the epoch,
/// matching the representation stored in the sidecar.
pub fn file_mtime(path: &Path) -> TrainingResult<f64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).map_err(|e| {
        TrainingError::Metadata(format!("mtime before epoch for {}: {}", path.display(), e))
    })?;
    Ok(since_epoch.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fingerprint;
    use tempfile::TempDir;

    fn sample_metadata() -> TrainingMetadata {
        let config = TrainingConfig {
            model_name: "distilbert-base-uncased".to_string(),
            ..Default::default()
        };
        TrainingMetadata {
            model_name: config.model_name.clone(),
            train_data_path: "/data/train/data.jsonl".to_string(),
            train_data_mtime: 1_700_000_000.5,
            val_data_path: "/data/validation/data.jsonl".to_string(),
            val_data_mtime: 1_700_000_001.25,
            config_hash: fingerprint(&config).unwrap().0,
            training_params: config,
            training_samples: 800,
            validation_samples: 200,
            total_steps: 150,
            completed: true,
        }
    }

    #[test]
    fn test_metadata_round_trip() {
        let temp = TempDir::new().unwrap();
        let metadata = sample_metadata();
        metadata.write(temp.path()).unwrap();

        let loaded = TrainingMetadata::load(temp.path()).unwrap();
        assert_eq!(loaded, metadata);
    }

    #[test]
    fn test_write_leaves_no_staging_file() {
        let temp = TempDir::new().unwrap();
        sample_metadata().write(temp.path()).unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec![TRAINING_METADATA_FILE.to_string()]);
    }

    #[test]
    fn test_load_rejects_corrupt_sidecar() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(TRAINING_METADATA_FILE), "{not json").unwrap();
        assert!(matches!(
            TrainingMetadata::load(temp.path()),
            Err(TrainingError::Metadata(_))
        ));
    }

    #[test]
    fn test_file_mtime_matches_filesystem() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("input.jsonl");
        std::fs::write(&path, "{}").unwrap();

        let a = file_mtime(&path).unwrap();
        let b = file_mtime(&path).unwrap();
        assert_eq!(a, b);
        assert!(a > 0.0);
    }
}
