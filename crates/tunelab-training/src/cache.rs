use crate::config::{fingerprint, TrainingConfig};
use crate::error::TrainingResult;
use crate::metadata::{file_mtime, TrainingMetadata};
use std::path::{Path, PathBuf};

/// Configuration descriptor every usable model directory must contain.
pub const MODEL_CONFIG_FILE: &str = "config.json";

/// Accepted weight serialization formats; a model directory is usable when
/// at least one of these is present.
pub const WEIGHT_FILES: &[&str] =
    &["model.safetensors", "pytorch_model.bin", "model.ckpt", "model.json"];

/// Outcome of a cache consultation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// The existing artifact satisfies the request; training can be skipped.
    Valid,
    /// The artifact cannot be reused, for the given reason.
    Invalid(CacheMissReason),
}

impl CacheStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Why a cached artifact was rejected. These are not errors: callers log
/// them and re-run training.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMissReason {
    MetadataMissing,
    MetadataCorrupt(String),
    IncompleteRun,
    ModelChanged { stored: String, requested: String },
    ConfigChanged { stored: String, requested: String },
    InputPathChanged { stored: String, requested: String },
    InputMissing(PathBuf),
    InputModified(PathBuf),
    OutputsMissing(PathBuf),
}

impl std::fmt::Display for CacheMissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MetadataMissing => write!(f, "no training metadata found"),
            Self::MetadataCorrupt(detail) => write!(f, "training metadata unreadable: {detail}"),
            Self::IncompleteRun => write!(f, "previous training run did not complete"),
            Self::ModelChanged { stored, requested } => {
                write!(f, "base model changed ({stored} -> {requested})")
            }
            Self::ConfigChanged { stored, requested } => {
                write!(f, "training config changed ({stored} -> {requested})")
            }
            Self::InputPathChanged { stored, requested } => {
                write!(f, "input path changed ({stored} -> {requested})")
            }
            Self::InputMissing(path) => write!(f, "input missing: {}", path.display()),
            Self::InputModified(path) => write!(f, "input modified: {}", path.display()),
            Self::OutputsMissing(dir) => {
                write!(f, "model outputs missing in {}", dir.display())
            }
        }
    }
}

/// Decide whether the artifact in `model_dir` can stand in for a training
/// run with `requested` config over the given input files.
///
/// The checks run in order and stop at the first failure. Timestamps are
/// compared for exact equality against the stored values rather than
/// newer-than: a copied or regenerated input invalidates the cache even
/// when its content is unchanged. Read-only; never mutates the artifact.
pub fn check_cache(
    model_dir: &Path,
    requested: &TrainingConfig,
    train_path: &Path,
    val_path: &Path,
) -> TrainingResult<CacheStatus> {
    let requested_hash = fingerprint(requested)?;

    if !TrainingMetadata::path_for(model_dir).exists() {
        return Ok(CacheStatus::Invalid(CacheMissReason::MetadataMissing));
    }

    let stored = match TrainingMetadata::load(model_dir) {
        Ok(metadata) => metadata,
        Err(e) => {
            return Ok(CacheStatus::Invalid(CacheMissReason::MetadataCorrupt(e.to_string())));
        }
    };

    if !stored.completed {
        return Ok(CacheStatus::Invalid(CacheMissReason::IncompleteRun));
    }

    if stored.model_name != requested.model_name {
        return Ok(CacheStatus::Invalid(CacheMissReason::ModelChanged {
            stored: stored.model_name,
            requested: requested.model_name.clone(),
        }));
    }

    if stored.config_hash != requested_hash.0 {
        return Ok(CacheStatus::Invalid(CacheMissReason::ConfigChanged {
            stored: stored.config_hash,
            requested: requested_hash.0,
        }));
    }

    let requested_train = train_path.to_string_lossy().to_string();
    let requested_val = val_path.to_string_lossy().to_string();
    if stored.train_data_path != requested_train {
        return Ok(CacheStatus::Invalid(CacheMissReason::InputPathChanged {
            stored: stored.train_data_path,
            requested: requested_train,
        }));
    }
    if stored.val_data_path != requested_val {
        return Ok(CacheStatus::Invalid(CacheMissReason::InputPathChanged {
            stored: stored.val_data_path,
            requested: requested_val,
        }));
    }

    for path in [train_path, val_path] {
        if !path.exists() {
            return Ok(CacheStatus::Invalid(CacheMissReason::InputMissing(path.to_path_buf())));
        }
    }

    if file_mtime(train_path)? != stored.train_data_mtime {
        return Ok(CacheStatus::Invalid(CacheMissReason::InputModified(train_path.to_path_buf())));
    }
    if file_mtime(val_path)? != stored.val_data_mtime {
        return Ok(CacheStatus::Invalid(CacheMissReason::InputModified(val_path.to_path_buf())));
    }

    if !has_model_outputs(model_dir) {
        return Ok(CacheStatus::Invalid(CacheMissReason::OutputsMissing(model_dir.to_path_buf())));
    }

    Ok(CacheStatus::Valid)
}

/// True when the directory holds the configuration descriptor and at least
/// one weights file in an accepted format.
pub fn has_model_outputs(model_dir: &Path) -> bool {
    if !model_dir.join(MODEL_CONFIG_FILE).exists() {
        return false;
    }
    WEIGHT_FILES.iter().any(|name| model_dir.join(name).exists())
}
