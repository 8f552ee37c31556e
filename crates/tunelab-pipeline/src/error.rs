use std::path::PathBuf;
use thiserror::Error;
use tunelab_training::{ProviderError, TrainingError};

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// One step of the experiment pipeline, for failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dataset,
    BaseModel,
    FineTune,
    EvaluateBase,
    EvaluateFineTuned,
    Compare,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::BaseModel => "base-model",
            Self::FineTune => "fine-tune",
            Self::EvaluateBase => "evaluate-base",
            Self::EvaluateFineTuned => "evaluate-fine-tuned",
            Self::Compare => "compare",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown profile '{0}' (expected one of: quick, default, full)")]
    UnknownProfile(String),

    #[error("invalid split ratios: {0}")]
    InvalidRatio(String),

    #[error("dataset has neither a 'test' nor a 'validation' split")]
    MissingEvaluationSplit,

    /// A stage failed mid-experiment. Partial outputs are left in place for
    /// inspection; the directory is part of the error.
    #[error("stage '{stage}' failed (partial outputs in {}): {source}", .experiment_dir.display())]
    Stage {
        stage: Stage,
        experiment_dir: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Wrap a stage failure with its stage name and experiment directory.
    pub fn stage(
        stage: Stage,
        experiment_dir: impl Into<PathBuf>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Stage { stage, experiment_dir: experiment_dir.into(), source: source.into() }
    }

    /// The experiment directory a failure happened in, when known.
    pub fn experiment_dir(&self) -> Option<&std::path::Path> {
        match self {
            Self::Stage { experiment_dir, .. } => Some(experiment_dir),
            _ => None,
        }
    }
}
