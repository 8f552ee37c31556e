use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("invalid training config: {0}")]
    InvalidConfig(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors surfaced by the external capability providers (dataset hub, model
/// hub, trainer backend, metric computer). Provider messages are preserved
/// verbatim so stage failures stay diagnosable.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request error: {0}")]
    Request(String),

    #[error("dataset provider error: {0}")]
    Dataset(String),

    #[error("model provider error: {0}")]
    Model(String),

    #[error("trainer error: {0}")]
    Trainer(String),

    #[error("metric error: {0}")]
    Metric(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Training(#[from] TrainingError),
}
