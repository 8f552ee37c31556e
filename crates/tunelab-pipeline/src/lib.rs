//! Tunelab Pipeline
//!
//! Orchestration of fine-tuning experiments: profile presets, dataset
//! splitting, the cached training stage, evaluation, comparison, and the
//! end-to-end experiment runner.

pub mod compare;
pub mod error;
pub mod evaluate;
pub mod experiment;
pub mod naming;
pub mod profiles;
pub mod split;
pub mod train;

pub use compare::{compare_reports, ComparisonResult, MetricDelta, MetricsReport};
pub use error::{PipelineError, PipelineResult, Stage};
pub use evaluate::{evaluation_params, run_evaluation, EvaluationParams, PredictionRecord};
pub use experiment::{
    materialize_dataset, ExperimentDirectories, ExperimentFiles, ExperimentPipeline,
    ExperimentRequest, ExperimentSummary, ResolvedProfileConfig,
};
pub use naming::{experiment_name, model_short_name, sanitize_component};
pub use profiles::{resolve as resolve_profile, TrainingProfile, PROFILE_NAMES};
pub use split::{split_examples, validate_ratios, SplitSpec};
pub use train::{run_training, TrainReport};
