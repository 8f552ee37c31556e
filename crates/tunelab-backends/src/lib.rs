//! Concrete providers for the tunelab pipeline: hub-backed dataset and
//! model acquisition, a local trainer backend, and built-in metrics.

pub mod hub_dataset;
pub mod hub_model;
pub mod linear;
pub mod metrics;

pub use hub_dataset::HubDatasetProvider;
pub use hub_model::HubModelProvider;
pub use linear::LinearClassifierBackend;
pub use metrics::{BuiltinMetrics, ConfusionMatrix};
