//! Command implementations for the Tunelab CLI.

pub mod compare;
pub mod dataset;
pub mod evaluate;
pub mod experiment;
pub mod model;
pub mod train;
pub mod types;
