//! Maintenance task prediction: a multi-label forest trained on synthetic
//! vehicle data, persisted to disk and queried from the command line.

/// Application directory helpers.
pub mod app_dirs;
/// Persisted model artifact.
pub mod artifact;
/// TOML settings.
pub mod config;
/// Synthetic dataset generation and splitting.
pub mod dataset;
/// Tracing setup for the binaries.
pub mod logging;
/// Tree ensemble learners.
pub mod ml;
/// Predictor pipeline.
pub mod predict;
/// Feature and task schema.
pub mod schema;
/// Trainer pipeline.
pub mod train;
