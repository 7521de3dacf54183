//! Library exports for the triage tools, benchmarks and tests.
/// Application directory resolution.
pub mod app_dirs;
/// Bugzilla bug records, sources and rollback.
pub mod bugzilla;
/// On-disk TOML settings.
pub mod config;
/// Feature extraction from bug records.
pub mod features;
/// Label derivation from bug history.
pub mod labeling;
/// Tracing subscriber setup.
pub mod logging;
/// Estimators, samplers and metrics.
pub mod ml;
/// Bug classification models.
pub mod models;
/// Column transforms turning extracted bugs into feature rows.
pub mod pipeline;
