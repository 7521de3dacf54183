//! Deterministic gradient-boosted decision-stump classifier.
//!
//! The estimator behind the bug classifiers:
//! - Multi-class classification via softmax boosting (binary is the two-class case).
//! - Split search spread over `n_jobs` scoped threads with identical results for any count.
//! - Reproducible JSON model export/load.

mod model;
mod train;

pub use model::{GbdtStumpModel, Stump, softmax};
pub use train::{TrainDataset, TrainOptions, train_gbdt_stump};
