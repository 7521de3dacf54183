//! Machine learning helpers for training and inference.
//!
//! These are the estimator-side building blocks the bug models compose: the
//! boosted stump classifier, class balancing and evaluation metrics.

pub mod cpu;
pub mod gbdt_stump;
pub mod metrics;
pub mod sampler;
