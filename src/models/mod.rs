//! Bug classification models assembled from the feature pipeline and the
//! boosted stump estimator.

pub mod devdocneeded;

pub use devdocneeded::{DevDocNeededModel, Evaluation, ModelError, TrainReport};
