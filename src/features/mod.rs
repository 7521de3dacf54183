//! Feature extraction over bug and commit data.
//!
//! Extractors are plain tagged variants: a model lists the ones it wants, in
//! order, and hands them to a [`BugExtractor`] together with the text cleanup
//! functions to apply to the free-text columns.

mod bug_extractor;
mod cleanup;
mod extractors;

pub use bug_extractor::{BugExtractor, ExtractedBug, RollbackWhen};
pub use cleanup::CleanupFunction;
pub use extractors::FeatureExtractor;

use serde::{Deserialize, Serialize};

/// A single extracted feature value before vectorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FeatureValue {
    Flag(bool),
    Count(f64),
    Category(String),
    Tags(Vec<String>),
}
