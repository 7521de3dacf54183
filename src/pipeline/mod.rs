//! Two-stage feature pipeline: bug extraction followed by a column transform.

pub mod column_transformer;
pub mod dict_vectorizer;
pub mod text_vectorizer;

pub use column_transformer::{Column, ColumnTransform, ColumnTransformer, TextField};
pub use dict_vectorizer::DictVectorizer;
pub use text_vectorizer::{DEFAULT_MIN_DF, TextVectorizer};

use thiserror::Error;

use crate::bugzilla::Bug;
use crate::features::BugExtractor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// The column transformer has not been fitted yet.
    #[error("Pipeline has not been fitted")]
    NotFitted,
}

/// Structured extraction (`bug_extractor`) followed by the column union
/// (`union`).
#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    pub bug_extractor: BugExtractor,
    pub union: ColumnTransformer,
}

impl ExtractionPipeline {
    pub fn new(bug_extractor: BugExtractor, union: ColumnTransformer) -> Self {
        Self {
            bug_extractor,
            union,
        }
    }

    pub fn transform_one(&self, bug: &Bug) -> Result<Vec<f32>, PipelineError> {
        self.union.transform(&self.bug_extractor.extract(bug))
    }

    pub fn feature_names_out(&self) -> Result<Vec<String>, PipelineError> {
        self.union.feature_names_out()
    }
}
