use serde::{Deserialize, Serialize};

use super::PipelineError;
use super::dict_vectorizer::DictVectorizer;
use super::text_vectorizer::TextVectorizer;
use crate::features::ExtractedBug;

/// Free-text column of an [`ExtractedBug`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Title,
    Comments,
}

impl TextField {
    fn read(self, bug: &ExtractedBug) -> &str {
        match self {
            Self::Title => &bug.title,
            Self::Comments => &bug.comments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnTransform {
    /// Vectorize the structured `data` column.
    Dict { vectorizer: DictVectorizer },
    /// Vectorize one free-text column.
    Text {
        field: TextField,
        vectorizer: TextVectorizer,
    },
}

/// A named column; output feature names are prefixed with `<name>__`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub transform: ColumnTransform,
}

impl Column {
    pub fn dict(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: ColumnTransform::Dict {
                vectorizer: DictVectorizer::default(),
            },
        }
    }

    pub fn text(name: impl Into<String>, field: TextField, min_df: f64) -> Self {
        Self {
            name: name.into(),
            transform: ColumnTransform::Text {
                field,
                vectorizer: TextVectorizer::new(min_df),
            },
        }
    }

    fn fit(&mut self, bugs: &[ExtractedBug]) {
        match &mut self.transform {
            ColumnTransform::Dict { vectorizer } => vectorizer.fit(bugs.iter().map(|bug| &bug.data)),
            ColumnTransform::Text { field, vectorizer } => {
                let field = *field;
                vectorizer.fit(bugs.iter().map(|bug| field.read(bug)));
            }
        }
    }

    fn transform_into(&self, bug: &ExtractedBug, out: &mut Vec<f32>) {
        match &self.transform {
            ColumnTransform::Dict { vectorizer } => out.extend(vectorizer.transform(&bug.data)),
            ColumnTransform::Text { field, vectorizer } => {
                out.extend(vectorizer.transform(field.read(bug)));
            }
        }
    }

    fn output_names(&self) -> &[String] {
        match &self.transform {
            ColumnTransform::Dict { vectorizer } => vectorizer.feature_names(),
            ColumnTransform::Text { vectorizer, .. } => vectorizer.feature_names(),
        }
    }
}

/// Second pipeline stage: applies each column transform and concatenates the
/// outputs in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    columns: Vec<Column>,
    fitted: bool,
}

impl ColumnTransformer {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            fitted: false,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn fit(&mut self, bugs: &[ExtractedBug]) {
        for column in &mut self.columns {
            column.fit(bugs);
        }
        self.fitted = true;
    }

    pub fn transform(&self, bug: &ExtractedBug) -> Result<Vec<f32>, PipelineError> {
        if !self.fitted {
            return Err(PipelineError::NotFitted);
        }
        let mut out = Vec::with_capacity(self.output_len());
        for column in &self.columns {
            column.transform_into(bug, &mut out);
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, bugs: &[ExtractedBug]) -> Result<Vec<Vec<f32>>, PipelineError> {
        self.fit(bugs);
        bugs.iter().map(|bug| self.transform(bug)).collect()
    }

    /// Number of values produced per bug.
    pub fn output_len(&self) -> usize {
        self.columns.iter().map(|column| column.output_names().len()).sum()
    }

    /// Output feature names in column order, prefixed with the column name.
    pub fn feature_names_out(&self) -> Result<Vec<String>, PipelineError> {
        if !self.fitted {
            return Err(PipelineError::NotFitted);
        }
        Ok(self
            .columns
            .iter()
            .flat_map(|column| {
                column
                    .output_names()
                    .iter()
                    .map(move |name| format!("{}__{name}", column.name))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureValue;

    fn extracted(severity: &str, title: &str, comments: &str) -> ExtractedBug {
        ExtractedBug {
            data: [(
                "severity".to_string(),
                FeatureValue::Category(severity.to_string()),
            )]
            .into_iter()
            .collect(),
            title: title.to_string(),
            comments: comments.to_string(),
        }
    }

    fn transformer() -> ColumnTransformer {
        ColumnTransformer::new(vec![
            Column::dict("data"),
            Column::text("title", TextField::Title, 0.0),
            Column::text("comments", TextField::Comments, 0.0),
        ])
    }

    #[test]
    fn unfitted_transformer_has_no_names() {
        assert!(matches!(
            transformer().feature_names_out(),
            Err(PipelineError::NotFitted)
        ));
    }

    #[test]
    fn feature_names_are_prefixed_in_column_order() {
        let bugs = vec![
            extracted("S2", "crash", "works for me"),
            extracted("S3", "hang", "crash again"),
        ];
        let mut union = transformer();
        let rows = union.fit_transform(&bugs).unwrap();
        let names = union.feature_names_out().unwrap();
        assert_eq!(
            names,
            vec![
                "data__severity=S2",
                "data__severity=S3",
                "title__crash",
                "title__hang",
                "comments__again",
                "comments__crash",
                "comments__for",
                "comments__me",
                "comments__works",
            ]
        );
        assert_eq!(rows[0].len(), names.len());
        assert_eq!(rows[0][0], 1.0);
        assert_eq!(rows[1][1], 1.0);
    }
}
