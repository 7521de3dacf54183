use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::features::FeatureValue;

/// Turns structured feature maps into dense vectors.
///
/// Strings and string lists become one-hot `key=value` columns, numbers and
/// flags keep `key` as the column name. The vocabulary is sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DictVectorizer {
    feature_names: Vec<String>,
    vocabulary: BTreeMap<String, usize>,
}

impl DictVectorizer {
    pub fn fit<'a, I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = &'a BTreeMap<String, FeatureValue>>,
    {
        let mut names = std::collections::BTreeSet::new();
        for row in rows {
            for (key, value) in row {
                for_each_entry(key, value, |name, _| {
                    names.insert(name);
                });
            }
        }
        self.feature_names = names.into_iter().collect();
        self.vocabulary = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
    }

    /// Encode one row. Keys not seen during `fit` are dropped.
    pub fn transform(&self, row: &BTreeMap<String, FeatureValue>) -> Vec<f32> {
        let mut out = vec![0.0f32; self.feature_names.len()];
        for (key, value) in row {
            for_each_entry(key, value, |name, amount| {
                if let Some(&idx) = self.vocabulary.get(&name) {
                    out[idx] += amount;
                }
            });
        }
        out
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

fn for_each_entry(key: &str, value: &FeatureValue, mut visit: impl FnMut(String, f32)) {
    match value {
        FeatureValue::Flag(flag) => visit(key.to_string(), if *flag { 1.0 } else { 0.0 }),
        FeatureValue::Count(count) => visit(key.to_string(), *count as f32),
        FeatureValue::Category(category) => visit(format!("{key}={category}"), 1.0),
        FeatureValue::Tags(tags) => {
            for tag in tags {
                visit(format!("{key}={tag}"), 1.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entries: Vec<(&str, FeatureValue)>) -> BTreeMap<String, FeatureValue> {
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    #[test]
    fn one_hot_encodes_categories_and_tags() {
        let rows = vec![
            row(vec![
                ("severity", FeatureValue::Category("S2".into())),
                ("has_url", FeatureValue::Flag(true)),
                ("keywords", FeatureValue::Tags(vec!["perf".into(), "crash".into()])),
            ]),
            row(vec![
                ("severity", FeatureValue::Category("S3".into())),
                ("patches", FeatureValue::Count(2.0)),
            ]),
        ];
        let mut vectorizer = DictVectorizer::default();
        vectorizer.fit(&rows);
        assert_eq!(
            vectorizer.feature_names(),
            &[
                "has_url",
                "keywords=crash",
                "keywords=perf",
                "patches",
                "severity=S2",
                "severity=S3"
            ]
        );
        assert_eq!(vectorizer.transform(&rows[0]), vec![1.0, 1.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(vectorizer.transform(&rows[1]), vec![0.0, 0.0, 0.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn ignores_unseen_values() {
        let mut vectorizer = DictVectorizer::default();
        vectorizer.fit(&[row(vec![("product", FeatureValue::Category("Core".into()))])]);
        let encoded = vectorizer.transform(&row(vec![(
            "product",
            FeatureValue::Category("Firefox".into()),
        )]));
        assert_eq!(encoded, vec![0.0]);
    }
}
