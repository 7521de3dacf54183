use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum document frequency used for bug text, as a fraction of documents.
pub const DEFAULT_MIN_DF: f64 = 0.0001;

/// TF-IDF bag-of-words vectorizer for bug titles and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextVectorizer {
    /// Terms must appear in at least this fraction of documents.
    min_df: f64,
    vocabulary: BTreeMap<String, usize>,
    terms: Vec<String>,
    idf: Vec<f32>,
}

impl Default for TextVectorizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DF)
    }
}

impl TextVectorizer {
    pub fn new(min_df: f64) -> Self {
        Self {
            min_df: min_df.clamp(0.0, 1.0),
            vocabulary: BTreeMap::new(),
            terms: Vec::new(),
            idf: Vec::new(),
        }
    }

    pub fn fit<'a, I>(&mut self, documents: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        let mut n_documents = 0usize;
        for doc in documents {
            n_documents += 1;
            let unique: BTreeSet<String> = tokenize(doc).collect();
            for token in unique {
                *document_frequency.entry(token).or_default() += 1;
            }
        }

        let min_count = ((n_documents as f64) * self.min_df).ceil().max(1.0) as usize;
        let n = n_documents as f64;
        self.terms.clear();
        self.idf.clear();
        for (term, df) in document_frequency {
            if df < min_count {
                continue;
            }
            self.idf.push((((n + 1.0) / (df as f64 + 1.0)).ln() + 1.0) as f32);
            self.terms.push(term);
        }
        self.vocabulary = self
            .terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();
    }

    /// L2-normalized TF-IDF vector for one document.
    pub fn transform(&self, doc: &str) -> Vec<f32> {
        let mut out = vec![0.0f32; self.terms.len()];
        for token in tokenize(doc) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                out[idx] += 1.0;
            }
        }
        for (value, idf) in out.iter_mut().zip(&self.idf) {
            *value *= idf;
        }
        let norm = out.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut out {
                *value /= norm;
            }
        }
        out
    }

    pub fn feature_names(&self) -> &[String] {
        &self.terms
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token regex must compile"))
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
}
