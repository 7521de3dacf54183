use std::collections::BTreeMap;

use tracing::debug;

use super::FeatureValue;
use super::cleanup::{CleanupFunction, clean_text};
use super::extractors::FeatureExtractor;
use crate::bugzilla::{self, Bug, Change};

/// Predicate selecting the change a bug is rolled back to before extraction.
pub type RollbackWhen = fn(&Change) -> bool;

/// One bug split into the three columns consumed by the column transformer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedBug {
    /// Structured features keyed by extractor name.
    pub data: BTreeMap<String, FeatureValue>,
    pub title: String,
    pub comments: String,
}

/// First pipeline stage: structured features plus cleaned free text.
#[derive(Debug, Clone)]
pub struct BugExtractor {
    extractors: Vec<FeatureExtractor>,
    cleanup: Vec<CleanupFunction>,
    rollback: bool,
    rollback_when: Option<RollbackWhen>,
    commit_data: bool,
}

impl BugExtractor {
    pub fn new(extractors: Vec<FeatureExtractor>, cleanup: Vec<CleanupFunction>) -> Self {
        Self {
            extractors,
            cleanup,
            rollback: false,
            rollback_when: None,
            commit_data: false,
        }
    }

    /// Roll each bug back to just before the first change matching `when`.
    pub fn with_rollback(mut self, when: RollbackWhen) -> Self {
        self.rollback = true;
        self.rollback_when = Some(when);
        self
    }

    /// Evaluate extractors that read joined commit data.
    pub fn with_commit_data(mut self, enabled: bool) -> Self {
        self.commit_data = enabled;
        self
    }

    pub fn extractors(&self) -> &[FeatureExtractor] {
        &self.extractors
    }

    pub fn cleanup_functions(&self) -> &[CleanupFunction] {
        &self.cleanup
    }

    pub fn rollback_enabled(&self) -> bool {
        self.rollback
    }

    pub fn commit_data(&self) -> bool {
        self.commit_data
    }

    pub fn extract(&self, bug: &Bug) -> ExtractedBug {
        let rolled;
        let bug = match (self.rollback, self.rollback_when) {
            (true, Some(when)) => {
                rolled = bugzilla::rollback(bug, when);
                &rolled
            }
            _ => bug,
        };

        let data = self
            .extractors
            .iter()
            .filter(|extractor| self.commit_data || !extractor.needs_commit_data())
            .map(|extractor| (extractor.name().to_string(), extractor.extract(bug)))
            .collect();
        let comments = bug
            .comments
            .iter()
            .map(|comment| clean_text(&self.cleanup, &comment.text))
            .collect::<Vec<_>>()
            .join(" ");

        ExtractedBug {
            data,
            title: clean_text(&self.cleanup, &bug.summary),
            comments,
        }
    }

    pub fn transform<'a, I>(&self, bugs: I) -> Vec<ExtractedBug>
    where
        I: IntoIterator<Item = &'a Bug>,
    {
        let extracted: Vec<ExtractedBug> = bugs.into_iter().map(|bug| self.extract(bug)).collect();
        debug!(bugs = extracted.len(), "Extracted bug features");
        extracted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bugzilla::{Comment, Commit, HistoryEntry};

    fn adds_perf(change: &Change) -> bool {
        change.is_field("keywords") && change.added_contains("perf")
    }

    fn sample_bug() -> Bug {
        Bug {
            summary: "Crash in nsDocShell.cpp".into(),
            keywords: vec!["perf".into()],
            history: vec![HistoryEntry {
                when: Some("2020-01-01T00:00:00Z".into()),
                who: None,
                changes: vec![Change {
                    field_name: "keywords".into(),
                    added: vec!["perf".into()],
                    removed: vec![],
                }],
            }],
            comments: vec![
                Comment {
                    text: "See https://example.com".into(),
                    creation_time: Some("2019-01-01T00:00:00Z".into()),
                },
                Comment {
                    text: "Steps to reproduce".into(),
                    creation_time: Some("2019-01-02T00:00:00Z".into()),
                },
            ],
            commits: vec![Commit {
                added: 3,
                ..Commit::default()
            }],
            ..Bug::new(11)
        }
    }

    #[test]
    fn extracts_columns_with_cleanup() {
        let extractor = BugExtractor::new(
            vec![FeatureExtractor::keywords_ignoring(Vec::<String>::new())],
            vec![
                CleanupFunction::FileRef,
                CleanupFunction::Url,
                CleanupFunction::Synonyms,
            ],
        );
        let extracted = extractor.extract(&sample_bug());
        assert_eq!(extracted.title, "Crash in __FILE_REFERENCE__");
        assert_eq!(extracted.comments, "See __URL__ str");
        assert_eq!(
            extracted.data.get("keywords"),
            Some(&FeatureValue::Tags(vec!["perf".into()]))
        );
    }

    #[test]
    fn rollback_hides_the_matching_change() {
        let extractor = BugExtractor::new(
            vec![FeatureExtractor::keywords_ignoring(Vec::<String>::new())],
            vec![],
        )
        .with_rollback(adds_perf);
        let extracted = extractor.extract(&sample_bug());
        assert_eq!(
            extracted.data.get("keywords"),
            Some(&FeatureValue::Tags(vec![]))
        );
        assert!(extractor.rollback_enabled());
    }

    #[test]
    fn commit_extractors_require_commit_data() {
        let extractors = vec![FeatureExtractor::Severity, FeatureExtractor::CommitAdded];
        let without = BugExtractor::new(extractors.clone(), vec![]).extract(&sample_bug());
        assert!(!without.data.contains_key("commit_added"));

        let with = BugExtractor::new(extractors, vec![])
            .with_commit_data(true)
            .extract(&sample_bug());
        assert_eq!(with.data.get("commit_added"), Some(&FeatureValue::Count(3.0)));
    }
}
