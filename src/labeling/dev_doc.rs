//! Derive "documentation needed" training labels from bug keyword history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::bugzilla::{Bug, BugDataError, BugId, Change, DEV_DOC_COMPLETE, DEV_DOC_NEEDED};

/// Binary class label: 1 when documentation was needed or completed.
pub type Label = u8;

/// The fixed label domain, independent of input.
pub const LABEL_DOMAIN: [Label; 2] = [0, 1];

const DEV_DOC_KEYWORDS: [&str; 2] = [DEV_DOC_NEEDED, DEV_DOC_COMPLETE];

/// Labels keyed by bug id plus the label domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    pub classes: BTreeMap<BugId, Label>,
    pub domain: Vec<Label>,
}

impl LabelSet {
    pub fn get(&self, bug_id: BugId) -> Option<Label> {
        self.classes.get(&bug_id).copied()
    }

    /// Number of bugs carrying each label, in domain order.
    pub fn counts(&self) -> Vec<usize> {
        self.domain
            .iter()
            .map(|label| self.classes.values().filter(|v| *v == label).count())
            .collect()
    }
}

/// Whether history entries are trusted to be chronological or checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOrder {
    #[default]
    Trust,
    Validate,
}

/// What to do with a bug that cannot be labeled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidBugPolicy {
    /// Abort the whole run on the first invalid bug.
    #[default]
    FailFast,
    /// Log a warning and leave the bug unlabeled.
    SkipAndLog,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOptions {
    #[serde(default)]
    pub history_order: HistoryOrder,
    #[serde(default)]
    pub on_invalid_bug: InvalidBugPolicy,
}

#[derive(Debug, Error)]
pub enum LabelError {
    /// A history entry is timestamped before the entry preceding it.
    #[error("Bug {bug_id} history is not chronological at entry {index}")]
    InvalidHistoryOrder { bug_id: BugId, index: usize },
    #[error(transparent)]
    Bug(#[from] BugDataError),
}

/// Compute the label for one bug, or `None` when nothing qualifies.
///
/// A dev-doc keyword on the bug today settles the label at 1 without looking
/// at history. Otherwise every keyword change is replayed in order and the
/// last qualifying change wins. Within one change, removing `dev-doc-needed`
/// without adding `dev-doc-complete` is checked first.
pub fn label_for_bug(bug: &Bug) -> Option<Label> {
    if DEV_DOC_KEYWORDS.iter().any(|keyword| bug.has_keyword(keyword)) {
        return Some(1);
    }

    let mut label = None;
    for change in bug.history.iter().flat_map(|entry| &entry.changes) {
        if is_false_positive_removal(change) {
            label = Some(0);
        } else if adds_dev_doc_keyword(change) {
            label = Some(1);
        }
    }
    label
}

/// True for a keyword change that adds `dev-doc-needed` or `dev-doc-complete`.
pub fn adds_dev_doc_keyword(change: &Change) -> bool {
    change.is_field("keywords")
        && DEV_DOC_KEYWORDS
            .iter()
            .any(|keyword| change.added_contains(keyword))
}

fn is_false_positive_removal(change: &Change) -> bool {
    change.is_field("keywords")
        && change.removed_contains(DEV_DOC_NEEDED)
        && !change.added_contains(DEV_DOC_COMPLETE)
}

/// Check that timestamped history entries never go backwards.
pub fn validate_history_order(bug: &Bug) -> Result<(), LabelError> {
    let mut previous: Option<&str> = None;
    for (index, entry) in bug.history.iter().enumerate() {
        let Some(when) = entry.when.as_deref() else {
            continue;
        };
        if previous.is_some_and(|prev| when < prev) {
            return Err(LabelError::InvalidHistoryOrder {
                bug_id: bug.id,
                index,
            });
        }
        previous = Some(when);
    }
    Ok(())
}

/// Accumulates labels bug by bug.
#[derive(Debug, Default)]
pub struct LabelDeriver {
    options: LabelOptions,
    classes: BTreeMap<BugId, Label>,
    skipped: usize,
}

impl LabelDeriver {
    pub fn new(options: LabelOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Label one bug. A repeated id is overwritten only by a qualifying event.
    pub fn push(&mut self, bug: &Bug) -> Result<(), LabelError> {
        if self.options.history_order == HistoryOrder::Validate {
            validate_history_order(bug)?;
        }
        match label_for_bug(bug) {
            Some(label) => {
                self.classes.insert(bug.id, label);
            }
            None => {
                self.classes.entry(bug.id).or_insert(0);
            }
        }
        Ok(())
    }

    /// Label the next item from a bug source, applying the invalid-bug policy.
    pub fn push_record(&mut self, record: Result<Bug, BugDataError>) -> Result<(), LabelError> {
        let result = record
            .map_err(LabelError::from)
            .and_then(|bug| self.push(&bug));
        match (result, self.options.on_invalid_bug) {
            (Ok(()), _) => Ok(()),
            (Err(err), InvalidBugPolicy::FailFast) => Err(err),
            (Err(err), InvalidBugPolicy::SkipAndLog) => {
                warn!("Skipping bug while deriving labels: {err}");
                self.skipped += 1;
                Ok(())
            }
        }
    }

    /// Number of records skipped under [`InvalidBugPolicy::SkipAndLog`].
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(self) -> LabelSet {
        debug!(
            labeled = self.classes.len(),
            skipped = self.skipped,
            "Derived dev-doc labels"
        );
        LabelSet {
            classes: self.classes,
            domain: LABEL_DOMAIN.to_vec(),
        }
    }
}

/// Derive labels for every record a bug source yields.
pub fn derive_labels<I>(records: I, options: LabelOptions) -> Result<LabelSet, LabelError>
where
    I: IntoIterator<Item = Result<Bug, BugDataError>>,
{
    let mut deriver = LabelDeriver::new(options);
    for record in records {
        deriver.push_record(record)?;
    }
    Ok(deriver.finish())
}
