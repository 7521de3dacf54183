//! Bug records as exported from Bugzilla, plus the helpers that read and
//! reshape them.
//!
//! Records arrive as JSON objects (one per line in a dump). Required fields are
//! validated up front so malformed input fails with a named field instead of an
//! opaque serde error deep inside feature extraction.

mod record;
mod rollback;
mod source;

pub use record::{DEV_DOC_COMPLETE, DEV_DOC_NEEDED};
pub use rollback::rollback;
pub use source::{BugSource, read_bugs};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Numeric Bugzilla bug identifier.
pub type BugId = u64;

/// A bug with its current field values and full change history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bug {
    pub id: BugId,
    pub keywords: Vec<String>,
    /// Change entries, oldest first.
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub whiteboard: String,
    #[serde(default)]
    pub cf_crash_signature: String,
    #[serde(default)]
    pub cf_has_str: String,
    #[serde(default)]
    pub cf_has_regression_range: String,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub see_also: Vec<String>,
    #[serde(default)]
    pub regressions: Vec<String>,
    #[serde(default)]
    pub regressed_by: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Commits referencing this bug, joined in from the commit dataset.
    #[serde(default)]
    pub commits: Vec<Commit>,
}

impl Bug {
    /// Create an empty bug with the given id.
    pub fn new(id: BugId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// True when the bug currently carries `keyword`.
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }
}

/// One recorded set of field mutations applied to a bug at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// RFC 3339 timestamp as reported by Bugzilla.
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub who: Option<String>,
    pub changes: Vec<Change>,
}

/// A single field mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub field_name: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl Change {
    pub fn is_field(&self, field_name: &str) -> bool {
        self.field_name == field_name
    }

    pub fn added_contains(&self, value: &str) -> bool {
        self.added.iter().any(|v| v == value)
    }

    pub fn removed_contains(&self, value: &str) -> bool {
        self.removed.iter().any(|v| v == value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub creation_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub is_patch: bool,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub creation_time: Option<String>,
}

/// Summary of a commit that references the bug.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub added: u64,
    #[serde(default)]
    pub deleted: u64,
    #[serde(default)]
    pub types: Vec<String>,
    /// Hash of the backout commit, empty when the commit stuck.
    #[serde(default)]
    pub backedoutby: String,
}

impl Commit {
    pub fn is_backed_out(&self) -> bool {
        !self.backedoutby.is_empty()
    }
}

/// Errors raised while reading or validating bug records.
#[derive(Debug, Error)]
pub enum BugDataError {
    /// A required field is absent from a bug or change record.
    #[error("{} is missing required field `{field}`", describe_bug(.bug_id))]
    MissingField {
        bug_id: Option<BugId>,
        field: &'static str,
    },
    /// A field is present but has an unexpected shape.
    #[error("{} has invalid field `{field}`: {reason}", describe_bug(.bug_id))]
    InvalidField {
        bug_id: Option<BugId>,
        field: &'static str,
        reason: String,
    },
    /// A line of the dump is not valid JSON.
    #[error("Invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
    /// A line of the dump is not valid UTF-8.
    #[error("Invalid UTF-8 on line {line}: {source}")]
    Decode {
        line: usize,
        source: std::io::Error,
    },
    /// The dump could not be read. Iteration stops after this error.
    #[error("Failed to read bug dump {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn describe_bug(bug_id: &Option<BugId>) -> String {
    match bug_id {
        Some(id) => format!("Bug {id}"),
        None => "Bug record".to_string(),
    }
}
