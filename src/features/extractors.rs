use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::FeatureValue;
use crate::bugzilla::Bug;

const REVIEW_REQUEST_CONTENT_TYPES: [&str; 2] =
    ["text/x-review-board-request", "text/x-phabricator-request"];
const LANDING_MARKER: &str = "://hg.mozilla.org/";

/// One kind of feature computed from a bug (and, for the commit variants, the
/// commits that reference it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureExtractor {
    HasStr,
    HasRegressionRange,
    Severity,
    /// Current keywords, minus the ones in `ignore`.
    Keywords { ignore: BTreeSet<String> },
    IsCoverityIssue,
    HasCrashSignature,
    HasUrl,
    HasW3cUrl,
    HasGithubUrl,
    Whiteboard,
    Patches,
    Landings,
    Product,
    Component,
    CommitAdded,
    CommitDeleted,
    CommitTypes,
}

impl FeatureExtractor {
    pub fn keywords_ignoring<I, S>(ignore: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keywords {
            ignore: ignore.into_iter().map(Into::into).collect(),
        }
    }

    /// Key under which the value is stored in the structured `data` column.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HasStr => "has_str",
            Self::HasRegressionRange => "has_regression_range",
            Self::Severity => "severity",
            Self::Keywords { .. } => "keywords",
            Self::IsCoverityIssue => "is_coverity_issue",
            Self::HasCrashSignature => "has_crash_signature",
            Self::HasUrl => "has_url",
            Self::HasW3cUrl => "has_w3c_url",
            Self::HasGithubUrl => "has_github_url",
            Self::Whiteboard => "whiteboard",
            Self::Patches => "patches",
            Self::Landings => "landings",
            Self::Product => "product",
            Self::Component => "component",
            Self::CommitAdded => "commit_added",
            Self::CommitDeleted => "commit_deleted",
            Self::CommitTypes => "commit_types",
        }
    }

    /// True for extractors that read joined commit data.
    pub fn needs_commit_data(&self) -> bool {
        matches!(
            self,
            Self::CommitAdded | Self::CommitDeleted | Self::CommitTypes
        )
    }

    pub fn extract(&self, bug: &Bug) -> FeatureValue {
        match self {
            Self::HasStr => FeatureValue::Category(bug.cf_has_str.clone()),
            Self::HasRegressionRange => FeatureValue::Category(bug.cf_has_regression_range.clone()),
            Self::Severity => FeatureValue::Category(bug.severity.clone()),
            Self::Keywords { ignore } => FeatureValue::Tags(
                bug.keywords
                    .iter()
                    .filter(|keyword| !ignore.contains(keyword.as_str()))
                    .cloned()
                    .collect(),
            ),
            Self::IsCoverityIssue => FeatureValue::Flag(
                coverity_regex().is_match(&bug.summary)
                    || coverity_regex().is_match(&bug.whiteboard),
            ),
            Self::HasCrashSignature => {
                FeatureValue::Flag(!bug.cf_crash_signature.trim().is_empty())
            }
            Self::HasUrl => FeatureValue::Flag(!bug.url.trim().is_empty()),
            Self::HasW3cUrl => FeatureValue::Flag(bug.url.contains("w3c")),
            Self::HasGithubUrl => FeatureValue::Flag(bug.url.contains("github")),
            Self::Whiteboard => FeatureValue::Tags(whiteboard_tags(&bug.whiteboard)),
            Self::Patches => FeatureValue::Count(
                bug.attachments
                    .iter()
                    .filter(|attachment| {
                        attachment.is_patch
                            || REVIEW_REQUEST_CONTENT_TYPES.contains(&attachment.content_type.as_str())
                    })
                    .count() as f64,
            ),
            Self::Landings => FeatureValue::Count(
                bug.comments
                    .iter()
                    .filter(|comment| comment.text.contains(LANDING_MARKER))
                    .count() as f64,
            ),
            Self::Product => FeatureValue::Category(bug.product.clone()),
            Self::Component => FeatureValue::Category(bug.component.clone()),
            Self::CommitAdded => FeatureValue::Count(
                bug.commits
                    .iter()
                    .filter(|commit| !commit.is_backed_out())
                    .map(|commit| commit.added as f64)
                    .sum(),
            ),
            Self::CommitDeleted => FeatureValue::Count(
                bug.commits
                    .iter()
                    .filter(|commit| !commit.is_backed_out())
                    .map(|commit| commit.deleted as f64)
                    .sum(),
            ),
            Self::CommitTypes => FeatureValue::Tags(
                bug.commits
                    .iter()
                    .filter(|commit| !commit.is_backed_out())
                    .flat_map(|commit| commit.types.iter().cloned())
                    .collect(),
            ),
        }
    }
}

fn coverity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[CID ?[0-9]+\]").expect("coverity regex must compile"))
}

fn whiteboard_tags(whiteboard: &str) -> Vec<String> {
    whiteboard
        .to_lowercase()
        .split(|ch: char| ch.is_whitespace() || matches!(ch, '[' | ']' | ',' | ';' | ':'))
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bugzilla::{Attachment, Comment, Commit};

    #[test]
    fn keywords_drop_ignored_values() {
        let bug = Bug {
            keywords: vec!["perf".into(), "dev-doc-needed".into()],
            ..Bug::new(1)
        };
        let extractor = FeatureExtractor::keywords_ignoring(["dev-doc-needed", "dev-doc-complete"]);
        assert_eq!(
            extractor.extract(&bug),
            FeatureValue::Tags(vec!["perf".into()])
        );
    }

    #[test]
    fn detects_coverity_ids_in_summary_or_whiteboard() {
        let mut bug = Bug {
            summary: "[CID 12345] Null deref in foo".into(),
            ..Bug::new(1)
        };
        assert_eq!(
            FeatureExtractor::IsCoverityIssue.extract(&bug),
            FeatureValue::Flag(true)
        );
        bug.summary = "Null deref".into();
        bug.whiteboard = "[CID12]".into();
        assert_eq!(
            FeatureExtractor::IsCoverityIssue.extract(&bug),
            FeatureValue::Flag(true)
        );
        bug.whiteboard.clear();
        assert_eq!(
            FeatureExtractor::IsCoverityIssue.extract(&bug),
            FeatureValue::Flag(false)
        );
    }

    #[test]
    fn url_flags() {
        let bug = Bug {
            url: "https://github.com/w3c/csswg-drafts/issues/1".into(),
            ..Bug::new(1)
        };
        for extractor in [
            FeatureExtractor::HasUrl,
            FeatureExtractor::HasW3cUrl,
            FeatureExtractor::HasGithubUrl,
        ] {
            assert_eq!(extractor.extract(&bug), FeatureValue::Flag(true));
        }
        assert_eq!(
            FeatureExtractor::HasUrl.extract(&Bug::new(2)),
            FeatureValue::Flag(false)
        );
    }

    #[test]
    fn whiteboard_splits_into_lowercase_tags() {
        let bug = Bug {
            whiteboard: "[necko-triaged] [QF:P3]".into(),
            ..Bug::new(1)
        };
        assert_eq!(
            FeatureExtractor::Whiteboard.extract(&bug),
            FeatureValue::Tags(vec!["necko-triaged".into(), "qf".into(), "p3".into()])
        );
    }

    #[test]
    fn counts_patches_and_landings() {
        let bug = Bug {
            attachments: vec![
                Attachment {
                    is_patch: true,
                    ..Attachment::default()
                },
                Attachment {
                    content_type: "text/x-phabricator-request".into(),
                    ..Attachment::default()
                },
                Attachment {
                    content_type: "image/png".into(),
                    ..Attachment::default()
                },
            ],
            comments: vec![
                Comment {
                    text: "Pushed by x: https://hg.mozilla.org/integration/autoland/rev/abc".into(),
                    creation_time: None,
                },
                Comment {
                    text: "Thanks!".into(),
                    creation_time: None,
                },
            ],
            ..Bug::new(1)
        };
        assert_eq!(FeatureExtractor::Patches.extract(&bug), FeatureValue::Count(2.0));
        assert_eq!(FeatureExtractor::Landings.extract(&bug), FeatureValue::Count(1.0));
    }

    #[test]
    fn commit_features_skip_backouts() {
        let bug = Bug {
            commits: vec![
                Commit {
                    added: 10,
                    deleted: 2,
                    types: vec![".js".into()],
                    backedoutby: String::new(),
                },
                Commit {
                    added: 100,
                    deleted: 50,
                    types: vec![".cpp".into()],
                    backedoutby: "deadbeef".into(),
                },
            ],
            ..Bug::new(1)
        };
        assert_eq!(FeatureExtractor::CommitAdded.extract(&bug), FeatureValue::Count(10.0));
        assert_eq!(FeatureExtractor::CommitDeleted.extract(&bug), FeatureValue::Count(2.0));
        assert_eq!(
            FeatureExtractor::CommitTypes.extract(&bug),
            FeatureValue::Tags(vec![".js".into()])
        );
        assert!(FeatureExtractor::CommitTypes.needs_commit_data());
        assert!(!FeatureExtractor::Severity.needs_commit_data());
    }
}
