mod support;

use bugtriage::bugzilla::{BugDataError, read_bugs};
use bugtriage::config::TriageConfig;
use bugtriage::labeling::{HistoryOrder, InvalidBugPolicy, LabelError, LabelOptions, derive_labels};
use bugtriage::models::{DevDocNeededModel, ModelError};
use serde_json::json;
use support::bugs::{bug, entry, keywords_change, write_jsonl};
use tempfile::tempdir;

fn labels_for(records: &[serde_json::Value]) -> bugtriage::labeling::LabelSet {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bugs.jsonl");
    write_jsonl(&path, records);
    derive_labels(read_bugs(&path).unwrap(), LabelOptions::default()).unwrap()
}

#[test]
fn documented_scenarios_from_a_bug_dump() {
    let labels = labels_for(&[
        bug(
            1,
            &[],
            vec![
                entry("2020-01-01T00:00:00Z", vec![keywords_change(&["dev-doc-needed"], &[])]),
                entry("2020-02-01T00:00:00Z", vec![keywords_change(&[], &["dev-doc-needed"])]),
            ],
        ),
        bug(2, &["dev-doc-complete"], vec![]),
        bug(3, &[], vec![]),
    ]);
    assert_eq!(labels.get(1), Some(0));
    assert_eq!(labels.get(2), Some(1));
    assert_eq!(labels.get(3), Some(0));
    assert_eq!(labels.domain, vec![0, 1]);
}

#[test]
fn history_replay_follows_last_qualifying_event() {
    let labels = labels_for(&[
        bug(
            10,
            &[],
            vec![entry("2020-01-01T00:00:00Z", vec![keywords_change(&["dev-doc-needed"], &[])])],
        ),
        bug(
            11,
            &[],
            vec![
                entry("2020-01-01T00:00:00Z", vec![keywords_change(&[], &["dev-doc-needed"])]),
                entry("2020-03-01T00:00:00Z", vec![keywords_change(&["dev-doc-complete"], &[])]),
            ],
        ),
        bug(
            12,
            &["dev-doc-needed"],
            vec![entry("2020-01-01T00:00:00Z", vec![keywords_change(&[], &["dev-doc-needed"])])],
        ),
    ]);
    assert_eq!(labels.get(10), Some(1));
    assert_eq!(labels.get(11), Some(1));
    assert_eq!(labels.get(12), Some(1));
}

#[test]
fn domain_is_fixed_even_without_bugs() {
    let labels = labels_for(&[]);
    assert!(labels.classes.is_empty());
    assert_eq!(labels.domain, vec![0, 1]);
    assert_eq!(labels.counts(), vec![0, 0]);
}

#[test]
fn malformed_record_fails_the_run_by_default() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bugs.jsonl");
    write_jsonl(
        &path,
        &[bug(1, &[], vec![]), json!({ "id": 2, "history": [] }), bug(3, &[], vec![])],
    );
    let model = DevDocNeededModel::new(TriageConfig::default());
    let err = model.get_labels(read_bugs(&path).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Labels(LabelError::Bug(BugDataError::MissingField {
            bug_id: Some(2),
            field: "keywords",
        }))
    ));
}

#[test]
fn skip_policy_labels_the_remaining_bugs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bugs.jsonl");
    std::fs::write(
        &path,
        format!(
            "{}\nnot json\n{}\n",
            bug(1, &["dev-doc-needed"], vec![]),
            bug(3, &[], vec![])
        ),
    )
    .unwrap();

    let mut settings = TriageConfig::default();
    settings.labels.on_invalid_bug = InvalidBugPolicy::SkipAndLog;
    let labels = DevDocNeededModel::new(settings)
        .get_labels(read_bugs(&path).unwrap())
        .unwrap();
    assert_eq!(labels.classes.len(), 2);
    assert_eq!(labels.get(1), Some(1));
    assert_eq!(labels.get(3), Some(0));
}

#[test]
fn validated_order_rejects_out_of_order_history() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bugs.jsonl");
    write_jsonl(
        &path,
        &[bug(
            7,
            &[],
            vec![
                entry("2021-05-01T00:00:00Z", vec![keywords_change(&["dev-doc-needed"], &[])]),
                entry("2021-01-01T00:00:00Z", vec![keywords_change(&[], &["dev-doc-needed"])]),
            ],
        )],
    );
    let options = LabelOptions {
        history_order: HistoryOrder::Validate,
        ..LabelOptions::default()
    };
    let err = derive_labels(read_bugs(&path).unwrap(), options).unwrap_err();
    assert!(matches!(err, LabelError::InvalidHistoryOrder { bug_id: 7, index: 1 }));

    let trusted = derive_labels(read_bugs(&path).unwrap(), LabelOptions::default()).unwrap();
    assert_eq!(trusted.get(7), Some(0));
}

#[test]
fn skip_policy_stops_at_an_unreadable_dump() {
    let dir = tempdir().unwrap();
    let Ok(records) = read_bugs(dir.path()) else {
        return;
    };
    let options = LabelOptions {
        on_invalid_bug: InvalidBugPolicy::SkipAndLog,
        ..LabelOptions::default()
    };
    let labels = derive_labels(records, options).unwrap();
    assert!(labels.classes.is_empty());
}
