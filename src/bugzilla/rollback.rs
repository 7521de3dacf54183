//! Reconstruct an earlier snapshot of a bug by undoing history entries.

use super::{Bug, Change};

/// Roll `bug` back to the state it was in just before the earliest history
/// entry containing a change for which `when` holds.
///
/// Entries are undone newest first, down to and including the matching one.
/// Comments and attachments created at or after that entry are dropped. A bug
/// with no matching change is returned unchanged.
pub fn rollback<F>(bug: &Bug, when: F) -> Bug
where
    F: Fn(&Change) -> bool,
{
    let Some(cutoff) = bug
        .history
        .iter()
        .position(|entry| entry.changes.iter().any(&when))
    else {
        return bug.clone();
    };

    let mut snapshot = bug.clone();
    for entry in bug.history[cutoff..].iter().rev() {
        for change in entry.changes.iter().rev() {
            undo_change(&mut snapshot, change);
        }
    }
    snapshot.history.truncate(cutoff);

    if let Some(when) = bug.history[cutoff].when.as_deref() {
        // RFC 3339 UTC timestamps from Bugzilla order lexicographically.
        let before = |created: &Option<String>| created.as_deref().is_none_or(|time| time < when);
        snapshot.comments.retain(|comment| before(&comment.creation_time));
        snapshot
            .attachments
            .retain(|attachment| before(&attachment.creation_time));
    }
    snapshot
}

fn undo_change(bug: &mut Bug, change: &Change) {
    if let Some(values) = list_field(bug, &change.field_name) {
        values.retain(|value| !change.added.contains(value));
        for value in &change.removed {
            if !values.contains(value) {
                values.push(value.clone());
            }
        }
        return;
    }
    if let Some(value) = scalar_field(bug, &change.field_name) {
        *value = change.removed.join(", ");
    }
}

fn list_field<'a>(bug: &'a mut Bug, field_name: &str) -> Option<&'a mut Vec<String>> {
    match field_name {
        "keywords" => Some(&mut bug.keywords),
        "cc" => Some(&mut bug.cc),
        "blocks" => Some(&mut bug.blocks),
        "depends_on" => Some(&mut bug.depends_on),
        "see_also" => Some(&mut bug.see_also),
        "regressions" => Some(&mut bug.regressions),
        "regressed_by" => Some(&mut bug.regressed_by),
        _ => None,
    }
}

fn scalar_field<'a>(bug: &'a mut Bug, field_name: &str) -> Option<&'a mut String> {
    match field_name {
        "summary" => Some(&mut bug.summary),
        "severity" => Some(&mut bug.severity),
        "product" => Some(&mut bug.product),
        "component" => Some(&mut bug.component),
        "url" => Some(&mut bug.url),
        "whiteboard" | "status_whiteboard" => Some(&mut bug.whiteboard),
        "cf_crash_signature" => Some(&mut bug.cf_crash_signature),
        "cf_has_str" => Some(&mut bug.cf_has_str),
        "cf_has_regression_range" => Some(&mut bug.cf_has_regression_range),
        _ => None,
    }
}
