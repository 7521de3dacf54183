use std::path::Path;

use serde_json::{Value, json};

pub fn keywords_change(added: &[&str], removed: &[&str]) -> Value {
    json!({
        "field_name": "keywords",
        "added": added.join(", "),
        "removed": removed.join(", "),
    })
}

pub fn entry(when: &str, changes: Vec<Value>) -> Value {
    json!({ "when": when, "who": "dev@example.com", "changes": changes })
}

pub fn bug(id: u64, keywords: &[&str], history: Vec<Value>) -> Value {
    json!({ "id": id, "keywords": keywords, "history": history })
}

/// A bug that gained `dev-doc-needed` after its first comment.
pub fn documented_feature(id: u64) -> Value {
    json!({
        "id": id,
        "summary": "Implement the Web Share API in WebShare.cpp",
        "product": "Core",
        "component": "DOM: Web Share",
        "severity": "N/A",
        "keywords": ["dev-doc-needed"],
        "url": "https://w3c.github.io/web-share/",
        "history": [entry(
            "2022-05-02T10:00:00Z",
            vec![keywords_change(&["dev-doc-needed"], &[])],
        )],
        "comments": [
            { "text": "Ship navigator.share behind a pref", "creation_time": "2022-05-01T09:00:00Z" },
            { "text": "Please document the new API", "creation_time": "2022-05-02T10:00:00Z" },
        ],
        "attachments": [
            { "is_patch": 0, "content_type": "text/x-phabricator-request", "creation_time": "2022-05-01T12:00:00Z" }
        ],
        "commits": [{ "added": 120, "deleted": 4, "types": ["cpp", "webidl"], "backedoutby": "" }],
    })
}

/// A crash fix that never touched the dev-doc keywords.
pub fn crash_fix(id: u64) -> Value {
    json!({
        "id": id,
        "summary": "Crash in nsTableFrame::Paint",
        "product": "Core",
        "component": "Layout: Tables",
        "severity": "S2",
        "keywords": ["crash"],
        "cf_crash_signature": "[@ nsTableFrame::Paint]",
        "whiteboard": "[layout:triage]",
        "history": [entry(
            "2022-06-01T10:00:00Z",
            vec![keywords_change(&["crash"], &[])],
        )],
        "comments": [
            { "text": "Null deref while painting borders", "creation_time": "2022-05-30T09:00:00Z" },
        ],
        "commits": [{ "added": 3, "deleted": 1, "types": ["cpp"], "backedoutby": "" }],
    })
}

pub fn write_jsonl(path: &Path, records: &[Value]) {
    let mut text = String::new();
    for record in records {
        text.push_str(&record.to_string());
        text.push('\n');
    }
    std::fs::write(path, text).expect("write bug dump");
}
