use serde_json::{Map, Value};

use super::{Attachment, Bug, BugDataError, BugId, Change, Comment, Commit, HistoryEntry};

pub const DEV_DOC_NEEDED: &str = "dev-doc-needed";
pub const DEV_DOC_COMPLETE: &str = "dev-doc-complete";

type Object = Map<String, Value>;

impl Bug {
    /// Build a bug from a raw Bugzilla JSON record.
    ///
    /// `id`, `keywords` and `history` are required, as are `changes` on every
    /// history entry and `field_name`/`added`/`removed` on every change. All other
    /// fields fall back to empty values.
    pub fn from_value(value: &Value) -> Result<Self, BugDataError> {
        let object = value.as_object().ok_or(BugDataError::InvalidField {
            bug_id: None,
            field: "id",
            reason: "record is not a JSON object".to_string(),
        })?;
        let id = parse_id(object)?;
        let ctx = Some(id);

        let keywords = string_list(required(object, "keywords", ctx)?, "keywords", ctx)?;
        let history = required(object, "history", ctx)?
            .as_array()
            .ok_or_else(|| invalid(ctx, "history", "expected an array"))?
            .iter()
            .map(|entry| parse_history_entry(entry, ctx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            keywords,
            history,
            summary: optional_string(object, "summary", ctx)?,
            severity: optional_string(object, "severity", ctx)?,
            product: optional_string(object, "product", ctx)?,
            component: optional_string(object, "component", ctx)?,
            url: optional_string(object, "url", ctx)?,
            whiteboard: optional_string(object, "whiteboard", ctx)?,
            cf_crash_signature: optional_string(object, "cf_crash_signature", ctx)?,
            cf_has_str: optional_string(object, "cf_has_str", ctx)?,
            cf_has_regression_range: optional_string(object, "cf_has_regression_range", ctx)?,
            cc: optional_list(object, "cc", ctx)?,
            blocks: optional_list(object, "blocks", ctx)?,
            depends_on: optional_list(object, "depends_on", ctx)?,
            see_also: optional_list(object, "see_also", ctx)?,
            regressions: optional_list(object, "regressions", ctx)?,
            regressed_by: optional_list(object, "regressed_by", ctx)?,
            comments: optional_array(object, "comments", ctx, parse_comment)?,
            attachments: optional_array(object, "attachments", ctx, parse_attachment)?,
            commits: optional_array(object, "commits", ctx, parse_commit)?,
        })
    }
}

fn parse_id(object: &Object) -> Result<BugId, BugDataError> {
    match required(object, "id", None)? {
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| invalid(None, "id", format!("{number} is not a positive integer"))),
        Value::String(text) => text
            .trim()
            .parse::<BugId>()
            .map_err(|_| invalid(None, "id", format!("{text:?} is not an integer"))),
        other => Err(invalid(None, "id", format!("unexpected value {other}"))),
    }
}

fn parse_history_entry(value: &Value, ctx: Option<BugId>) -> Result<HistoryEntry, BugDataError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid(ctx, "history", "entry is not an object"))?;
    let changes = required(object, "changes", ctx)?
        .as_array()
        .ok_or_else(|| invalid(ctx, "changes", "expected an array"))?
        .iter()
        .map(|change| parse_change(change, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HistoryEntry {
        when: optional_text(object, "when", ctx)?,
        who: optional_text(object, "who", ctx)?,
        changes,
    })
}

fn parse_change(value: &Value, ctx: Option<BugId>) -> Result<Change, BugDataError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid(ctx, "changes", "change is not an object"))?;
    let field_name = required(object, "field_name", ctx)?
        .as_str()
        .ok_or_else(|| invalid(ctx, "field_name", "expected a string"))?
        .to_string();
    Ok(Change {
        field_name,
        added: string_list(required(object, "added", ctx)?, "added", ctx)?,
        removed: string_list(required(object, "removed", ctx)?, "removed", ctx)?,
    })
}

fn parse_comment(value: &Value, ctx: Option<BugId>) -> Result<Comment, BugDataError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid(ctx, "comments", "comment is not an object"))?;
    Ok(Comment {
        text: optional_string(object, "text", ctx)?,
        creation_time: optional_text(object, "creation_time", ctx)?,
    })
}

fn parse_attachment(value: &Value, ctx: Option<BugId>) -> Result<Attachment, BugDataError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid(ctx, "attachments", "attachment is not an object"))?;
    // Bugzilla reports `is_patch` as either a boolean or 0/1.
    let is_patch = match object.get("is_patch") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_u64().is_some_and(|n| n != 0),
        Some(other) => return Err(invalid(ctx, "is_patch", format!("unexpected value {other}"))),
    };
    Ok(Attachment {
        is_patch,
        content_type: optional_string(object, "content_type", ctx)?,
        creation_time: optional_text(object, "creation_time", ctx)?,
    })
}

fn parse_commit(value: &Value, ctx: Option<BugId>) -> Result<Commit, BugDataError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid(ctx, "commits", "commit is not an object"))?;
    let count = |field: &'static str| -> Result<u64, BugDataError> {
        match object.get(field) {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Number(number)) => number
                .as_u64()
                .ok_or_else(|| invalid(ctx, field, "expected a non-negative integer")),
            Some(other) => Err(invalid(ctx, field, format!("unexpected value {other}"))),
        }
    };
    Ok(Commit {
        added: count("added")?,
        deleted: count("deleted")?,
        types: optional_list(object, "types", ctx)?,
        backedoutby: optional_string(object, "backedoutby", ctx)?,
    })
}

fn required<'a>(
    object: &'a Object,
    field: &'static str,
    ctx: Option<BugId>,
) -> Result<&'a Value, BugDataError> {
    object
        .get(field)
        .ok_or(BugDataError::MissingField { bug_id: ctx, field })
}

/// Accepts a JSON array of strings or a Bugzilla comma-separated string.
fn string_list(
    value: &Value,
    field: &'static str,
    ctx: Option<BugId>,
) -> Result<Vec<String>, BugDataError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(text) => Ok(split_list(text)),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.trim().to_string()),
                Value::Number(number) => Ok(number.to_string()),
                other => Err(invalid(ctx, field, format!("unexpected list item {other}"))),
            })
            .collect(),
        other => Err(invalid(ctx, field, format!("unexpected value {other}"))),
    }
}

pub(crate) fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn optional_list(
    object: &Object,
    field: &'static str,
    ctx: Option<BugId>,
) -> Result<Vec<String>, BugDataError> {
    match object.get(field) {
        Some(value) => string_list(value, field, ctx),
        None => Ok(Vec::new()),
    }
}

fn optional_text(
    object: &Object,
    field: &'static str,
    ctx: Option<BugId>,
) -> Result<Option<String>, BugDataError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(invalid(ctx, field, format!("expected a string, got {other}"))),
    }
}

fn optional_string(
    object: &Object,
    field: &'static str,
    ctx: Option<BugId>,
) -> Result<String, BugDataError> {
    Ok(optional_text(object, field, ctx)?.unwrap_or_default())
}

fn optional_array<T>(
    object: &Object,
    field: &'static str,
    ctx: Option<BugId>,
    parse: fn(&Value, Option<BugId>) -> Result<T, BugDataError>,
) -> Result<Vec<T>, BugDataError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(|item| parse(item, ctx)).collect(),
        Some(_) => Err(invalid(ctx, field, "expected an array")),
    }
}

fn invalid(ctx: Option<BugId>, field: &'static str, reason: impl Into<String>) -> BugDataError {
    BugDataError::InvalidField {
        bug_id: ctx,
        field,
        reason: reason.into(),
    }
}
