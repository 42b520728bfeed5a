//! Parse, shape probe, and per-object normalization with explicit defaults.

use crate::error::{IngestError, NormalizeError};
use respond_types::{Action, ActionType, Triggerer};
use serde_json::Value;

/// Parse the document and run the cheap shape probe: top level is an array and, if
/// non-empty, its first element carries a `codeid`. Later elements are not inspected.
pub fn parse_upload(body: &[u8]) -> Result<Vec<Value>, IngestError> {
    let doc: Value = serde_json::from_slice(body).map_err(|e| IngestError::Parse(e.to_string()))?;
    let Value::Array(items) = doc else {
        return Err(IngestError::NotAnArray);
    };
    if let Some(first) = items.first() {
        if !has_codeid(first) {
            return Err(IngestError::MissingCodeId);
        }
    }
    Ok(items)
}

/// `codeid` present and truthy: `null`, `false`, `0` and `""` count as missing.
pub fn has_codeid(item: &Value) -> bool {
    match item.get("codeid") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn int(item: &Value, key: &str) -> Option<i64> {
    let v = item.get(key)?;
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

fn string(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn flag(item: &Value, key: &str) -> bool {
    item.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn triggerer(item: &Value) -> Option<Triggerer> {
    let t = item.get("triggerer")?.as_object()?;
    let field = |k: &str| {
        t.get(k)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Some(Triggerer {
        username: field("username"),
        reason: field("reason"),
    })
}

/// Map one uploaded object to a row. Only an integer `codeid` is required; every other
/// column falls back to its empty value when absent or of the wrong JSON type. Unknown keys
/// are ignored.
pub fn normalize_record(index: usize, item: &Value) -> Result<Action, NormalizeError> {
    let codeid = int(item, "codeid").ok_or(NormalizeError::MissingKey { index })?;
    let ips = item
        .get("ips")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(Action {
        codeid,
        did: int(item, "did").unwrap_or(0),
        ip: string(item, "ip"),
        ips,
        action: ActionType::from(string(item, "action")),
        manual: flag(item, "manual"),
        triggerer: triggerer(item),
        label: string(item, "label"),
        detail: string(item, "detail"),
        score: item.get("score").and_then(Value::as_f64).unwrap_or(0.0),
        pbid: int(item, "pbid").unwrap_or(0),
        model: string(item, "model"),
        modeluuid: string(item, "modeluuid"),
        start: int(item, "start").unwrap_or(0),
        expires: int(item, "expires").unwrap_or(0),
        blocked: flag(item, "blocked"),
        active: flag(item, "active"),
        cleared: flag(item, "cleared"),
    })
}
