//! Merging server data into local data
//!
//! Incoming items are matched to local items by `id`. A match is replaced by
//! a shallow merge (incoming fields win, local-only fields survive), anything
//! unmatched is appended, and ids listed for removal are dropped afterwards.
//! An empty local list is simply replaced by the incoming one.

use serde_json::Value;

use crate::snapshot::Record;

/// The `id` of a record, if it has a non-null one
pub fn record_id(record: &Record) -> Option<&Value> {
    record.get("id").filter(|id| !id.is_null())
}

/// Loose id equality
///
/// Numbers and numeric strings compare by value, so `1` matches `"1"`.
/// Missing or null ids never match anything. Empty strings and booleans
/// are not coerced to numbers: `0` does not match `""`, `true` not `1`.
pub fn ids_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            let s = s.trim();
            !s.is_empty() && s.parse::<f64>().ok() == n.as_f64()
        }
        (Value::Bool(x), Value::Bool(y)) => x == y,
        _ => false,
    }
}

/// Merge `incoming` into `current`, then drop items whose id is in `remove`
///
/// When `current` is empty the result is `incoming` as sent and `remove`
/// is not consulted.
pub fn reconcile(current: &[Record], incoming: &[Record], remove: &[Value]) -> Vec<Record> {
    if current.is_empty() {
        return incoming.to_vec();
    }

    let mut merged = current.to_vec();
    for item in incoming {
        let position = record_id(item).and_then(|id| {
            merged
                .iter()
                .position(|existing| record_id(existing).is_some_and(|eid| ids_match(eid, id)))
        });

        match position {
            Some(j) => {
                let combined = shallow_merge(&merged[j], item);
                merged[j] = combined;
            }
            None => merged.push(item.clone()),
        }
    }

    if !remove.is_empty() {
        merged.retain(|existing| match existing.get("id") {
            Some(id) => !remove.contains(id),
            None => true,
        });
    }

    merged
}

/// Fields of `incoming` override those of `existing`
fn shallow_merge(existing: &Record, incoming: &Record) -> Record {
    match (existing, incoming) {
        (Value::Object(base), Value::Object(over)) => {
            let mut out = base.clone();
            for (key, value) in over {
                out.insert(key.clone(), value.clone());
            }
            Value::Object(out)
        }
        _ => incoming.clone(),
    }
}

/// The pagination cursor: the id of the last item
pub fn cursor(data: &[Record]) -> Option<Value> {
    data.last().and_then(record_id).cloned()
}

/// Render an id for use in an `after=` query parameter
pub fn cursor_param(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Append `after=<id>` to a URL, respecting an existing query string
pub fn paginated_url(url: &str, after: &Value) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}after={}", url, separator, cursor_param(after))
}
