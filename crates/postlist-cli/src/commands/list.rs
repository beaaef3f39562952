//! List command handlers

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use tracing::debug;

use postlist_core::{ListStore, Snapshot};

use crate::output::Output;

/// Fetch the list, then up to `pages - 1` further pages
pub async fn get(store: &ListStore, overwrite: bool, pages: usize, output: &Output) -> Result<()> {
    if store.get(None, overwrite).await.is_none() {
        return Err(failure(&store.snapshot()));
    }

    for page in 1..pages {
        if store.cursor().is_none() {
            break;
        }
        match store.more(None).await {
            Some(Value::Array(received)) if received.is_empty() => {
                debug!(page, "No more pages");
                break;
            }
            Some(_) => {}
            None => return Err(failure(&store.snapshot())),
        }
    }

    output.print_records(&store.data());
    Ok(())
}

/// Create or update the records in `json`
pub async fn post(store: &ListStore, json: &str, output: &Output) -> Result<()> {
    let obj = parse_records(json)?;
    match store.post(obj, None).await {
        Some(returned) => {
            let records = into_records(returned);
            output.print_records(&records);
            if !output.is_json() {
                output.success(&format!("Saved {} record(s)", records.len()));
            }
            Ok(())
        }
        None => Err(failure(&store.snapshot())),
    }
}

/// Delete the records in `json`
pub async fn delete(store: &ListStore, json: &str, output: &Output) -> Result<()> {
    let obj = parse_records(json)?;
    match store.del(obj, None).await {
        Some(returned) => {
            if output.is_json() {
                output.print_records(&into_records(returned));
            } else {
                output.success(&format!("{} record(s) left", store.data().len()));
            }
            Ok(())
        }
        None => Err(failure(&store.snapshot())),
    }
}

fn parse_records(json: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(json).context("Invalid JSON")?;
    match &value {
        Value::Object(_) => Ok(value),
        Value::Array(items) if items.iter().all(Value::is_object) => Ok(value),
        _ => Err(anyhow!("Expected a JSON object or an array of objects")),
    }
}

fn into_records(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Describe the failed status of a snapshot, validation messages included
fn failure(snapshot: &Snapshot) -> anyhow::Error {
    let record = &snapshot.status;
    let mut message = match &record.error {
        Some(error) => error.to_string(),
        None => format!("request ended with status {}", record.status),
    };
    for line in record.validation_messages() {
        message.push_str("\n  ");
        message.push_str(&line);
    }
    anyhow!(message)
}
