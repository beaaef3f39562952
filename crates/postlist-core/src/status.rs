//! Status records
//!
//! Every operation on a list store produces a new [`StatusRecord`]. A record
//! owns the chain of records that came before it (oldest first), which is
//! what makes rolling back to the last stable state possible.
//!
//! Records are immutable once built. Ancestors are shared through `Arc`, so
//! chaining a new record never touches an existing one.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::ListError;
use crate::snapshot::{Extra, Record};

/// Lifecycle state of a list store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Sentinel for "no previous record"; never the live status
    None,
    /// Created without data, no server contact yet
    Uninitialized,
    /// A GET is in flight
    Getting,
    /// A POST is in flight
    Posting,
    /// A DELETE is in flight
    Deleting,
    /// A paginated GET is in flight
    LoadingMore,
    /// The last operation succeeded
    Loaded,
    /// The server rejected the request with field-level errors
    ValidationError,
    /// The request failed
    Error,
}

/// Statuses describing an operation in flight
pub const LOADING_STATUSES: [Status; 4] = [
    Status::Getting,
    Status::Posting,
    Status::Deleting,
    Status::LoadingMore,
];

/// Statuses a store can be rolled back to
pub const STABLE_STATUSES: [Status; 2] = [Status::Uninitialized, Status::Loaded];

impl Status {
    pub fn is_loading(&self) -> bool {
        LOADING_STATUSES.contains(self)
    }

    pub fn is_stable(&self) -> bool {
        STABLE_STATUSES.contains(self)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error | Status::ValidationError)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::None => "none",
            Status::Uninitialized => "uninitialized",
            Status::Getting => "getting",
            Status::Posting => "posting",
            Status::Deleting => "deleting",
            Status::LoadingMore => "loading more",
            Status::Loaded => "loaded",
            Status::ValidationError => "validation error",
            Status::Error => "error",
        };
        f.write_str(name)
    }
}

/// One ancestor in a record's history
///
/// `data` and `extra` are only present when the store was configured to
/// capture them; rollback falls back to the current values otherwise.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub record: Arc<StatusRecord>,
    pub data: Option<Arc<Vec<Record>>>,
    pub extra: Option<Arc<Extra>>,
}

impl HistoryEntry {
    /// An entry carrying only the record
    pub fn new(record: Arc<StatusRecord>) -> Self {
        Self {
            record,
            data: None,
            extra: None,
        }
    }

    /// An entry that also captures the data and extra it was committed with
    pub fn with_snapshot(
        record: Arc<StatusRecord>,
        data: Arc<Vec<Record>>,
        extra: Arc<Extra>,
    ) -> Self {
        Self {
            record,
            data: Some(data),
            extra: Some(extra),
        }
    }
}

/// Outcome of one operation plus the lineage that led to it
#[derive(Debug, Clone)]
pub struct StatusRecord {
    pub status: Status,
    pub timestamp: DateTime<Utc>,
    /// Ids of the records the operation targets; `Null` for records without one
    pub subject_ids: Vec<Value>,
    pub error: Option<ListError>,
    /// Structured failures exactly as the server sent them
    pub validation_errors: Option<Vec<Value>>,
    history: Vec<HistoryEntry>,
}

impl StatusRecord {
    /// Create a record with no history
    pub fn new(status: Status) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
            subject_ids: Vec::new(),
            error: None,
            validation_errors: None,
            history: Vec::new(),
        }
    }

    /// Create a record whose history is `prev`'s history followed by `prev`
    ///
    /// With a `limit`, only the newest `limit` ancestors are kept.
    pub fn chained(status: Status, prev: HistoryEntry, limit: Option<usize>) -> Self {
        let mut history = Vec::with_capacity(prev.record.history.len() + 1);
        history.extend(prev.record.history.iter().cloned());
        history.push(prev);

        if let Some(limit) = limit {
            if history.len() > limit {
                let excess = history.len() - limit;
                history.drain(..excess);
            }
        }

        Self {
            history,
            ..Self::new(status)
        }
    }

    pub fn with_subjects(mut self, ids: Vec<Value>) -> Self {
        self.subject_ids = ids;
        self
    }

    pub fn with_error(mut self, error: ListError) -> Self {
        self.error = Some(error);
        self
    }

    /// Attach server validation failures; also sets the error to `Validation`
    pub fn with_validation_errors(mut self, errors: Vec<Value>) -> Self {
        self.error = Some(ListError::Validation);
        self.validation_errors = Some(errors);
        self
    }

    /// All ancestors, oldest first
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn is_stable(&self) -> bool {
        self.status.is_stable()
    }

    /// The status of the immediately preceding record, or `Status::None`
    pub fn previous_status(&self) -> Status {
        self.history
            .last()
            .map(|entry| entry.record.status)
            .unwrap_or(Status::None)
    }

    /// The newest ancestor with a stable status
    pub fn previous_stable(&self) -> Option<&HistoryEntry> {
        self.history
            .iter()
            .rev()
            .find(|entry| entry.record.is_stable())
    }

    /// Human-readable validation messages
    ///
    /// Understands class-validator shaped errors (`property`, `constraints`,
    /// nested `children`) as well as flat `{field, message}` objects.
    pub fn validation_messages(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(errors) = &self.validation_errors {
            for err in errors {
                collect_messages(err, None, &mut out);
            }
        }
        out
    }
}

fn collect_messages(err: &Value, parent: Option<&str>, out: &mut Vec<String>) {
    let Some(obj) = err.as_object() else {
        if let Some(text) = err.as_str() {
            out.push(text.to_string());
        }
        return;
    };

    let field = obj
        .get("property")
        .or_else(|| obj.get("field"))
        .and_then(Value::as_str);
    let path = match (parent, field) {
        (Some(p), Some(f)) => Some(format!("{}.{}", p, f)),
        (None, Some(f)) => Some(f.to_string()),
        (Some(p), None) => Some(p.to_string()),
        (None, None) => None,
    };

    let mut texts: Vec<&str> = Vec::new();
    if let Some(constraints) = obj.get("constraints").and_then(Value::as_object) {
        texts.extend(constraints.values().filter_map(Value::as_str));
    }
    if let Some(message) = obj.get("message").and_then(Value::as_str) {
        texts.push(message);
    }

    for text in texts {
        match &path {
            Some(p) => out.push(format!("{}: {}", p, text)),
            None => out.push(text.to_string()),
        }
    }

    if let Some(children) = obj.get("children").and_then(Value::as_array) {
        for child in children {
            collect_messages(child, path.as_deref(), out);
        }
    }
}
