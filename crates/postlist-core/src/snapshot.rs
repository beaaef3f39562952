//! The observable value of a list store

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::status::{HistoryEntry, Status, StatusRecord};

/// A list item. Only its `id` field is interpreted.
pub type Record = Value;

/// Side-channel payload from the server, replaced wholesale on success
pub type Extra = Map<String, Value>;

/// Status, data and extra as of the last commit
///
/// Snapshots are replaced, never mutated; cloning one is cheap.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub status: Arc<StatusRecord>,
    pub data: Arc<Vec<Record>>,
    pub extra: Arc<Extra>,
}

impl Snapshot {
    /// The snapshot a store starts with
    ///
    /// `Loaded` with the given items, or `Uninitialized` and empty.
    pub fn initial(data: Option<Vec<Record>>) -> Self {
        let (status, data) = match data {
            Some(items) => (Status::Loaded, items),
            None => (Status::Uninitialized, Vec::new()),
        };
        Self {
            status: Arc::new(StatusRecord::new(status)),
            data: Arc::new(data),
            extra: Arc::new(Extra::new()),
        }
    }

    /// A history entry pointing at this snapshot's status
    pub(crate) fn history_entry(&self, capture_data: bool) -> HistoryEntry {
        if capture_data {
            HistoryEntry::with_snapshot(
                Arc::clone(&self.status),
                Arc::clone(&self.data),
                Arc::clone(&self.extra),
            )
        } else {
            HistoryEntry::new(Arc::clone(&self.status))
        }
    }

    /// Same data and extra under a new status
    pub(crate) fn with_status(&self, status: StatusRecord) -> Self {
        Self {
            status: Arc::new(status),
            data: Arc::clone(&self.data),
            extra: Arc::clone(&self.extra),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
