//! postlist core library
//!
//! A client-side list that stays in sync with a JSON list endpoint. The
//! store fetches, creates, updates, deletes and paginates records, merges
//! every response into its local copy by `id`, and publishes one observable
//! snapshot holding the data together with the status of the last operation.
//!
//! # Quick Start
//!
//! ```text
//! let store = ListStore::new("https://api.example.com/todos", None);
//!
//! store.get(None, false).await;            // fetch
//! store.post(json!({"title": "x"}), None).await;  // create
//! store.more(None).await;                  // next page
//!
//! let snapshot = store.snapshot();
//! println!("{} items, status {}", snapshot.len(), snapshot.status.status);
//! ```
//!
//! # Modules
//!
//! - `store`: the list store (main entry point)
//! - `status`: status records and their history chain
//! - `reconcile`: merging server data into local data
//! - `envelope`: the response wire format
//! - `observable`: the container snapshots are published through
//! - `transport`: HTTP and mock transports
//! - `session`: session fragment delegates
//! - `config`: client configuration

pub mod config;
pub mod envelope;
pub mod error;
pub mod observable;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod status;
pub mod store;
pub mod transport;

pub use config::Config;
pub use envelope::{Envelope, Outcome};
pub use error::{ListError, TransportError};
pub use observable::{Callback, Observable, Subscription, WatchCell};
pub use session::{FileSession, SessionDelegate, SessionSlot};
pub use snapshot::{Extra, Record, Snapshot};
pub use status::{HistoryEntry, Status, StatusRecord, LOADING_STATUSES, STABLE_STATUSES};
pub use store::{ListStore, ListStoreBuilder};
pub use transport::{HttpTransport, Method, MockTransport, Request, Response, Transport};
