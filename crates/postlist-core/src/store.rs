//! List store
//!
//! A `ListStore` keeps a local list in step with a JSON list endpoint. Each
//! operation commits an in-flight snapshot, sends one request, and commits
//! the outcome: reconciled data under `Loaded`, or the unchanged data under
//! `Error`/`ValidationError`.
//!
//! Operations never return errors. They return the server's raw `d` value
//! on success and `None` otherwise; the committed status says what failed.
//!
//! ## Usage
//!
//! ```ignore
//! let store = ListStore::new("https://api.example.com/todos", None);
//!
//! store.get(None, false).await;
//! store.post(json!({"title": "write docs"}), None).await;
//! store.more(None).await;
//!
//! if store.status() == Status::ValidationError {
//!     for msg in store.snapshot().status.validation_messages() { ... }
//! }
//! ```
//!
//! There is no in-flight guard: concurrent operations on one store race,
//! and whichever response arrives last determines the final snapshot.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::envelope::{Envelope, Outcome};
use crate::error::ListError;
use crate::observable::{Callback, Observable, Subscription, WatchCell};
use crate::reconcile::{self, paginated_url};
use crate::session::SessionDelegate;
use crate::snapshot::{Extra, Record, Snapshot};
use crate::status::{Status, StatusRecord};
use crate::transport::{HttpTransport, Method, Request, Transport};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A list synchronized with a remote endpoint
pub struct ListStore<O = WatchCell<Snapshot>> {
    default_url: String,
    cell: O,
    transport: Option<Arc<dyn Transport>>,
    session: RwLock<Option<Arc<dyn SessionDelegate>>>,
    /// Id of the last item after the latest successful reconcile
    cursor: Mutex<Option<Value>>,
    history_limit: Option<usize>,
    capture_history_data: bool,
}

enum TransportChoice {
    Http(Duration),
    Custom(Arc<dyn Transport>),
    Absent,
}

/// Builder for [`ListStore`]
pub struct ListStoreBuilder {
    default_url: String,
    initial: Option<Vec<Record>>,
    transport: TransportChoice,
    session: Option<Arc<dyn SessionDelegate>>,
    history_limit: Option<usize>,
    capture_history_data: bool,
}

impl ListStoreBuilder {
    /// Start with data already known; the store begins `Loaded`
    pub fn initial_data(mut self, data: Vec<Record>) -> Self {
        self.initial = Some(data);
        self
    }

    /// Send requests through `transport` instead of HTTP
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = TransportChoice::Custom(transport);
        self
    }

    /// Build without any transport
    ///
    /// `get` then returns an empty list without touching the status, and the
    /// other operations fail with [`ListError::Unavailable`].
    pub fn without_transport(mut self) -> Self {
        self.transport = TransportChoice::Absent;
        self
    }

    pub fn session(mut self, delegate: Arc<dyn SessionDelegate>) -> Self {
        self.session = Some(delegate);
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn capture_history_data(mut self, capture: bool) -> Self {
        self.capture_history_data = capture;
        self
    }

    /// Apply timeout and history settings from a [`Config`]
    pub fn config(mut self, config: &Config) -> Self {
        if let TransportChoice::Http(_) = self.transport {
            self.transport = TransportChoice::Http(config.timeout());
        }
        self.history_limit = config.history_limit;
        self.capture_history_data = config.capture_history_data;
        self
    }

    /// Build a store publishing through a [`WatchCell`]
    pub fn build(self) -> ListStore {
        self.build_with(WatchCell::new)
    }

    /// Build a store publishing through a custom container
    ///
    /// `make` receives the initial snapshot.
    pub fn build_with<O, F>(self, make: F) -> ListStore<O>
    where
        O: Observable<Snapshot>,
        F: FnOnce(Snapshot) -> O,
    {
        let initial = Snapshot::initial(self.initial);
        let cursor = reconcile::cursor(&initial.data);

        let transport: Option<Arc<dyn Transport>> = match self.transport {
            TransportChoice::Http(timeout) => match HttpTransport::new(timeout) {
                Ok(http) => Some(Arc::new(http)),
                Err(e) => {
                    warn!("HTTP transport unavailable: {}", e);
                    None
                }
            },
            TransportChoice::Custom(transport) => Some(transport),
            TransportChoice::Absent => None,
        };

        ListStore {
            default_url: self.default_url,
            cell: make(initial),
            transport,
            session: RwLock::new(self.session),
            cursor: Mutex::new(cursor),
            history_limit: self.history_limit,
            capture_history_data: self.capture_history_data,
        }
    }
}

impl ListStore {
    /// Create a store talking HTTP to `default_url`
    ///
    /// With `initial` data the store starts `Loaded`, otherwise
    /// `Uninitialized` and empty.
    pub fn new(default_url: impl Into<String>, initial: Option<Vec<Record>>) -> Self {
        let mut builder = Self::builder(default_url);
        if let Some(data) = initial {
            builder = builder.initial_data(data);
        }
        builder.build()
    }

    pub fn builder(default_url: impl Into<String>) -> ListStoreBuilder {
        ListStoreBuilder {
            default_url: default_url.into(),
            initial: None,
            transport: TransportChoice::Http(DEFAULT_TIMEOUT),
            session: None,
            history_limit: None,
            capture_history_data: false,
        }
    }

    /// Receiver for async consumers; sees every snapshot committed from now on
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.cell.watch()
    }
}

impl<O: Observable<Snapshot>> ListStore<O> {
    // ==================== Accessors ====================

    pub fn default_url(&self) -> &str {
        &self.default_url
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.cell.get()
    }

    pub fn status(&self) -> Status {
        self.cell.get().status.status
    }

    pub fn data(&self) -> Arc<Vec<Record>> {
        self.cell.get().data
    }

    /// The id `more` will page after, if any
    pub fn cursor(&self) -> Option<Value> {
        self.cursor.lock().clone()
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    /// The container snapshots are published through
    pub fn observable(&self) -> &O {
        &self.cell
    }

    /// Receive the current snapshot now and every later one
    pub fn subscribe(&self, on_change: Callback<Snapshot>) -> Subscription {
        self.cell.subscribe(on_change)
    }

    /// Forward session fragments from responses to `delegate`
    pub fn set_session_delegate(&self, delegate: Arc<dyn SessionDelegate>) {
        *self.session.write() = Some(delegate);
    }

    // ==================== Operations ====================

    /// Fetch the list and merge it into local data
    ///
    /// With `overwrite`, local data is cleared when the request starts.
    pub async fn get(&self, url: Option<&str>, overwrite: bool) -> Option<Value> {
        if self.transport.is_none() {
            debug!("No transport, get() returns an empty list");
            return Some(Value::Array(Vec::new()));
        }

        self.begin(Status::Getting, Vec::new(), overwrite);
        self.execute(Request::get(self.resolve(url))).await
    }

    /// Create or update records
    ///
    /// `obj` may be a single object or an array of objects.
    pub async fn post(&self, obj: Value, url: Option<&str>) -> Option<Value> {
        self.mutate(Method::Post, Status::Posting, obj, url).await
    }

    /// Delete records; the objects (or their ids) are sent as the JSON body
    pub async fn del(&self, obj: Value, url: Option<&str>) -> Option<Value> {
        self.mutate(Method::Delete, Status::Deleting, obj, url).await
    }

    /// Fetch the next page, after the last item's id
    ///
    /// Does nothing and returns `None` when there is no cursor yet.
    pub async fn more(&self, url: Option<&str>) -> Option<Value> {
        let Some(after) = self.cursor() else {
            debug!("No cursor, more() skipped");
            return None;
        };

        self.begin(Status::LoadingMore, Vec::new(), false);
        let url = paginated_url(&self.resolve(url), &after);
        self.execute(Request::get(url)).await
    }

    /// Roll back to the newest stable snapshot in the status history
    ///
    /// A stable store is left alone, as is one without a stable ancestor.
    /// Data and extra come from the history entry when it captured them,
    /// otherwise the current values are kept.
    pub fn to_stable(&self) {
        self.cell.update(|current| {
            if current.status.is_stable() {
                return current.clone();
            }
            match current.status.previous_stable() {
                Some(entry) => {
                    debug!(status = %entry.record.status, "Rolling back to stable status");
                    Snapshot {
                        status: Arc::clone(&entry.record),
                        data: entry
                            .data
                            .clone()
                            .unwrap_or_else(|| Arc::clone(&current.data)),
                        extra: entry
                            .extra
                            .clone()
                            .unwrap_or_else(|| Arc::clone(&current.extra)),
                    }
                }
                None => current.clone(),
            }
        });
    }

    // ==================== Internals ====================

    fn resolve(&self, url: Option<&str>) -> String {
        url.unwrap_or(&self.default_url).to_string()
    }

    async fn mutate(
        &self,
        method: Method,
        status: Status,
        obj: Value,
        url: Option<&str>,
    ) -> Option<Value> {
        let items = match obj {
            Value::Array(items) => items,
            single => vec![single],
        };
        let subjects = items
            .iter()
            .map(|item| item.get("id").cloned().unwrap_or(Value::Null))
            .collect();

        self.begin(status, subjects, false);

        let body = match serde_json::to_vec(&items) {
            Ok(body) => body,
            Err(e) => {
                self.fail(ListError::Transport(e.to_string()));
                return None;
            }
        };
        self.execute(Request::json(method, self.resolve(url), body))
            .await
    }

    /// Commit an in-flight status chained to the current one
    fn begin(&self, status: Status, subjects: Vec<Value>, clear_data: bool) {
        self.cell.update(|current| {
            let record = StatusRecord::chained(
                status,
                current.history_entry(self.capture_history_data),
                self.history_limit,
            )
            .with_subjects(subjects);

            Snapshot {
                status: Arc::new(record),
                data: if clear_data {
                    Arc::new(Vec::new())
                } else {
                    Arc::clone(&current.data)
                },
                extra: Arc::clone(&current.extra),
            }
        });
        debug!(%status, "Operation started");
    }

    async fn execute(&self, request: Request) -> Option<Value> {
        let method = request.method;
        let url = request.url.clone();

        let Some(transport) = &self.transport else {
            self.fail(ListError::Unavailable);
            return None;
        };

        debug!(%method, %url, "Sending request");
        let response = match transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%method, %url, "Request failed: {}", e);
                self.fail(e.into());
                return None;
            }
        };

        if !response.is_success() {
            warn!(%method, %url, status = response.status, "Server returned an error status");
            self.fail(ListError::RequestFailed {
                status: response.status,
            });
            return None;
        }

        let envelope = match Envelope::decode(&response.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(%method, %url, "Undecodable response: {}", e);
                self.fail(e);
                return None;
            }
        };

        match envelope.into_outcome() {
            Outcome::Invalid(errors) => {
                info!(%method, %url, count = errors.len(), "Validation failed");
                self.fail_validation(errors);
                None
            }
            Outcome::Failed(err) => {
                warn!(%method, %url, "Server reported an error: {}", err);
                self.fail(err);
                None
            }
            Outcome::Data {
                data,
                remove,
                extra,
                session,
            } => {
                if let Some(fragment) = session {
                    let delegate = self.session.read().clone();
                    if let Some(delegate) = delegate {
                        delegate.set(fragment);
                    }
                }
                self.commit_loaded(&data, &remove, extra);
                info!(%method, %url, received = data.len(), removed = remove.len(), "Loaded");
                Some(Value::Array(data))
            }
        }
    }

    fn commit_loaded(&self, incoming: &[Record], remove: &[Value], extra: Extra) {
        self.cell.update(|current| {
            let merged = reconcile::reconcile(&current.data, incoming, remove);
            *self.cursor.lock() = reconcile::cursor(&merged);

            let record = StatusRecord::chained(
                Status::Loaded,
                current.history_entry(self.capture_history_data),
                self.history_limit,
            );
            Snapshot {
                status: Arc::new(record),
                data: Arc::new(merged),
                extra: Arc::new(extra),
            }
        });
    }

    /// Commit an `Error` status; data and extra stay as they are
    fn fail(&self, error: ListError) {
        self.cell.update(|current| {
            let record = StatusRecord::chained(
                Status::Error,
                current.history_entry(self.capture_history_data),
                self.history_limit,
            )
            .with_subjects(current.status.subject_ids.clone())
            .with_error(error);
            current.with_status(record)
        });
    }

    fn fail_validation(&self, errors: Vec<Value>) {
        self.cell.update(|current| {
            let record = StatusRecord::chained(
                Status::ValidationError,
                current.history_entry(self.capture_history_data),
                self.history_limit,
            )
            .with_subjects(current.status.subject_ids.clone())
            .with_validation_errors(errors);
            current.with_status(record)
        });
    }
}
