//! Concurrent operations and snapshot publication

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use postlist_core::{
    Callback, Envelope, ListStore, MockTransport, Observable, Request, Response, Snapshot, Status,
    Subscription, Transport, TransportError,
};
use serde_json::json;
use tokio::sync::oneshot;

/// Holds each request until the test releases a response for its URL
#[derive(Default)]
struct GatedTransport {
    gates: Mutex<HashMap<String, oneshot::Receiver<Response>>>,
}

impl GatedTransport {
    fn gate(&self, url: &str) -> oneshot::Sender<Response> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(url.to_string(), rx);
        tx
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let gate = self.gates.lock().remove(&request.url);
        let Some(gate) = gate else {
            return Err(TransportError::Network {
                url: request.url,
                message: "no gate".into(),
            });
        };
        gate.await.map_err(|_| TransportError::Network {
            url: request.url.clone(),
            message: "gate dropped".into(),
        })
    }
}

#[tokio::test]
async fn test_last_response_wins() {
    let transport = Arc::new(GatedTransport::default());
    let slow = transport.gate("/slow");
    let fast = transport.gate("/fast");

    let store = Arc::new(
        ListStore::builder("/items")
            .transport(Arc::clone(&transport) as Arc<dyn Transport>)
            .initial_data(vec![json!({"id": 1, "title": "original"})])
            .build(),
    );

    let first = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.get(Some("/slow"), false).await })
    };
    let second = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.get(Some("/fast"), false).await })
    };

    let fast_body = Envelope::with_data(vec![json!({"id": 1, "title": "fast"})]);
    fast.send(Response::envelope(&fast_body)).unwrap();
    assert!(second.await.unwrap().is_some());
    assert_eq!(store.data()[0]["title"], "fast");

    // The earlier request resolves last and overwrites the later one
    let slow_body = Envelope::with_data(vec![json!({"id": 1, "title": "slow"})]);
    slow.send(Response::envelope(&slow_body)).unwrap();
    assert!(first.await.unwrap().is_some());

    let snapshot = store.snapshot();
    assert_eq!(snapshot.status.status, Status::Loaded);
    assert_eq!(*snapshot.data, vec![json!({"id": 1, "title": "slow"})]);
    assert_eq!(snapshot.status.history().len(), 4);
}

#[tokio::test]
async fn test_in_flight_status_visible_until_response() {
    let transport = Arc::new(GatedTransport::default());
    let gate = transport.gate("/items");

    let store = Arc::new(
        ListStore::builder("/items")
            .transport(Arc::clone(&transport) as Arc<dyn Transport>)
            .build(),
    );
    let mut rx = store.watch();

    let op = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.post(json!({"title": "x"}), None).await })
    };

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().status.status, Status::Posting);
    assert_eq!(store.status(), Status::Posting);

    gate.send(Response::envelope(&Envelope::with_data(vec![json!({"id": 10, "title": "x"})])))
        .unwrap();
    assert_eq!(op.await.unwrap(), Some(json!([{"id": 10, "title": "x"}])));
    assert_eq!(store.status(), Status::Loaded);
}

#[tokio::test]
async fn test_subscribers_see_every_commit() {
    let mock = Arc::new(MockTransport::new());
    mock.push_envelope(Envelope::with_data(vec![json!({"id": 1})]));
    mock.push_failure("offline");

    let store = ListStore::builder("/items")
        .transport(Arc::clone(&mock) as Arc<dyn Transport>)
        .build();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = store.subscribe(Box::new(move |s: &Snapshot| sink.lock().push(s.status.status)));

    store.get(None, false).await;
    store.more(None).await;
    store.to_stable();
    sub.unsubscribe();
    store.get(None, false).await;

    assert_eq!(
        *seen.lock(),
        vec![
            Status::Uninitialized,
            Status::Getting,
            Status::Loaded,
            Status::LoadingMore,
            Status::Error,
            Status::Loaded,
        ]
    );
}

/// A minimal container that only keeps the value and counts commits
struct CountingCell {
    value: Mutex<Snapshot>,
    commits: Mutex<usize>,
}

impl Observable<Snapshot> for CountingCell {
    fn get(&self) -> Snapshot {
        self.value.lock().clone()
    }

    fn set(&self, value: Snapshot) {
        *self.value.lock() = value;
        *self.commits.lock() += 1;
    }

    fn update<F>(&self, f: F)
    where
        F: FnOnce(&Snapshot) -> Snapshot,
    {
        let mut value = self.value.lock();
        *value = f(&value);
        *self.commits.lock() += 1;
    }

    fn subscribe(&self, on_change: Callback<Snapshot>) -> Subscription {
        on_change(&self.get());
        Subscription::new(|| {})
    }
}

#[tokio::test]
async fn test_custom_container() {
    let mock = Arc::new(MockTransport::new());
    mock.push_envelope(Envelope::with_data(vec![json!({"id": 1})]));

    let store = ListStore::builder("/items")
        .transport(Arc::clone(&mock) as Arc<dyn Transport>)
        .build_with(|initial| CountingCell {
            value: Mutex::new(initial),
            commits: Mutex::new(0),
        });

    store.get(None, false).await;

    assert_eq!(store.status(), Status::Loaded);
    assert_eq!(*store.observable().commits.lock(), 2);
}
