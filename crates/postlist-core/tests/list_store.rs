//! End-to-end behavior of a list store driven through a mock transport

use std::sync::Arc;

use postlist_core::{
    Envelope, ListError, ListStore, Method, MockTransport, Response, Status, Transport,
};
use serde_json::{json, Value};

const URL: &str = "https://api.example.com/todos";

fn store(mock: &Arc<MockTransport>, initial: Option<Vec<Value>>) -> ListStore {
    let mut builder = ListStore::builder(URL).transport(Arc::clone(mock) as Arc<dyn Transport>);
    if let Some(data) = initial {
        builder = builder.initial_data(data);
    }
    builder.build()
}

#[test]
fn test_initialization() {
    let mock = Arc::new(MockTransport::new());

    let empty = store(&mock, None);
    assert_eq!(empty.status(), Status::Uninitialized);
    assert!(empty.data().is_empty());

    let items = vec![json!({"id": 1, "title": "a"}), json!({"id": 2, "title": "b"})];
    let loaded = store(&mock, Some(items.clone()));
    assert_eq!(loaded.status(), Status::Loaded);
    assert_eq!(*loaded.data(), items);
}

#[tokio::test]
async fn test_merge_replace_preserves_unrelated_fields() {
    let mock = Arc::new(MockTransport::new());
    mock.push_envelope(Envelope::with_data(vec![json!({"id": 1, "b": 9})]));
    let store = store(&mock, Some(vec![json!({"id": 1, "a": 1, "b": 2})]));

    store.get(None, false).await;
    assert_eq!(*store.data(), vec![json!({"id": 1, "a": 1, "b": 9})]);
}

#[tokio::test]
async fn test_merge_append() {
    let mock = Arc::new(MockTransport::new());
    mock.push_envelope(Envelope::with_data(vec![json!({"id": 2})]));
    let store = store(&mock, Some(vec![json!({"id": 1})]));

    store.post(json!({"title": "new"}), None).await;
    assert_eq!(*store.data(), vec![json!({"id": 1}), json!({"id": 2})]);
}

#[tokio::test]
async fn test_merge_removal() {
    let mock = Arc::new(MockTransport::new());
    mock.push_envelope(Envelope::with_data(Vec::new()).removing(vec![json!(1)]));
    let store = store(&mock, Some(vec![json!({"id": 1}), json!({"id": 2})]));

    store.del(json!({"id": 1}), None).await;
    assert_eq!(*store.data(), vec![json!({"id": 2})]);
}

#[tokio::test]
async fn test_empty_store_takes_response_as_is() {
    let mock = Arc::new(MockTransport::new());
    mock.push_envelope(Envelope::with_data(vec![json!({"id": 5})]));
    let store = store(&mock, None);

    let result = store.get(None, false).await;
    assert_eq!(result, Some(json!([{"id": 5}])));
    assert_eq!(*store.data(), vec![json!({"id": 5})]);
    assert_eq!(store.status(), Status::Loaded);
}

#[tokio::test]
async fn test_validation_error_keeps_data() {
    let mock = Arc::new(MockTransport::new());
    mock.push_envelope(Envelope::with_validation_errors(vec![json!({"field": "x"})]));
    let before = vec![json!({"id": 1, "x": "ok"})];
    let store = store(&mock, Some(before.clone()));

    let result = store.post(json!({"id": 1, "x": ""}), None).await;
    assert!(result.is_none());

    let snapshot = store.snapshot();
    assert_eq!(snapshot.status.status, Status::ValidationError);
    assert_eq!(
        snapshot.status.validation_errors,
        Some(vec![json!({"field": "x"})])
    );
    assert_eq!(*snapshot.data, before);
}

#[tokio::test]
async fn test_missing_data_is_protocol_error() {
    let mock = Arc::new(MockTransport::new());
    mock.push_response(Response::new(200, b"{}".to_vec()));
    let store = store(&mock, None);

    assert!(store.get(None, false).await.is_none());

    let snapshot = store.snapshot();
    assert_eq!(snapshot.status.status, Status::Error);
    assert_eq!(snapshot.status.error, Some(ListError::MissingData));
    assert_eq!(
        snapshot.status.error.as_ref().map(|e| e.to_string()),
        Some("missing data".to_string())
    );
}

#[tokio::test]
async fn test_server_message_error() {
    let mock = Arc::new(MockTransport::new());
    mock.push_envelope(Envelope::with_message("title already taken"));
    let store = store(&mock, None);

    assert!(store.post(json!({"title": "dup"}), None).await.is_none());
    assert_eq!(store.status(), Status::Error);
    assert_eq!(
        store.snapshot().status.error,
        Some(ListError::Server("title already taken".into()))
    );
}

#[tokio::test]
async fn test_transport_and_parse_failures_are_errors() {
    let mock = Arc::new(MockTransport::new());
    mock.push_failure("connection refused");
    mock.push_response(Response::new(200, b"<html>".to_vec()));
    let store = store(&mock, Some(vec![json!({"id": 1})]));

    assert!(store.get(None, false).await.is_none());
    assert!(matches!(
        store.snapshot().status.error,
        Some(ListError::Transport(_))
    ));

    assert!(store.get(None, false).await.is_none());
    assert!(matches!(
        store.snapshot().status.error,
        Some(ListError::Decode(_))
    ));
    assert_eq!(*store.data(), vec![json!({"id": 1})]);
}

#[tokio::test]
async fn test_pagination_cursor() {
    let mock = Arc::new(MockTransport::new());
    mock.push_envelope(Envelope::with_data(vec![json!({"id": 41}), json!({"id": 42})]));
    mock.push_envelope(Envelope::with_data(vec![json!({"id": 43})]));
    mock.push_envelope(Envelope::with_data(Vec::new()));
    let store = store(&mock, None);

    store.get(None, false).await;
    assert_eq!(store.cursor(), Some(json!(42)));

    store.more(None).await;
    let request = mock.last_request().unwrap();
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.url, format!("{}?after=42", URL));
    assert!(request.body.is_none());
    assert_eq!(store.snapshot().status.previous_status(), Status::LoadingMore);

    store.more(Some("https://api.example.com/todos?done=false")).await;
    assert_eq!(
        mock.last_request().unwrap().url,
        "https://api.example.com/todos?done=false&after=43"
    );
    assert_eq!(store.data().len(), 3);
}

#[tokio::test]
async fn test_more_without_cursor_is_noop() {
    let mock = Arc::new(MockTransport::new());
    let store = store(&mock, None);

    assert!(store.more(None).await.is_none());
    assert_eq!(store.status(), Status::Uninitialized);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_request_shapes() {
    let mock = Arc::new(MockTransport::new());
    for _ in 0..3 {
        mock.push_envelope(Envelope::with_data(Vec::new()));
    }
    let store = store(&mock, None);

    store.get(None, false).await;
    store.post(json!([{"id": 1}, {"title": "new"}]), None).await;
    store.del(json!({"id": 1}), Some("/todos/bulk")).await;

    let requests = mock.requests();
    assert_eq!(requests[0].header("accept"), Some("application/json"));
    assert!(requests[0].header("content-type").is_none());

    assert_eq!(requests[1].method, Method::Post);
    assert_eq!(
        requests[1].json_body(),
        Some(json!([{"id": 1}, {"title": "new"}]))
    );

    assert_eq!(requests[2].method, Method::Delete);
    assert_eq!(requests[2].url, "/todos/bulk");
    assert_eq!(requests[2].json_body(), Some(json!([{"id": 1}])));
}

#[tokio::test]
async fn test_posting_records_subject_ids() {
    let mock = Arc::new(MockTransport::new());
    mock.push_envelope(Envelope::with_data(Vec::new()));
    let store = store(&mock, None);

    store
        .post(json!([{"id": 7}, {"title": "no id yet"}]), None)
        .await;

    // The Loaded record chains directly from the Posting record
    let snapshot = store.snapshot();
    let posting = &snapshot.status.history().last().unwrap().record;
    assert_eq!(posting.status, Status::Posting);
    assert_eq!(posting.subject_ids, vec![json!(7), Value::Null]);
}

#[tokio::test]
async fn test_stabilization() {
    let mock = Arc::new(MockTransport::new());
    mock.push_failure("timeout");
    let store = store(&mock, Some(vec![json!({"id": 1})]));

    // Loaded -> Getting -> Error
    store.get(None, false).await;
    assert_eq!(store.status(), Status::Error);

    store.to_stable();
    let snapshot = store.snapshot();
    assert_eq!(snapshot.status.status, Status::Loaded);
    assert!(snapshot.status.history().is_empty());
    assert_eq!(*snapshot.data, vec![json!({"id": 1})]);

    // Already stable: unchanged
    store.to_stable();
    assert_eq!(store.status(), Status::Loaded);
}

#[tokio::test]
async fn test_stabilization_without_stable_ancestor() {
    use postlist_core::{Extra, HistoryEntry, Snapshot, StatusRecord, WatchCell};

    // A chain that starts at Getting with no history
    let getting = Arc::new(StatusRecord::new(Status::Getting));
    let error = StatusRecord::chained(Status::Error, HistoryEntry::new(getting), None);
    let start = Snapshot {
        status: Arc::new(error),
        data: Arc::new(vec![json!({"id": 1})]),
        extra: Arc::new(Extra::new()),
    };

    let store = ListStore::builder(URL)
        .without_transport()
        .build_with(|_| WatchCell::new(start));

    store.to_stable();
    assert_eq!(store.status(), Status::Error);
    assert_eq!(*store.data(), vec![json!({"id": 1})]);
}

#[tokio::test]
async fn test_history_grows_one_per_commit() {
    let mock = Arc::new(MockTransport::new());
    mock.push_envelope(Envelope::with_data(vec![json!({"id": 1})]));
    mock.push_failure("offline");
    mock.push_envelope(Envelope::with_validation_errors(vec![json!({"field": "t"})]));
    mock.push_envelope(Envelope::with_data(vec![json!({"id": 2})]));
    let store = store(&mock, None);

    let mut previous = 0;
    store.get(None, false).await;
    store.get(None, false).await;
    store.post(json!({"t": ""}), None).await;
    store.more(None).await;

    let history = store.snapshot().status.history().to_vec();
    // Each operation commits an in-flight record and an outcome record
    assert_eq!(history.len(), 8);
    for entry in &history {
        let len = entry.record.history().len();
        assert!(len >= previous);
        previous = len;
    }

    let statuses: Vec<Status> = history.iter().map(|e| e.record.status).collect();
    assert_eq!(
        statuses,
        vec![
            Status::Uninitialized,
            Status::Getting,
            Status::Loaded,
            Status::Getting,
            Status::Error,
            Status::Posting,
            Status::ValidationError,
            Status::LoadingMore,
        ]
    );
}
