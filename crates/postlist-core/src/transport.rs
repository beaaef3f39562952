//! Transport abstraction
//!
//! The store never talks to the network directly. It hands a [`Request`] to
//! a [`Transport`] and interprets the [`Response`]. [`HttpTransport`] is the
//! reqwest-backed implementation; [`MockTransport`] replays canned responses
//! for tests.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::envelope::Envelope;
use crate::error::TransportError;

const ACCEPT: &str = "accept";
const CONTENT_TYPE: &str = "content-type";
const APPLICATION_JSON: &str = "application/json";

/// HTTP verb used by list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// A GET accepting JSON
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: vec![(ACCEPT.into(), APPLICATION_JSON.into())],
            body: None,
        }
    }

    /// A request with a JSON body, accepting JSON
    pub fn json(method: Method, url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: vec![
                (CONTENT_TYPE.into(), APPLICATION_JSON.into()),
                (ACCEPT.into(), APPLICATION_JSON.into()),
            ],
            body: Some(body),
        }
    }

    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body parsed as JSON
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

/// A response: status code and body bytes
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A 200 response carrying an envelope
    pub fn envelope(envelope: &Envelope) -> Self {
        Self::new(200, envelope.to_body())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues requests on behalf of a list store
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

/// reqwest-backed transport
///
/// Keeps a cookie store so credentials set by the server are sent back on
/// later requests. Bodies of non-success responses are not read.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .user_agent(concat!("postlist/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Use an already configured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| TransportError::Network {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Response::new(status.as_u16(), Vec::new()));
        }

        let body = response.bytes().await.map_err(|e| TransportError::Body {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

        Ok(Response::new(status.as_u16(), body.to_vec()))
    }
}

/// A transport that replays queued responses in order and records requests
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Response, String>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response
    pub fn push_response(&self, response: Response) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queue a 200 response carrying `envelope`
    pub fn push_envelope(&self, envelope: Envelope) {
        self.push_response(Response::envelope(&envelope));
    }

    /// Queue a network failure
    pub fn push_failure(&self, message: impl Into<String>) {
        self.responses.lock().push_back(Err(message.into()));
    }

    /// All requests sent so far
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.requests.lock().last().cloned()
    }

    /// Number of queued responses not yet consumed
    pub fn pending(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let url = request.url.clone();
        self.requests.lock().push(request);

        match self.responses.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::Network { url, message }),
            None => Err(TransportError::Network {
                url,
                message: "no mock response queued".into(),
            }),
        }
    }
}
