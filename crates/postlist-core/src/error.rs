//! Error types
//!
//! `ListError` is never returned from a store operation. It is the payload a
//! failed operation leaves on the committed status record, so it is `Clone`
//! and carries only owned strings.

use thiserror::Error;

/// The error carried by an `Error` or `ValidationError` status record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// The server answered with a non-success HTTP status
    #[error("error requesting data")]
    RequestFailed { status: u16 },

    /// The request could not be issued or its body could not be read
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not a valid response envelope
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The server reported an error message (`em`)
    #[error("{0}")]
    Server(String),

    /// A well-formed response without a data field
    #[error("missing data")]
    MissingData,

    /// The server reported validation failures (`ev`)
    #[error("validation failed")]
    Validation,

    /// No transport is attached to the store
    #[error("no transport available")]
    Unavailable,
}

impl ListError {
    /// Check if the error came from the server's own response body,
    /// as opposed to the request never completing
    pub fn is_server_reported(&self) -> bool {
        matches!(
            self,
            ListError::Server(_) | ListError::MissingData | ListError::Validation
        )
    }
}

/// Errors a [`Transport`](crate::transport::Transport) implementation reports
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or no response arrived
    #[error("request to '{url}' failed: {message}")]
    Network { url: String, message: String },

    /// The response body could not be read
    #[error("failed to read response body from '{url}': {message}")]
    Body { url: String, message: String },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<TransportError> for ListError {
    fn from(err: TransportError) -> Self {
        ListError::Transport(err.to_string())
    }
}
