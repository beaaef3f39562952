//! Response envelope
//!
//! Every list endpoint answers with a JSON object using short keys:
//!
//! | key  | meaning                                          |
//! |------|--------------------------------------------------|
//! | `d`  | records to merge; required unless `em`/`ev` set  |
//! | `em` | error message                                    |
//! | `ev` | structured validation errors                     |
//! | `rm` | ids to remove locally                            |
//! | `x`  | extra payload, replaces the store's extra        |
//! | `s`  | session fragment for the session delegate        |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ListError;
use crate::snapshot::{Extra, Record};

/// A decoded response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub em: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ev: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rm: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<Extra>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<Value>,
}

/// What a response means for the store
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Data to reconcile
    Data {
        data: Vec<Record>,
        remove: Vec<Value>,
        extra: Extra,
        session: Option<Value>,
    },
    /// The server rejected the request field by field
    Invalid(Vec<Value>),
    /// The server reported an error or omitted the data
    Failed(ListError),
}

impl Envelope {
    /// Parse a response body
    pub fn decode(body: &[u8]) -> Result<Self, ListError> {
        serde_json::from_slice(body).map_err(|e| ListError::Decode(e.to_string()))
    }

    /// An envelope carrying records
    pub fn with_data(data: Vec<Record>) -> Self {
        Self {
            d: Some(data),
            ..Self::default()
        }
    }

    /// An envelope carrying only an error message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            em: Some(message.into()),
            ..Self::default()
        }
    }

    /// An envelope carrying only validation errors
    pub fn with_validation_errors(errors: Vec<Value>) -> Self {
        Self {
            ev: Some(errors),
            ..Self::default()
        }
    }

    pub fn removing(mut self, ids: Vec<Value>) -> Self {
        self.rm = Some(ids);
        self
    }

    pub fn extra(mut self, extra: Extra) -> Self {
        self.x = Some(extra);
        self
    }

    pub fn session(mut self, session: Value) -> Self {
        self.s = Some(session);
        self
    }

    /// Serialize to a response body
    pub fn to_body(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|_| b"{}".to_vec())
    }

    /// Interpret the envelope
    ///
    /// Validation errors take precedence over an error message, which takes
    /// precedence over a missing data field. Empty `ev` and `em` are ignored.
    pub fn into_outcome(self) -> Outcome {
        if let Some(errors) = self.ev.filter(|ev| !ev.is_empty()) {
            return Outcome::Invalid(errors);
        }

        if let Some(message) = self.em.filter(|em| !em.is_empty()) {
            return Outcome::Failed(ListError::Server(message));
        }

        match self.d {
            Some(data) => Outcome::Data {
                data,
                remove: self.rm.unwrap_or_default(),
                extra: self.x.unwrap_or_default(),
                session: self.s,
            },
            None => Outcome::Failed(ListError::MissingData),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(body: &str) -> Outcome {
        Envelope::decode(body.as_bytes()).unwrap().into_outcome()
    }

    #[test]
    fn test_data_outcome() {
        let result = outcome(r#"{"d":[{"id":1}],"rm":[2],"x":{"total":10},"s":{"user":"ann"}}"#);

        match result {
            Outcome::Data {
                data,
                remove,
                extra,
                session,
            } => {
                assert_eq!(data, vec![json!({"id": 1})]);
                assert_eq!(remove, vec![json!(2)]);
                assert_eq!(extra.get("total"), Some(&json!(10)));
                assert_eq!(session, Some(json!({"user": "ann"})));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        match outcome(r#"{"d":[]}"#) {
            Outcome::Data {
                remove,
                extra,
                session,
                ..
            } => {
                assert!(remove.is_empty());
                assert!(extra.is_empty());
                assert!(session.is_none());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_validation_takes_precedence() {
        let result = outcome(r#"{"ev":[{"field":"x"}],"em":"nope","d":[]}"#);
        assert_eq!(result, Outcome::Invalid(vec![json!({"field": "x"})]));
    }

    #[test]
    fn test_message_error() {
        let result = outcome(r#"{"em":"database unavailable","d":[]}"#);
        assert_eq!(
            result,
            Outcome::Failed(ListError::Server("database unavailable".into()))
        );
    }

    #[test]
    fn test_empty_error_fields_ignored() {
        let result = outcome(r#"{"ev":[],"em":"","d":[{"id":1}]}"#);
        assert!(matches!(result, Outcome::Data { .. }));
    }

    #[test]
    fn test_missing_data() {
        assert_eq!(outcome("{}"), Outcome::Failed(ListError::MissingData));
    }

    #[test]
    fn test_decode_failure() {
        let err = Envelope::decode(b"<html>").unwrap_err();
        assert!(matches!(err, ListError::Decode(_)));
    }

    #[test]
    fn test_body_skips_absent_fields() {
        let body = Envelope::with_data(vec![json!({"id": 1})]).to_body();
        assert_eq!(String::from_utf8(body).unwrap(), r#"{"d":[{"id":1}]}"#);
    }
}
