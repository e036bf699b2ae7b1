//! Completion endpoint integration
//!
//! The remote model is an opaque text-in/text-out service. Over time the
//! endpoint has answered either with a bare string or with an object carrying
//! a `response` field, so replies are decoded into [`ReplyPayload`] here and
//! nowhere else.

mod http;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use http::{EndpointConfig, HttpCompletionClient};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err)
        }
    }
}

/// A decoded reply body.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    /// The body was a JSON string or plain text.
    Text(String),
    /// The body was an object with a string `response` field.
    Object { response: String },
    /// Anything else the endpoint sent back.
    Unrecognized(Value),
}

impl ReplyPayload {
    /// Decode a raw response body.
    pub fn from_body(body: &str) -> Self {
        if body.trim().is_empty() {
            return ReplyPayload::Unrecognized(Value::Null);
        }

        match serde_json::from_str::<Value>(body) {
            Ok(Value::String(text)) => ReplyPayload::Text(text),
            Ok(Value::Object(map)) => match map.get("response") {
                Some(Value::String(response)) => ReplyPayload::Object {
                    response: response.clone(),
                },
                _ => ReplyPayload::Unrecognized(Value::Object(map)),
            },
            Ok(other) => ReplyPayload::Unrecognized(other),
            // Not JSON at all: the endpoint answered with plain text
            Err(_) => ReplyPayload::Text(body.to_string()),
        }
    }

    /// The reply text, if the payload has a usable one.
    pub fn into_reply(self) -> Option<String> {
        match self {
            ReplyPayload::Text(text) | ReplyPayload::Object { response: text } => {
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
            ReplyPayload::Unrecognized(_) => None,
        }
    }
}

/// One-shot request/response access to a completion endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a built prompt and return the decoded reply
    async fn complete(&self, prompt: &str) -> Result<ReplyPayload, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_json_string() {
        let payload = ReplyPayload::from_body(r#""ok""#);
        assert_eq!(payload, ReplyPayload::Text("ok".into()));
        assert_eq!(payload.into_reply(), Some("ok".to_string()));
    }

    #[test]
    fn test_plain_text_body() {
        let payload = ReplyPayload::from_body("hola, ¿qué tal?");
        assert_eq!(payload.into_reply(), Some("hola, ¿qué tal?".to_string()));
    }

    #[test]
    fn test_response_object() {
        let payload = ReplyPayload::from_body(r#"{"response":"hola!","model":"x"}"#);
        assert_eq!(
            payload,
            ReplyPayload::Object {
                response: "hola!".into()
            }
        );
        assert_eq!(payload.into_reply(), Some("hola!".to_string()));
    }

    #[test]
    fn test_bare_string_matches_object_reply() {
        let bare = ReplyPayload::from_body(r#""ok""#).into_reply();
        let wrapped = ReplyPayload::from_body(r#"{"response":"ok"}"#).into_reply();
        assert_eq!(bare, wrapped);
    }

    #[test]
    fn test_unrecognized_shapes() {
        let cases = [
            ("", Value::Null),
            ("null", Value::Null),
            ("42", json!(42)),
            (r#"["a"]"#, json!(["a"])),
            (r#"{"answer":"x"}"#, json!({"answer": "x"})),
            (r#"{"response":7}"#, json!({"response": 7})),
        ];

        for (body, expected) in cases {
            let payload = ReplyPayload::from_body(body);
            assert_eq!(payload, ReplyPayload::Unrecognized(expected), "body: {body:?}");
            assert!(payload.into_reply().is_none());
        }
    }

    #[test]
    fn test_empty_reply_is_unusable() {
        assert!(ReplyPayload::from_body(r#""""#).into_reply().is_none());
        assert!(ReplyPayload::from_body(r#"{"response":""}"#)
            .into_reply()
            .is_none());
    }
}
