//! JSON wire shape for [`AppError`].
//!
//! ```text
//! {
//!   "code": "NOT_FOUND",
//!   "kind": "not_found",
//!   "message": "<user message>",
//!   "trace_id": "...",                      // only when non-empty
//!   "request_id": "...",                    // only when non-empty
//!   "timestamp": "2025-01-01T00:00:00Z",    // only when set
//!   "metadata": { "password": "[REDACTED]" } // only when non-empty
//! }
//! ```
//!
//! Reading is lenient. Only string-typed fields are taken; anything missing
//! or malformed is left at its default rather than failing the whole
//! document.

use crate::{AppError, Code, Kind, Metadata, Redacted, kind_for_code};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;

#[derive(Serialize)]
struct WireOut<'a> {
    code: &'a Code,
    kind: &'a Kind,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Redacted<'a>>,
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// RFC3339 at second precision, `Z` for UTC.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

impl Serialize for AppError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireOut {
            code: &self.code,
            kind: &self.kind,
            message: &self.user_message,
            trace_id: non_empty(&self.trace_id),
            request_id: non_empty(&self.request_id),
            timestamp: self.timestamp.as_ref().map(format_timestamp),
            metadata: (!self.metadata.is_empty()).then_some(Redacted(&self.metadata)),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AppError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(AppError::from_wire)
    }
}

impl AppError {
    /// Rebuild an error from decoded wire fields.
    ///
    /// `message` fills both messages. A missing `kind` is derived from the
    /// code; a missing `code` becomes an empty custom code. The cause and
    /// stack are never reconstructed.
    fn from_wire(mut fields: Map<String, Value>) -> Self {
        let code = take_string(&mut fields, "code")
            .map(Code::from)
            .unwrap_or(Code::Custom(Cow::Borrowed("")));
        let kind = take_string(&mut fields, "kind")
            .map(Kind::from)
            .unwrap_or_else(|| kind_for_code(&code));
        let message = take_string(&mut fields, "message").unwrap_or_default();
        let metadata = match fields.remove("metadata") {
            Some(Value::Object(map)) => map.into_iter().collect::<Metadata>(),
            _ => Metadata::new(),
        };

        Self {
            code,
            kind,
            internal_message: Cow::Owned(message.clone()),
            user_message: Cow::Owned(message),
            cause: None,
            stack: None,
            trace_id: take_string(&mut fields, "trace_id").unwrap_or_default(),
            request_id: take_string(&mut fields, "request_id").unwrap_or_default(),
            timestamp: take_string(&mut fields, "timestamp")
                .as_deref()
                .and_then(parse_timestamp),
            retryable: false,
            timeout: false,
            metadata,
            location: None,
        }
    }

    /// Serialize to the JSON wire shape.
    ///
    /// Never includes the internal message, the cause, or the stack.
    /// Sensitive metadata values are replaced with
    /// [`REDACTION_MARKER`](crate::REDACTION_MARKER).
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Partial inverse of [`AppError::to_json`].
    ///
    /// # Errors
    ///
    /// Fails only when `bytes` is not a JSON object.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
