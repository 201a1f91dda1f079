//! Response envelope for HTTP handlers.
//!
//! ```text
//! { "status": 404, "error": true, "message": "resource not found" }
//! { "status": 200, "data": {...}, "error": false }
//! ```
//!
//! The envelope is transport-agnostic: it produces the body bytes and the
//! status, and the caller's HTTP stack writes them. Error envelopes carry
//! only the [public message](crate::public_message), never internal text.

use crate::{AppError, AsDynError, Code, http_status_of, public_message};
use serde::{Deserialize, Serialize};

/// Media type of an encoded envelope.
pub const CONTENT_TYPE: &str = "application/json";

/// Body of every JSON response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// HTTP status, repeated in the body for clients that lose it.
    pub status: u16,
    /// Payload; omitted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Whether this body describes a failure.
    pub error: bool,
    /// Client-safe message; omitted when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl<T> Envelope<T> {
    fn with_status(status: u16, data: T) -> Self {
        Self {
            status,
            data: Some(data),
            error: false,
            message: String::new(),
        }
    }

    /// `200` with a payload.
    pub fn ok(data: T) -> Self {
        Self::with_status(200, data)
    }

    /// `201` with a payload.
    pub fn created(data: T) -> Self {
        Self::with_status(201, data)
    }

    /// `500` with a payload, not flagged as an error.
    ///
    /// For handlers that report partial failure details in `data` rather than
    /// through an error value.
    pub fn fail(data: T) -> Self {
        Self::with_status(500, data)
    }
}

impl Envelope<()> {
    /// Error body for any error chain.
    ///
    /// Status comes from the first classified link (500 otherwise) and the
    /// message from [`public_message`].
    ///
    /// ```rust
    /// use service_errors::{wrap, sentinels, Envelope};
    ///
    /// let err = wrap(Some(&sentinels::NOT_FOUND), "GET /orders/9").unwrap();
    /// let body = Envelope::from_error(&err);
    /// assert_eq!(body.status, 404);
    /// assert!(body.error);
    /// assert_eq!(body.message, "resource not found");
    /// ```
    pub fn from_error<E: AsDynError + ?Sized>(err: &E) -> Self {
        Self {
            status: http_status_of(err),
            data: None,
            error: true,
            message: public_message(Some(err)).to_owned(),
        }
    }
}

impl<T: Serialize> Envelope<T> {
    /// Encode the body.
    ///
    /// # Errors
    ///
    /// An `INTERNAL` error wrapping the serializer failure when `data` cannot
    /// be encoded.
    pub fn to_json(&self) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| AppError::from_error(e, Code::Internal, "response encoding failed"))
    }
}
