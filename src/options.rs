//! Construction options for [`AppError`](crate::AppError).
//!
//! Options are applied in the order given. Scalar fields take the last value
//! written; metadata merges key-wise with later entries overwriting earlier
//! ones. The consuming `with_*` builders on `AppError` follow the same rules.
//!
//! ```rust
//! use service_errors::{opt, AppError, Code, Kind};
//!
//! let err = AppError::new_with(
//!     Code::Internal,
//!     "upstream returned 502",
//!     "service unavailable",
//!     [
//!         opt::kind(Kind::Network),
//!         opt::retryable(true),
//!         opt::meta("upstream", "billing"),
//!         opt::request_id("req-7"),
//!     ],
//! );
//! assert_eq!(err.kind(), &Kind::Network);
//! assert!(err.is_retryable());
//! assert_eq!(err.request_id(), "req-7");
//! ```

use crate::{BoxError, Kind, Metadata};
use serde_json::Value;

/// One deferred modification applied during construction.
#[derive(Debug)]
pub enum ErrorOption {
    /// Set the wrapped cause.
    Cause(BoxError),
    /// Override the kind derived from the code.
    Kind(Kind),
    /// Set the trace correlation id.
    TraceId(String),
    /// Set the request correlation id.
    RequestId(String),
    /// Set the retry advisory flag.
    Retryable(bool),
    /// Set the timeout flag.
    Timeout(bool),
    /// Merge a map into the metadata.
    Metadata(Metadata),
    /// Insert a single metadata entry.
    Meta(String, Value),
}

/// Constructors for [`ErrorOption`], one per option.
pub mod opt {
    use super::ErrorOption;
    use crate::{BoxError, Kind, Metadata};
    use serde_json::Value;

    /// Wrap `cause`.
    #[inline]
    pub fn cause(cause: impl Into<BoxError>) -> ErrorOption {
        ErrorOption::Cause(cause.into())
    }

    /// Override the kind.
    #[inline]
    pub fn kind(kind: Kind) -> ErrorOption {
        ErrorOption::Kind(kind)
    }

    /// Attach a trace id.
    #[inline]
    pub fn trace_id(id: impl Into<String>) -> ErrorOption {
        ErrorOption::TraceId(id.into())
    }

    /// Attach a request id.
    #[inline]
    pub fn request_id(id: impl Into<String>) -> ErrorOption {
        ErrorOption::RequestId(id.into())
    }

    /// Mark retryable or not.
    #[inline]
    pub fn retryable(retryable: bool) -> ErrorOption {
        ErrorOption::Retryable(retryable)
    }

    /// Mark as a timeout or not.
    #[inline]
    pub fn timeout(timeout: bool) -> ErrorOption {
        ErrorOption::Timeout(timeout)
    }

    /// Merge `entries` into the metadata.
    pub fn metadata<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> ErrorOption
    where
        K: Into<String>,
        V: Into<Value>,
    {
        ErrorOption::Metadata(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect::<Metadata>(),
        )
    }

    /// Insert one metadata entry.
    #[inline]
    pub fn meta(key: impl Into<String>, value: impl Into<Value>) -> ErrorOption {
        ErrorOption::Meta(key.into(), value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppError, Code};
    use serde_json::json;
    use std::io;

    #[test]
    fn all_options_apply() {
        let err = AppError::new_with(
            Code::Internal,
            "internal",
            "user",
            [
                opt::cause(io::Error::other("cause")),
                opt::kind(Kind::Network),
                opt::trace_id("trace-1"),
                opt::request_id("req-1"),
                opt::retryable(true),
                opt::timeout(true),
                opt::metadata([("key", "val")]),
            ],
        );

        assert_eq!(err.cause().map(|c| c.to_string()).as_deref(), Some("cause"));
        assert_eq!(err.kind(), &Kind::Network);
        assert_eq!(err.trace_id(), "trace-1");
        assert_eq!(err.request_id(), "req-1");
        assert!(err.is_retryable());
        assert!(err.is_timeout());
        assert_eq!(err.metadata()["key"], json!("val"));
    }

    #[test]
    fn later_scalars_win() {
        let err = AppError::new_with(
            Code::Internal,
            "x",
            "",
            [
                opt::retryable(true),
                opt::kind(Kind::Conflict),
                opt::retryable(false),
                opt::trace_id("first"),
                opt::trace_id("second"),
            ],
        );
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), &Kind::Conflict);
        assert_eq!(err.trace_id(), "second");
    }

    #[test]
    fn metadata_merges_key_wise() {
        let err = AppError::new_with(
            Code::Internal,
            "x",
            "",
            [
                opt::metadata([("a", json!(1)), ("b", json!(2))]),
                opt::meta("b", 20),
                opt::metadata([("c", 3)]),
            ],
        );
        let meta = err.metadata();
        assert_eq!(meta.len(), 3);
        assert_eq!(meta["a"], json!(1));
        assert_eq!(meta["b"], json!(20));
        assert_eq!(meta["c"], json!(3));
    }
}
