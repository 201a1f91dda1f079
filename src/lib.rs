//! # Service Errors
//!
//! Structured error classification and propagation for HTTP services.
//!
//! ## Design Philosophy
//!
//! 1. **One error value** carries a machine code, a semantic kind, and two
//!    messages: an internal one for operators and a user-safe one for clients
//! 2. **Classification is table-driven**: code → kind → HTTP status and log
//!    level never drift between call sites
//! 3. **Chains stay intact**: wrapping adds context without hiding the cause,
//!    and every chain algorithm works over any `std::error::Error`
//! 4. **Nothing sensitive leaves the process**: serialization drops the
//!    internal message, the cause and the stack, and redacts sensitive
//!    metadata
//! 5. **Unknown errors are default-deny**: foreign errors never leak their
//!    text to clients
//!
//! ## Quick Start
//!
//! ```rust
//! use service_errors::{AppError, Code, LogLevel, Result};
//!
//! fn load_user(id: u64) -> Result<String> {
//!     Err(AppError::new(Code::NotFound, format!("user row {id} missing"), ""))
//! }
//!
//! let err = load_user(7).unwrap_err();
//! assert_eq!(err.http_status(), 404);
//! assert_eq!(err.log_level(), LogLevel::Warn);
//! assert!(!err.is_retryable());
//!
//! // The user message defaults to the internal one when left empty.
//! assert_eq!(err.user_message(), "user row 7 missing");
//! ```
//!
//! ## Wrapping and Matching
//!
//! ```rust
//! use service_errors::{is, public_message, root_cause, sentinels, wrap};
//!
//! let wrapped = wrap(wrap(Some(&sentinels::NOT_FOUND), "load profile"), "GET /me");
//! let wrapped = wrapped.expect("wrapping a present error yields an error");
//!
//! assert!(is(&wrapped, &sentinels::NOT_FOUND));
//! assert!(!is(&wrapped, &sentinels::INTERNAL));
//! assert_eq!(root_cause(&wrapped).to_string(), "resource not found");
//! assert_eq!(public_message(Some(&wrapped)), "resource not found");
//! ```
//!
//! ## Wire Format
//!
//! ```rust
//! use service_errors::{opt, AppError, Code};
//!
//! let err = AppError::new_with(
//!     Code::Validation,
//!     "password rejected by policy v3",
//!     "invalid input",
//!     [opt::meta("password", "hunter2"), opt::meta("user_id", "u1")],
//! );
//! let json: serde_json::Value = serde_json::from_slice(&err.to_json()?)?;
//!
//! assert_eq!(json["code"], "VALIDATION");
//! assert_eq!(json["message"], "invalid input");
//! assert_eq!(json["metadata"]["password"], "[REDACTED]");
//! assert_eq!(json["metadata"]["user_id"], "u1");
//! assert!(!json.to_string().contains("policy v3"));
//! # Ok::<(), serde_json::Error>(())
//! ```
//!
//! ## Features
//!
//! - `trusted_debug`: include the internal message in `Debug` output and
//!   enable `InternalLog::format_for_trusted_debug` (debug builds only)

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::io;
use std::panic::Location;
use std::result;
use zeroize::Zeroize;

pub mod chain;
pub mod convenience;
pub mod logging;
pub mod options;
pub mod public;
pub mod redact;
pub mod response;
pub mod sentinels;
pub mod stack;
pub mod taxonomy;
pub mod variants;
mod wire;

pub use chain::*;
pub use logging::*;
pub use options::*;
pub use public::*;
pub use redact::*;
pub use response::*;
pub use stack::*;
pub use taxonomy::*;
pub use variants::*;

/// Type alias for Results using our error type.
pub type Result<T> = result::Result<T, AppError>;

/// Owned, type-erased error used for causes and chain inputs.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Structured context attached to an error. Ordered for stable output.
pub type Metadata = BTreeMap<String, Value>;

// ============================================================================
// Dynamic Error Views
// ============================================================================

/// Anything that can be viewed as `&(dyn Error + 'static)`.
///
/// Implemented for every sized error type and for the `dyn Error` object
/// types, so chain functions accept both `&MyError` and `&*boxed`.
pub trait AsDynError {
    /// View `self` as a trait object.
    fn as_dyn_error(&self) -> &(dyn Error + 'static);
}

impl<T: Error + 'static> AsDynError for T {
    #[inline]
    fn as_dyn_error(&self) -> &(dyn Error + 'static) {
        self
    }
}

impl AsDynError for dyn Error + 'static {
    #[inline]
    fn as_dyn_error(&self) -> &(dyn Error + 'static) {
        self
    }
}

impl AsDynError for dyn Error + Send + 'static {
    #[inline]
    fn as_dyn_error(&self) -> &(dyn Error + 'static) {
        self
    }
}

impl AsDynError for dyn Error + Send + Sync + 'static {
    #[inline]
    fn as_dyn_error(&self) -> &(dyn Error + 'static) {
        self
    }
}

// ============================================================================
// I/O Classification
// ============================================================================

#[inline]
const fn io_error_kind_label(kind: io::ErrorKind) -> &'static str {
    match kind {
        io::ErrorKind::NotFound => "NotFound",
        io::ErrorKind::PermissionDenied => "PermissionDenied",
        io::ErrorKind::ConnectionRefused => "ConnectionRefused",
        io::ErrorKind::ConnectionReset => "ConnectionReset",
        io::ErrorKind::HostUnreachable => "HostUnreachable",
        io::ErrorKind::NetworkUnreachable => "NetworkUnreachable",
        io::ErrorKind::ConnectionAborted => "ConnectionAborted",
        io::ErrorKind::NotConnected => "NotConnected",
        io::ErrorKind::AddrInUse => "AddrInUse",
        io::ErrorKind::AddrNotAvailable => "AddrNotAvailable",
        io::ErrorKind::BrokenPipe => "BrokenPipe",
        io::ErrorKind::AlreadyExists => "AlreadyExists",
        io::ErrorKind::WouldBlock => "WouldBlock",
        io::ErrorKind::InvalidInput => "InvalidInput",
        io::ErrorKind::InvalidData => "InvalidData",
        io::ErrorKind::TimedOut => "TimedOut",
        io::ErrorKind::WriteZero => "WriteZero",
        io::ErrorKind::Interrupted => "Interrupted",
        io::ErrorKind::Unsupported => "Unsupported",
        io::ErrorKind::UnexpectedEof => "UnexpectedEof",
        io::ErrorKind::OutOfMemory => "OutOfMemory",
        io::ErrorKind::Other => "Other",
        _ => "Unknown",
    }
}

/// Code and retry advice for an I/O failure.
const fn io_error_classification(kind: io::ErrorKind) -> (Code, bool) {
    match kind {
        io::ErrorKind::NotFound => (Code::NotFound, false),
        io::ErrorKind::PermissionDenied => (Code::PermissionDenied, false),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => (Code::Timeout, true),
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::HostUnreachable
        | io::ErrorKind::NetworkUnreachable
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::BrokenPipe => (Code::Network, true),
        io::ErrorKind::AlreadyExists => (Code::Conflict, false),
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => (Code::InvalidInput, false),
        io::ErrorKind::Interrupted => (Code::Internal, true),
        _ => (Code::Internal, false),
    }
}

// ============================================================================
// Application Error
// ============================================================================

/// The structured error value.
///
/// # Key Properties
///
/// - `kind` defaults from `code` and can be overridden at construction
/// - `user_message` is never empty when `internal_message` is not
/// - Read-only after construction; builders consume and return `self`
/// - Owned strings and metadata are zeroized on drop
/// - `Debug` redacts sensitive metadata; `Serialize` never emits the
///   internal message, the cause, or the stack
///
/// # Construction Paths
///
/// | Path | Stack | Timestamp | Location |
/// |------|-------|-----------|----------|
/// | [`AppError::new`] / [`AppError::new_with`] | per [`CaptureMode`] | now | caller |
/// | [`AppError::sentinel`] | none | none | none |
/// | deserialization | none | from the wire | none |
#[must_use = "errors should be handled or logged"]
pub struct AppError {
    code: Code,
    kind: Kind,
    internal_message: Cow<'static, str>,
    user_message: Cow<'static, str>,
    cause: Option<BoxError>,
    stack: Option<StackTrace>,
    trace_id: String,
    request_id: String,
    timestamp: Option<DateTime<Utc>>,
    retryable: bool,
    timeout: bool,
    metadata: Metadata,
    location: Option<&'static Location<'static>>,
}

impl AppError {
    /// Create a diagnostic error.
    ///
    /// The kind comes from [`kind_for_code`]. An empty `user_message` is
    /// replaced by `internal_message`. Stamps the current time, captures a
    /// stack trace and records the caller location. Never fails.
    #[track_caller]
    pub fn new(
        code: Code,
        internal_message: impl Into<Cow<'static, str>>,
        user_message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let internal_message = internal_message.into();
        let mut user_message = user_message.into();
        if user_message.is_empty() {
            user_message = internal_message.clone();
        }
        Self {
            kind: kind_for_code(&code),
            code,
            internal_message,
            user_message,
            cause: None,
            stack: StackTrace::capture(),
            trace_id: String::new(),
            request_id: String::new(),
            timestamp: Some(Utc::now()),
            retryable: false,
            timeout: false,
            metadata: Metadata::new(),
            location: Some(Location::caller()),
        }
    }

    /// Create a diagnostic error and apply `options` in order.
    #[track_caller]
    pub fn new_with(
        code: Code,
        internal_message: impl Into<Cow<'static, str>>,
        user_message: impl Into<Cow<'static, str>>,
        options: impl IntoIterator<Item = ErrorOption>,
    ) -> Self {
        let mut err = Self::new(code, internal_message, user_message);
        for option in options {
            err.apply(option);
        }
        err
    }

    /// Create a comparison target: no stack, no timestamp, no cause.
    ///
    /// `const` so sentinels can live in `static`s; see [`sentinels`].
    pub const fn sentinel(code: Code, message: &'static str, kind: Kind) -> Self {
        Self {
            code,
            kind,
            internal_message: Cow::Borrowed(message),
            user_message: Cow::Borrowed(message),
            cause: None,
            stack: None,
            trace_id: String::new(),
            request_id: String::new(),
            timestamp: None,
            retryable: false,
            timeout: false,
            metadata: BTreeMap::new(),
            location: None,
        }
    }

    /// Adopt a foreign error.
    ///
    /// An `AppError` passes through unchanged. Anything else becomes a new
    /// error whose internal message is the foreign error's text and whose
    /// cause is the foreign error itself.
    #[track_caller]
    pub fn from_error(
        err: impl Into<BoxError>,
        code: Code,
        user_message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let err: BoxError = err.into();
        match err.downcast::<AppError>() {
            Ok(app) => *app,
            Err(foreign) => {
                let internal = foreign.to_string();
                Self::new(code, internal, user_message).with_cause(foreign)
            }
        }
    }

    /// Classify an `io::Error` by its kind.
    ///
    /// Transient kinds (timeouts, connection failures, interrupts) are marked
    /// retryable. The kind label is kept in metadata under `io_kind`.
    #[track_caller]
    pub fn from_io(err: io::Error, user_message: impl Into<Cow<'static, str>>) -> Self {
        let (code, retryable) = io_error_classification(err.kind());
        let label = io_error_kind_label(err.kind());
        let internal = err.to_string();
        Self::new(code, internal, user_message)
            .with_retryable(retryable)
            .with_meta("io_kind", label)
            .with_cause(err)
    }

    /// Apply one option.
    pub fn apply(&mut self, option: ErrorOption) {
        match option {
            ErrorOption::Cause(cause) => self.cause = Some(cause),
            ErrorOption::Kind(kind) => self.kind = kind,
            ErrorOption::TraceId(id) => self.trace_id = id,
            ErrorOption::RequestId(id) => self.request_id = id,
            ErrorOption::Retryable(retryable) => self.retryable = retryable,
            ErrorOption::Timeout(timeout) => self.timeout = timeout,
            ErrorOption::Metadata(entries) => self.metadata.extend(entries),
            ErrorOption::Meta(key, value) => {
                self.metadata.insert(key, value);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------------

    /// Wrap `cause`.
    #[inline]
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Override the kind.
    #[inline]
    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach a trace id.
    #[inline]
    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = id.into();
        self
    }

    /// Attach a request id.
    #[inline]
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Set the retry advisory flag.
    #[inline]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Set the timeout flag.
    #[inline]
    pub fn with_timeout(mut self, timeout: bool) -> Self {
        self.timeout = timeout;
        self
    }

    /// Merge entries into the metadata; later keys overwrite earlier ones.
    pub fn with_metadata<K, V>(mut self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.metadata
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Insert one metadata entry.
    #[inline]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the construction timestamp.
    #[inline]
    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Apply one option as a builder step.
    #[inline]
    pub fn with_option(mut self, option: ErrorOption) -> Self {
        self.apply(option);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Machine-readable code.
    #[inline]
    pub const fn code(&self) -> &Code {
        &self.code
    }

    /// Semantic kind.
    #[inline]
    pub const fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Kind spelling, for metrics labels.
    #[inline]
    pub fn error_kind(&self) -> &str {
        self.kind.as_str()
    }

    /// Operator-facing message. May contain sensitive detail.
    #[inline]
    pub fn internal_message(&self) -> &str {
        &self.internal_message
    }

    /// Client-safe message.
    #[inline]
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Default text: the internal message, else the user message, else the
    /// code spelling.
    pub fn message(&self) -> &str {
        if !self.internal_message.is_empty() {
            &self.internal_message
        } else if !self.user_message.is_empty() {
            &self.user_message
        } else {
            self.code.as_str()
        }
    }

    /// The wrapped cause, if any.
    #[inline]
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Trace correlation id; empty when unset.
    #[inline]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Request correlation id; empty when unset.
    #[inline]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Construction time; `None` for sentinels.
    #[inline]
    pub const fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Attached metadata, unredacted.
    #[inline]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Source location of the constructor call.
    #[inline]
    pub const fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }

    /// Captured trace, if any.
    #[inline]
    pub const fn stack_trace(&self) -> Option<&StackTrace> {
        self.stack.as_ref()
    }

    /// Parsed frames of the captured trace; empty when nothing was captured.
    pub fn stack_frames(&self) -> Vec<Frame> {
        self.stack.as_ref().map(StackTrace::frames).unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------------

    /// HTTP status for this error's kind.
    #[inline]
    pub const fn http_status(&self) -> u16 {
        http_status_for_kind(&self.kind)
    }

    /// Whether a retry may succeed.
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// True when flagged as a timeout or classified as one.
    #[inline]
    pub const fn is_timeout(&self) -> bool {
        self.timeout || matches!(self.kind, Kind::Timeout)
    }

    /// Suggested log severity.
    #[inline]
    pub const fn log_level(&self) -> LogLevel {
        log_level_for_kind(&self.kind)
    }
}

fn zeroize_value(value: &mut Value) {
    match value {
        Value::String(s) => s.zeroize(),
        Value::Array(items) => items.iter_mut().for_each(zeroize_value),
        Value::Object(map) => {
            for (mut key, mut inner) in std::mem::take(map) {
                key.zeroize();
                zeroize_value(&mut inner);
            }
        }
        _ => {}
    }
}

impl Zeroize for AppError {
    fn zeroize(&mut self) {
        if let Cow::Owned(ref mut s) = self.internal_message {
            s.zeroize();
        }
        if let Cow::Owned(ref mut s) = self.user_message {
            s.zeroize();
        }
        self.trace_id.zeroize();
        self.request_id.zeroize();
        for (mut key, mut value) in std::mem::take(&mut self.metadata) {
            key.zeroize();
            zeroize_value(&mut value);
        }
    }
}

impl Drop for AppError {
    #[inline(never)]
    fn drop(&mut self) {
        // Cause first: it may hold its own sensitive context.
        self.cause = None;
        self.zeroize();
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AppError");
        s.field("code", &self.code).field("kind", &self.kind);

        #[cfg(all(feature = "trusted_debug", debug_assertions))]
        s.field("internal_message", &self.internal_message);
        #[cfg(not(all(feature = "trusted_debug", debug_assertions)))]
        s.field("internal_message", &"<REDACTED>");

        s.field("user_message", &self.user_message)
            .field("retryable", &self.retryable)
            .field("timeout", &self.timeout)
            .field("trace_id", &self.trace_id)
            .field("request_id", &self.request_id)
            .field("timestamp", &self.timestamp)
            .field("metadata", &Redacted(&self.metadata))
            .field("cause", &self.cause.as_ref().map(|_| "<PRESENT>"))
            .field("location", &self.location)
            .finish()
    }
}

impl fmt::Display for AppError {
    /// Writes [`AppError::message`]. This is internal text; clients get
    /// [`public_message`] instead.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<io::Error> for AppError {
    #[track_caller]
    fn from(err: io::Error) -> Self {
        AppError::from_io(err, "")
    }
}
