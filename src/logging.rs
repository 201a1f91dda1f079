//! Structured log entries for operators.
//!
//! # Security Properties
//!
//! - [`InternalLog`] borrows from the error and cannot outlive it
//! - The internal message is included (this is the operator view) but
//!   sensitive metadata values are still redacted
//! - Every free-text field is truncated to [`MAX_FIELD_OUTPUT_LEN`] bytes
//!   so a hostile message cannot blow up log storage
//!
//! Entries are emitted through `tracing` at the error's
//! [`log_level`](crate::AppError::log_level), so alerting keyed on severity
//! sees the same classification the HTTP layer does.

use crate::{AppError, AsDynError, Code, Kind, LogLevel, Metadata, Redacted, find_app_error};
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::panic::Location;
use tracing::field;

/// Maximum length of any free-text field in formatted output.
pub const MAX_FIELD_OUTPUT_LEN: usize = 1024;

/// Appended to truncated fields.
pub const TRUNCATION_INDICATOR: &str = "...[TRUNCATED]";

/// Operator-facing view of an [`AppError`].
///
/// ```rust
/// use service_errors::{AppError, Code};
///
/// let err = AppError::new(Code::Conflict, "version 3 != 4 on order 17", "")
///     .with_request_id("req-9")
///     .with_meta("api_key", "sk-live-123");
///
/// let mut line = String::new();
/// err.internal_log().write_to(&mut line)?;
/// assert!(line.starts_with("[CONFLICT/conflict] error"));
/// assert!(line.contains("version 3 != 4 on order 17"));
/// assert!(line.contains("request_id='req-9'"));
/// assert!(!line.contains("sk-live-123"));
/// # Ok::<(), std::fmt::Error>(())
/// ```
pub struct InternalLog<'a> {
    code: &'a Code,
    kind: &'a Kind,
    level: LogLevel,
    internal_message: &'a str,
    user_message: &'a str,
    trace_id: &'a str,
    request_id: &'a str,
    metadata: &'a Metadata,
    retryable: bool,
    timeout: bool,
    cause: Option<&'a (dyn Error + 'static)>,
    context: Option<&'a (dyn Error + 'static)>,
    location: Option<&'static Location<'static>>,
}

impl<'a> InternalLog<'a> {
    fn new(err: &'a AppError) -> Self {
        Self {
            code: &err.code,
            kind: &err.kind,
            level: err.log_level(),
            internal_message: &err.internal_message,
            user_message: &err.user_message,
            trace_id: &err.trace_id,
            request_id: &err.request_id,
            metadata: &err.metadata,
            retryable: err.retryable,
            timeout: err.is_timeout(),
            cause: err.source(),
            context: None,
            location: err.location,
        }
    }

    /// Record the outermost error when the classified link sits deeper in
    /// the chain, so wrap context is not lost.
    fn with_context(mut self, outer: &'a (dyn Error + 'static)) -> Self {
        self.context = Some(outer);
        self
    }

    /// Format for human-readable logs in trusted debug contexts.
    ///
    /// Unlike [`write_to`](Self::write_to), metadata values are written
    /// unredacted. Only available with BOTH the `trusted_debug` feature and
    /// debug assertions enabled.
    #[cfg(all(feature = "trusted_debug", debug_assertions))]
    pub fn format_for_trusted_debug(&self) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_head(&mut output);
        for (key, value) in self.metadata {
            let text = match value {
                serde_json::Value::String(s) => Cow::Borrowed(s.as_str()),
                other => Cow::Owned(other.to_string()),
            };
            output.push_str(&format!(" {key}='{}'", truncate_with_indicator(&text)));
        }
        output
    }

    /// Write the entry as one bounded line without materializing the whole
    /// line first.
    ///
    /// Layout: `[CODE/kind] level [RETRYABLE] [TIMEOUT] message='..'` then
    /// any non-empty user message, ids, cause, location and metadata.
    pub fn write_to(&self, f: &mut impl fmt::Write) -> fmt::Result {
        self.write_head(f)?;
        for (key, value) in Redacted(self.metadata).iter() {
            let text = value.to_string();
            write!(f, " {}='{}'", key, truncate_with_indicator(&text))?;
        }
        Ok(())
    }

    fn write_head(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.code, self.kind, self.level.as_str())?;
        if self.retryable {
            f.write_str(" [RETRYABLE]")?;
        }
        if self.timeout {
            f.write_str(" [TIMEOUT]")?;
        }
        write!(
            f,
            " message='{}'",
            truncate_with_indicator(self.internal_message)
        )?;
        if self.user_message != self.internal_message {
            write!(f, " user='{}'", truncate_with_indicator(self.user_message))?;
        }
        if !self.trace_id.is_empty() {
            write!(f, " trace_id='{}'", truncate_with_indicator(self.trace_id))?;
        }
        if !self.request_id.is_empty() {
            write!(f, " request_id='{}'", truncate_with_indicator(self.request_id))?;
        }
        if let Some(context) = self.context {
            write!(f, " context='{}'", truncate_with_indicator(&context.to_string()))?;
        }
        if let Some(cause) = self.cause {
            write!(f, " cause='{}'", truncate_with_indicator(&cause.to_string()))?;
        }
        if let Some(location) = self.location {
            write!(f, " at={}:{}", location.file(), location.line())?;
        }
        Ok(())
    }

    /// Emit the entry as a `tracing` event at its level.
    pub fn emit(&self) {
        let log = self;
        let metadata = Redacted(self.metadata);
        let message = truncate_with_indicator(self.internal_message);
        let cause = self.cause.map(|c| c.to_string());
        let context = self.context.map(|c| c.to_string());
        let cause = cause.as_deref().map(truncate_with_indicator);
        let context = context.as_deref().map(truncate_with_indicator);

        macro_rules! emit_at {
            ($event:ident) => {
                tracing::$event!(
                    code = %log.code,
                    kind = %log.kind,
                    retryable = log.retryable,
                    timeout = log.timeout,
                    user_message = log.user_message,
                    trace_id = log.trace_id,
                    request_id = log.request_id,
                    metadata = ?metadata,
                    cause = cause.as_deref().map(field::display),
                    context = context.as_deref().map(field::display),
                    "{}",
                    message
                )
            };
        }

        match log.level {
            LogLevel::Debug => emit_at!(debug),
            LogLevel::Info => emit_at!(info),
            LogLevel::Warn => emit_at!(warn),
            LogLevel::Error => emit_at!(error),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Error code.
    #[inline]
    pub const fn code(&self) -> &Code {
        self.code
    }

    /// Error kind.
    #[inline]
    pub const fn kind(&self) -> &Kind {
        self.kind
    }

    /// Severity the entry is emitted at.
    #[inline]
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    /// Untruncated internal message.
    #[inline]
    pub const fn internal_message(&self) -> &str {
        self.internal_message
    }

    /// Metadata with sensitive values redacted.
    #[inline]
    pub const fn metadata(&self) -> Redacted<'a> {
        Redacted(self.metadata)
    }

    /// Retry advisory.
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl fmt::Debug for InternalLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalLog")
            .field("code", self.code)
            .field("kind", self.kind)
            .field("level", &self.level)
            .field("metadata", &Redacted(self.metadata))
            .finish_non_exhaustive()
    }
}

impl AppError {
    /// Borrow an operator-facing view of this error.
    #[inline]
    pub fn internal_log(&self) -> InternalLog<'_> {
        InternalLog::new(self)
    }

    /// Run `f` against the operator view; the view cannot escape.
    pub fn with_internal_log<R>(&self, f: impl FnOnce(&InternalLog<'_>) -> R) -> R {
        f(&self.internal_log())
    }

    /// Emit this error through `tracing` at its log level.
    pub fn log(&self) {
        self.internal_log().emit();
    }
}

/// Log any error.
///
/// The first classified link decides level and fields; the outer error's
/// text is attached as `context` when it differs. Chains with no classified
/// link are logged at error level.
pub fn log_error<E: AsDynError + ?Sized>(err: &E) {
    let outer = err.as_dyn_error();
    match find_app_error(outer) {
        Some(app) => {
            let log = app.internal_log();
            if outer.to_string() == app.message() {
                log.emit();
            } else {
                log.with_context(outer).emit();
            }
        }
        None => {
            let text = outer.to_string();
            tracing::error!(
                code = %Code::Internal,
                kind = %Kind::Other,
                "{}",
                truncate_with_indicator(&text)
            );
        }
    }
}

/// Truncate a field to [`MAX_FIELD_OUTPUT_LEN`] bytes, ending with
/// [`TRUNCATION_INDICATOR`] when anything was cut.
///
/// Borrows when no truncation is needed and always cuts on a character
/// boundary.
pub fn truncate_with_indicator(s: &str) -> Cow<'_, str> {
    if s.len() <= MAX_FIELD_OUTPUT_LEN {
        return Cow::Borrowed(s);
    }

    let max_content_len = MAX_FIELD_OUTPUT_LEN.saturating_sub(TRUNCATION_INDICATOR.len());
    let mut idx = max_content_len;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    if idx == 0 {
        return Cow::Borrowed(TRUNCATION_INDICATOR);
    }

    let mut result = String::with_capacity(idx + TRUNCATION_INDICATOR.len());
    result.push_str(&s[..idx]);
    result.push_str(TRUNCATION_INDICATOR);
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxError, sentinels, wrap};
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn truncate_ascii() {
        let s = "a".repeat(MAX_FIELD_OUTPUT_LEN + 10);
        let truncated = truncate_with_indicator(&s);
        assert!(truncated.len() <= MAX_FIELD_OUTPUT_LEN);
        assert!(truncated.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn no_truncate_when_under_limit() {
        let truncated = truncate_with_indicator("short string");
        assert!(matches!(truncated, Cow::Borrowed(_)));
        assert_eq!(truncated, "short string");
    }

    #[test]
    fn truncate_utf8_boundary() {
        // Two bytes per char.
        let s = "й".repeat(MAX_FIELD_OUTPUT_LEN);
        let truncated = truncate_with_indicator(&s);
        assert!(truncated.len() <= MAX_FIELD_OUTPUT_LEN);
        assert!(truncated.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn truncate_emoji() {
        let s = "🔥".repeat(MAX_FIELD_OUTPUT_LEN);
        let truncated = truncate_with_indicator(&s);
        assert!(std::str::from_utf8(truncated.as_bytes()).is_ok());
        assert!(truncated.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn exactly_at_limit() {
        let s = "a".repeat(MAX_FIELD_OUTPUT_LEN);
        let truncated = truncate_with_indicator(&s);
        assert!(matches!(truncated, Cow::Borrowed(_)));
        assert_eq!(truncated.len(), MAX_FIELD_OUTPUT_LEN);
    }

    #[test]
    fn one_over_limit() {
        let s = "a".repeat(MAX_FIELD_OUTPUT_LEN + 1);
        let truncated = truncate_with_indicator(&s);
        assert!(matches!(truncated, Cow::Owned(_)));
        assert!(truncated.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn write_to_includes_operator_fields() {
        let err = AppError::new(Code::Network, "dial 10.0.0.7:443 refused", "upstream unavailable")
            .with_retryable(true)
            .with_trace_id("t-1")
            .with_cause(io::Error::other("ECONNREFUSED"));

        let mut line = String::new();
        err.internal_log().write_to(&mut line).unwrap();
        assert!(line.starts_with("[NETWORK/network] warn [RETRYABLE]"));
        assert!(line.contains("message='dial 10.0.0.7:443 refused'"));
        assert!(line.contains("user='upstream unavailable'"));
        assert!(line.contains("trace_id='t-1'"));
        assert!(line.contains("cause='ECONNREFUSED'"));
        assert!(line.contains(&format!("at={}", file!())));
        assert!(!line.contains("request_id"));
    }

    #[test]
    fn write_to_redacts_and_bounds_metadata() {
        let huge = "x".repeat(MAX_FIELD_OUTPUT_LEN * 2);
        let err = AppError::new(Code::Validation, "bad", "")
            .with_meta("session_token", "tok-123")
            .with_meta("blob", huge);

        let mut line = String::new();
        err.internal_log().write_to(&mut line).unwrap();
        assert!(line.contains("session_token='[REDACTED]'"));
        assert!(!line.contains("tok-123"));
        assert!(line.contains(TRUNCATION_INDICATOR));
        assert!(line.len() < MAX_FIELD_OUTPUT_LEN * 2);
    }

    #[test]
    fn sentinel_log_has_no_location() {
        let line = sentinels::NOT_FOUND.with_internal_log(|log| {
            assert_eq!(log.level(), LogLevel::Warn);
            let mut line = String::new();
            log.write_to(&mut line).map(|_| line)
        });
        assert_eq!(line.unwrap(), "[NOT_FOUND/not_found] warn message='resource not found'");
    }

    #[test]
    fn debug_omits_messages() {
        let err = AppError::new(Code::Internal, "connection string has pw=hunter2", "");
        let rendered = format!("{:?}", err.internal_log());
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("InternalLog"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        captured.text()
    }

    #[test]
    fn emit_uses_classified_level() {
        let out = capture(|| AppError::new(Code::NotFound, "row 12 missing", "").log());
        assert!(out.contains("WARN"));
        assert!(out.contains("row 12 missing"));
        assert!(out.contains("code=NOT_FOUND"));

        let out = capture(|| AppError::new(Code::Conflict, "version clash", "").log());
        assert!(out.contains("ERROR"));
    }

    #[test]
    fn emit_redacts_metadata() {
        let out = capture(|| {
            AppError::new(Code::Unauthorized, "bad login", "")
                .with_meta("password", "hunter2")
                .with_meta("user", "ana")
                .log()
        });
        assert!(!out.contains("hunter2"));
        assert!(out.contains("[REDACTED]"));
        assert!(out.contains("ana"));
    }

    #[test]
    fn log_error_keeps_wrap_context() {
        let err = wrap(Some(&sentinels::RATE_LIMITED), "POST /upload").unwrap();
        let out = capture(|| log_error(&err));
        assert!(out.contains("WARN"));
        assert!(out.contains("code=RATE_LIMITED"));
        assert!(out.contains("POST /upload: rate limit exceeded"));
    }

    #[test]
    fn log_error_on_foreign_chain_is_error_level() {
        let err: BoxError = Box::new(io::Error::other("disk quota exceeded"));
        let out = capture(|| log_error(&*err));
        assert!(out.contains("ERROR"));
        assert!(out.contains("disk quota exceeded"));
    }
}
