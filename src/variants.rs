//! Specialized errors that extend [`AppError`] with domain fields.
//!
//! Each variant owns a base `AppError` built through the normal construction
//! path, so taxonomy defaults, stack capture and redaction behave exactly as
//! for the base type. Classification is implemented once, on the base, and
//! reached through [`Classified`].
//!
//! | Variant | Code | Kind | Extra fields |
//! |---------|------|------|--------------|
//! | [`RateLimitError`] | `RATE_LIMITED` | `rate_limit` | remaining, reset time |
//! | [`AccessDeniedError`] | `PERMISSION_DENIED` | `forbidden` | role, action, resource |
//! | [`FieldError`] | `VALIDATION` | `validation` | field, reason |
//! | [`TimeoutError`] | `TIMEOUT` | `timeout` | deadline |
//!
//! The kind is fixed after options are applied; a kind override option has
//! no effect on a variant. `TimeoutError` additionally forces
//! `retryable = true` and `timeout = true`.

use crate::{AppError, Code, ErrorOption, Kind, LogLevel};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::time::Duration;

// ============================================================================
// Shared Contract
// ============================================================================

/// The classification contract shared by `AppError` and every variant.
///
/// Generic handling code takes `&impl Classified` (or
/// `&dyn Classified`) and never needs to know which variant it holds.
pub trait Classified: Error {
    /// The base error carrying classification state.
    fn as_app_error(&self) -> &AppError;

    /// Machine-readable code.
    fn code(&self) -> &Code {
        self.as_app_error().code()
    }

    /// Semantic kind.
    fn kind(&self) -> &Kind {
        self.as_app_error().kind()
    }

    /// Default text; see [`AppError::message`].
    fn message(&self) -> &str {
        self.as_app_error().message()
    }

    /// Client-safe message.
    fn user_message(&self) -> &str {
        self.as_app_error().user_message()
    }

    /// HTTP status.
    fn http_status(&self) -> u16 {
        self.as_app_error().http_status()
    }

    /// Retry advisory.
    fn is_retryable(&self) -> bool {
        self.as_app_error().is_retryable()
    }

    /// Timeout classification.
    fn is_timeout(&self) -> bool {
        self.as_app_error().is_timeout()
    }

    /// Suggested log severity.
    fn log_level(&self) -> LogLevel {
        self.as_app_error().log_level()
    }

    /// JSON wire form; identical to the base error's.
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        self.as_app_error().to_json()
    }
}

impl Classified for AppError {
    #[inline]
    fn as_app_error(&self) -> &AppError {
        self
    }
}

/// Resolve a chain link to the `AppError` that classifies it.
///
/// Recognizes `AppError`, `&'static AppError` (sentinels placed in a chain)
/// and every variant in this module. Foreign errors resolve to `None`.
pub fn resolve_app_error<'a>(link: &'a (dyn Error + 'static)) -> Option<&'a AppError> {
    if let Some(err) = link.downcast_ref::<AppError>() {
        return Some(err);
    }
    if let Some(err) = link.downcast_ref::<&'static AppError>() {
        return Some(*err);
    }
    if let Some(err) = link.downcast_ref::<RateLimitError>() {
        return Some(&err.base);
    }
    if let Some(err) = link.downcast_ref::<AccessDeniedError>() {
        return Some(&err.base);
    }
    if let Some(err) = link.downcast_ref::<FieldError>() {
        return Some(&err.base);
    }
    link.downcast_ref::<TimeoutError>().map(|err| &err.base)
}

/// Display, `Error`, `Serialize`, `AsRef` and `Classified` all delegate to
/// the base error.
macro_rules! delegate_to_base {
    ($ty:ty) => {
        impl $ty {
            /// The base error.
            #[inline]
            pub fn base(&self) -> &AppError {
                &self.base
            }

            /// Discard the extra fields and keep the base error.
            #[inline]
            pub fn into_base(self) -> AppError {
                self.base
            }
        }

        impl Classified for $ty {
            #[inline]
            fn as_app_error(&self) -> &AppError {
                &self.base
            }
        }

        impl AsRef<AppError> for $ty {
            #[inline]
            fn as_ref(&self) -> &AppError {
                &self.base
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.base, f)
            }
        }

        impl Error for $ty {
            fn source(&self) -> Option<&(dyn Error + 'static)> {
                self.base.source()
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.base.serialize(serializer)
            }
        }

        impl From<$ty> for AppError {
            fn from(err: $ty) -> AppError {
                err.base
            }
        }
    };
}

// ============================================================================
// Rate Limit
// ============================================================================

/// Request rejected by a rate limiter.
#[derive(Debug)]
pub struct RateLimitError {
    base: AppError,
    remaining: u64,
    reset_at: DateTime<Utc>,
}

impl RateLimitError {
    /// Create a rate-limit error.
    #[track_caller]
    pub fn new(remaining: u64, reset_at: DateTime<Utc>) -> Self {
        Self::new_with(remaining, reset_at, std::iter::empty())
    }

    /// Create a rate-limit error with construction options.
    #[track_caller]
    pub fn new_with(
        remaining: u64,
        reset_at: DateTime<Utc>,
        options: impl IntoIterator<Item = ErrorOption>,
    ) -> Self {
        let mut base = AppError::new_with(
            Code::RateLimited,
            "rate limit exceeded",
            "rate limit exceeded",
            options,
        );
        base.kind = Kind::RateLimit;
        Self {
            base,
            remaining,
            reset_at,
        }
    }

    /// Requests left in the current window.
    #[inline]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// When the window resets.
    #[inline]
    pub const fn reset_at(&self) -> DateTime<Utc> {
        self.reset_at
    }

    /// Time to wait from `now` until the reset; zero once it has passed.
    pub fn retry_after(&self, now: DateTime<Utc>) -> Duration {
        (self.reset_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

delegate_to_base!(RateLimitError);

// ============================================================================
// Access Denied
// ============================================================================

/// A role is not allowed to perform an action on a resource.
#[derive(Debug)]
pub struct AccessDeniedError {
    base: AppError,
    role: String,
    action: String,
    resource: String,
}

impl AccessDeniedError {
    /// Create an access-denied error.
    ///
    /// The internal message names the role, action and resource; the user
    /// message is only `permission denied`.
    #[track_caller]
    pub fn new(
        role: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self::new_with(role, action, resource, std::iter::empty())
    }

    /// Create an access-denied error with construction options.
    #[track_caller]
    pub fn new_with(
        role: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
        options: impl IntoIterator<Item = ErrorOption>,
    ) -> Self {
        let (role, action, resource) = (role.into(), action.into(), resource.into());
        let mut base = AppError::new_with(
            Code::PermissionDenied,
            format!("permission denied: {role} cannot {action} on {resource}"),
            "permission denied",
            options,
        );
        base.kind = Kind::Forbidden;
        Self {
            base,
            role,
            action,
            resource,
        }
    }

    /// Role that was refused.
    #[inline]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Action that was attempted.
    #[inline]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Resource the action targeted.
    #[inline]
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

delegate_to_base!(AccessDeniedError);

// ============================================================================
// Field Validation
// ============================================================================

/// A single input field failed validation.
#[derive(Debug)]
pub struct FieldError {
    base: AppError,
    field: String,
    reason: String,
}

impl FieldError {
    /// Create a field error. See also [`field_error!`](crate::field_error).
    #[track_caller]
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new_with(field, reason, std::iter::empty())
    }

    /// Create a field error with construction options.
    #[track_caller]
    pub fn new_with(
        field: impl Into<String>,
        reason: impl Into<String>,
        options: impl IntoIterator<Item = ErrorOption>,
    ) -> Self {
        let (field, reason) = (field.into(), reason.into());
        let mut base = AppError::new_with(
            Code::Validation,
            format!("field {field}: {reason}"),
            format!("invalid {field}: {reason}"),
            options,
        );
        base.kind = Kind::Validation;
        Self {
            base,
            field,
            reason,
        }
    }

    /// Name of the offending field.
    #[inline]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Why it was rejected.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

delegate_to_base!(FieldError);

// ============================================================================
// Timeout
// ============================================================================

/// An operation ran past its deadline.
///
/// Always retryable and always a timeout, whatever options say.
#[derive(Debug)]
pub struct TimeoutError {
    base: AppError,
    deadline: DateTime<Utc>,
}

impl TimeoutError {
    /// Create a timeout error.
    #[track_caller]
    pub fn new(deadline: DateTime<Utc>) -> Self {
        Self::new_with(deadline, std::iter::empty())
    }

    /// Create a timeout error with construction options.
    #[track_caller]
    pub fn new_with(deadline: DateTime<Utc>, options: impl IntoIterator<Item = ErrorOption>) -> Self {
        let mut base = AppError::new_with(
            Code::Timeout,
            "operation timed out",
            "request timed out",
            options,
        );
        base.kind = Kind::Timeout;
        base.timeout = true;
        base.retryable = true;
        Self { base, deadline }
    }

    /// The deadline that was missed.
    #[inline]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }
}

delegate_to_base!(TimeoutError);
