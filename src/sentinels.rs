//! Process-wide sentinel errors.
//!
//! Sentinels are comparison targets, not diagnostics: they carry no stack,
//! timestamp or cause. Put one in a chain by reference and match it with
//! [`is`](crate::is), which compares identity rather than content.
//!
//! ```rust
//! use service_errors::{is, sentinels, AppError, Code};
//!
//! let err = AppError::new(Code::Internal, "cache miss on user:7", "")
//!     .with_cause(&sentinels::NOT_FOUND);
//! assert!(is(&err, &sentinels::NOT_FOUND));
//!
//! // Same code and message, different identity.
//! let lookalike = AppError::new(Code::NotFound, "resource not found", "");
//! assert!(!is(&lookalike, &sentinels::NOT_FOUND));
//! ```

use crate::{AppError, Code, Kind};

/// Malformed or rejected input.
pub static INVALID_INPUT: AppError =
    AppError::sentinel(Code::InvalidInput, "invalid input", Kind::Validation);

/// Lookup found nothing.
pub static NOT_FOUND: AppError =
    AppError::sentinel(Code::NotFound, "resource not found", Kind::NotFound);

/// Concurrent modification or duplicate.
pub static CONFLICT: AppError =
    AppError::sentinel(Code::Conflict, "resource conflict", Kind::Conflict);

/// Deadline exceeded.
pub static TIMEOUT: AppError =
    AppError::sentinel(Code::Timeout, "operation timed out", Kind::Timeout);

/// Throttled.
pub static RATE_LIMITED: AppError =
    AppError::sentinel(Code::RateLimited, "rate limit exceeded", Kind::RateLimit);

/// Authenticated but not allowed.
pub static FORBIDDEN: AppError =
    AppError::sentinel(Code::PermissionDenied, "permission denied", Kind::Forbidden);

/// Not authenticated.
pub static UNAUTHORIZED: AppError =
    AppError::sentinel(Code::Unauthorized, "unauthorized", Kind::Unauthorized);

/// Unexpected server-side failure.
pub static INTERNAL: AppError =
    AppError::sentinel(Code::Internal, "internal error", Kind::Internal);

/// Network failure talking to a dependency.
pub static NETWORK: AppError = AppError::sentinel(Code::Network, "network error", Kind::Network);

/// Every sentinel, in declaration order.
pub static ALL: [&AppError; 9] = [
    &INVALID_INPUT,
    &NOT_FOUND,
    &CONFLICT,
    &TIMEOUT,
    &RATE_LIMITED,
    &FORBIDDEN,
    &UNAUTHORIZED,
    &INTERNAL,
    &NETWORK,
];

/// Whether `err` is one of the sentinels in this module (by identity).
pub fn is_sentinel(err: &AppError) -> bool {
    ALL.iter().any(|s| std::ptr::eq(*s, err))
}
