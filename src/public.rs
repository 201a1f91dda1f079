//! Client-facing extraction from arbitrary error chains.
//!
//! These are the functions an HTTP layer calls on whatever error a handler
//! returned. All of them are default-deny: a chain with no classified link
//! yields the generic message and a 500, never the foreign error's text.

use crate::chain::search_chain;
use crate::{AsDynError, find_app_error, is, is_match, resolve_app_error, sentinels};
use std::error::Error;
use std::io;

/// Message returned to clients when no classified error supplies one.
pub const GENERIC_PUBLIC_MESSAGE: &str = "an error occurred";

/// The message safe to show a client.
///
/// - `None`: the empty string
/// - the first classified link with a non-empty user message: that message
/// - otherwise: [`GENERIC_PUBLIC_MESSAGE`]
///
/// ```rust
/// use service_errors::{public_message, wrap, AppError, Code};
///
/// let err = wrap(Some(AppError::new(Code::NotFound, "row 9 missing", "not found")), "ctx");
/// assert_eq!(public_message(err.as_ref()), "not found");
///
/// let foreign = std::io::Error::other("/etc/shadow: permission denied");
/// assert_eq!(public_message(Some(&foreign)), "an error occurred");
/// assert_eq!(public_message(None::<&std::io::Error>), "");
/// ```
pub fn public_message<E: AsDynError + ?Sized>(err: Option<&E>) -> &str {
    let Some(err) = err else {
        return "";
    };
    search_chain(err, |link| {
        resolve_app_error(link)
            .map(|app| app.user_message())
            .filter(|msg| !msg.is_empty())
    })
    .unwrap_or(GENERIC_PUBLIC_MESSAGE)
}

/// Whether the first classified link advises a retry. `false` for `None`
/// and for chains with no classified link.
pub fn is_retryable<E: AsDynError + ?Sized>(err: Option<&E>) -> bool {
    err.and_then(find_app_error)
        .is_some_and(|app| app.is_retryable())
}

/// Whether the chain represents a timeout.
///
/// With a classified link, its timeout classification decides. Otherwise
/// the chain is checked for the [`TIMEOUT`](sentinels::TIMEOUT) sentinel or
/// an `io::Error` of kind `TimedOut`.
pub fn is_timeout_error<E: AsDynError + ?Sized>(err: Option<&E>) -> bool {
    let Some(err) = err else {
        return false;
    };
    if let Some(app) = find_app_error(err) {
        return app.is_timeout();
    }
    is(err, &sentinels::TIMEOUT) || is_match(err, is_io_timeout)
}

fn is_io_timeout(link: &(dyn Error + 'static)) -> bool {
    link.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::TimedOut)
}

/// HTTP status for the first classified link; 500 when there is none.
pub fn http_status_of<E: AsDynError + ?Sized>(err: &E) -> u16 {
    find_app_error(err).map_or(500, |app| app.http_status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppError, BoxError, Code, FieldError, TimeoutError, join, opt, wrap};
    use chrono::Utc;

    fn none() -> Option<&'static AppError> {
        None
    }

    #[test]
    fn absent_error_is_benign() {
        assert_eq!(public_message(none()), "");
        assert!(!is_retryable(none()));
        assert!(!is_timeout_error(none()));
    }

    #[test]
    fn public_message_prefers_classified_user_message() {
        let err = AppError::new(Code::Internal, "stack overflow in parser", "please retry");
        assert_eq!(public_message(Some(&err)), "please retry");
    }

    #[test]
    fn public_message_hides_foreign_text() {
        let err = io::Error::other("dial tcp 10.0.0.3:5432: connection refused");
        assert_eq!(public_message(Some(&err)), GENERIC_PUBLIC_MESSAGE);
        let wrapped = wrap(Some(err), "load orders").unwrap();
        assert_eq!(public_message(Some(&wrapped)), GENERIC_PUBLIC_MESSAGE);
    }

    #[test]
    fn public_message_searches_past_empty_user_messages() {
        let inner = AppError::new(Code::NotFound, "missing", "order not found");
        let outer = AppError::new(Code::Internal, "", "").with_cause(inner);
        assert_eq!(outer.user_message(), "");
        assert_eq!(public_message(Some(&outer)), "order not found");
    }

    #[test]
    fn public_message_through_variants_and_wraps() {
        let err = wrap(Some(FieldError::new("email", "missing @")), "signup").unwrap();
        assert_eq!(public_message(Some(&err)), "invalid email: missing @");
    }

    #[test]
    fn retryable_follows_first_classified_link() {
        let err = wrap(
            Some(AppError::new_with(Code::Network, "reset", "", [opt::retryable(true)])),
            "call billing",
        )
        .unwrap();
        assert!(is_retryable(Some(&err)));
        assert!(!is_retryable(Some(&io::Error::other("x"))));
    }

    #[test]
    fn timeout_detection() {
        let flagged = AppError::new_with(Code::Internal, "slow", "", [opt::timeout(true)]);
        assert!(is_timeout_error(Some(&flagged)));

        let variant = TimeoutError::new(Utc::now());
        assert!(is_timeout_error(Some(&variant)));

        let sentinel = wrap(Some(&sentinels::TIMEOUT), "fetch").unwrap();
        assert!(is_timeout_error(Some(&sentinel)));

        let io_timeout = wrap(Some(io::Error::from(io::ErrorKind::TimedOut)), "read").unwrap();
        assert!(is_timeout_error(Some(&io_timeout)));

        let other = io::Error::from(io::ErrorKind::BrokenPipe);
        assert!(!is_timeout_error(Some(&other)));
    }

    #[test]
    fn classified_link_decides_timeout() {
        let err = AppError::new(Code::Validation, "bad", "")
            .with_cause(io::Error::from(io::ErrorKind::TimedOut));
        assert!(!is_timeout_error(Some(&err)));
    }

    #[test]
    fn status_defaults_to_500() {
        assert_eq!(http_status_of(&io::Error::other("x")), 500);
        let err = wrap(Some(&sentinels::UNAUTHORIZED), "auth").unwrap();
        assert_eq!(http_status_of(&err), 401);
    }

    #[test]
    fn joined_errors_classify_by_first_constituent() {
        let merged: BoxError = join([
            BoxError::from(io::Error::other("noise")),
            BoxError::from(&sentinels::CONFLICT),
        ])
        .unwrap();
        assert_eq!(http_status_of(&*merged), 409);
    }
}
