//! Formatting macros and input sanitization.
//!
//! - [`wrapf!`](crate::wrapf) wraps with a formatted context message
//! - [`app_error!`](crate::app_error) builds an [`AppError`](crate::AppError)
//!   with a formatted internal message
//! - [`field_error!`](crate::field_error) builds a
//!   [`FieldError`](crate::FieldError) with a formatted reason
//! - [`sanitized!`](crate::sanitized) makes untrusted text safe to put in a
//!   message
//!
//! Messages end up in log lines. Anything a client controls (a header, a
//! path segment, a form value) should go through [`sanitize`] first so it
//! cannot forge log lines or smuggle terminal escapes.

use std::borrow::Cow;

/// Maximum byte length of sanitized text, indicator included.
pub const MAX_SANITIZED_LEN: usize = 256;

/// Replaces input that had nothing printable in it.
pub const INVALID_INPUT_PLACEHOLDER: &str = "[INVALID_INPUT]";

const SANITIZE_TRUNCATION: &str = "...[TRUNCATED]";

/// Neutralize untrusted text for inclusion in an error message.
///
/// - control characters become `?`
/// - an ANSI escape sequence (`ESC` through the final `m`) becomes one `?`
/// - output is cut to [`MAX_SANITIZED_LEN`] bytes on a character boundary,
///   ending in `...[TRUNCATED]`
/// - non-empty input with no printable character becomes
///   [`INVALID_INPUT_PLACEHOLDER`]
///
/// Borrows when the input needs no change.
pub fn sanitize(input: &str) -> Cow<'_, str> {
    if input.len() <= MAX_SANITIZED_LEN && !input.chars().any(char::is_control) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len().min(MAX_SANITIZED_LEN));
    let mut printable = false;
    let mut truncated = false;
    let mut in_escape = false;

    for c in input.chars() {
        if in_escape {
            in_escape = c != 'm';
            continue;
        }
        let replacement = if c == '\u{1b}' {
            in_escape = true;
            '?'
        } else if c.is_control() {
            '?'
        } else {
            printable = true;
            c
        };
        if out.len() + replacement.len_utf8() > MAX_SANITIZED_LEN {
            truncated = true;
            break;
        }
        out.push(replacement);
    }

    if !printable {
        return Cow::Borrowed(INVALID_INPUT_PLACEHOLDER);
    }
    if truncated {
        let mut cut = MAX_SANITIZED_LEN - SANITIZE_TRUNCATION.len();
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        out.push_str(SANITIZE_TRUNCATION);
    }
    Cow::Owned(out)
}

/// Sanitize any `Display` value into an owned `String`.
///
/// ```rust
/// use service_errors::sanitized;
///
/// let header = "abc\r\nX-Admin: true";
/// assert_eq!(sanitized!(header), "abc??X-Admin: true");
/// assert!(sanitized!("A".repeat(300)).ends_with("[TRUNCATED]"));
/// ```
#[macro_export]
macro_rules! sanitized {
    ($value:expr) => {
        $crate::convenience::sanitize(&::std::string::ToString::to_string(&$value)).into_owned()
    };
}

/// Wrap an optional error with a formatted message.
///
/// The message is only formatted when there is an error to wrap.
///
/// ```rust
/// use service_errors::{is, sentinels, wrapf};
///
/// let order = 42;
/// let err = wrapf!(Some(&sentinels::NOT_FOUND), "load order {order}").unwrap();
/// assert_eq!(err.to_string(), "load order 42: resource not found");
/// assert!(is(&err, &sentinels::NOT_FOUND));
/// ```
#[macro_export]
macro_rules! wrapf {
    ($err:expr, $($fmt:tt)+) => {
        ::core::option::Option::map($err, |e| {
            $crate::WrapError::new(e, ::std::format!($($fmt)+))
        })
    };
}

/// Build an [`AppError`](crate::AppError) with a formatted internal message.
///
/// Without `user = ...` the user message falls back to the internal one.
///
/// ```rust
/// use service_errors::{app_error, Code};
///
/// let id = 7;
/// let err = app_error!(Code::NotFound, user = "user not found", "row {id} missing in users");
/// assert_eq!(err.internal_message(), "row 7 missing in users");
/// assert_eq!(err.user_message(), "user not found");
///
/// let err = app_error!(Code::Conflict, "version {} != {}", 3, 4);
/// assert_eq!(err.user_message(), "version 3 != 4");
/// ```
#[macro_export]
macro_rules! app_error {
    ($code:expr, user = $user:expr, $($fmt:tt)+) => {
        $crate::AppError::new($code, ::std::format!($($fmt)+), $user)
    };
    ($code:expr, $($fmt:tt)+) => {
        $crate::AppError::new($code, ::std::format!($($fmt)+), "")
    };
}

/// Build a [`FieldError`](crate::FieldError) with a formatted reason.
///
/// ```rust
/// use service_errors::field_error;
///
/// let err = field_error!("age", "must be at least {}", 18);
/// assert_eq!(err.reason(), "must be at least 18");
/// ```
#[macro_export]
macro_rules! field_error {
    ($field:expr, $($fmt:tt)+) => {
        $crate::FieldError::new($field, ::std::format!($($fmt)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppError, BoxError, Classified, Code, Kind};

    #[test]
    fn clean_input_is_borrowed() {
        assert!(matches!(sanitize("plain text"), Cow::Borrowed("plain text")));
    }

    #[test]
    fn control_chars_are_replaced() {
        assert_eq!(sanitize("a\nb\tc\0"), "a?b?c?");
    }

    #[test]
    fn ansi_sequences_collapse() {
        assert_eq!(sanitize("\u{1b}[31mred\u{1b}[0m"), "?red?");
    }

    #[test]
    fn long_input_is_bounded() {
        let input = "é".repeat(MAX_SANITIZED_LEN);
        let out = sanitize(&input);
        assert!(out.len() <= MAX_SANITIZED_LEN);
        assert!(out.ends_with(SANITIZE_TRUNCATION));
    }

    #[test]
    fn unprintable_input_uses_placeholder() {
        assert_eq!(sanitize("\u{7}\u{7}"), INVALID_INPUT_PLACEHOLDER);
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn wrapf_skips_formatting_for_none() {
        let mut formatted = false;
        let mut note = || {
            formatted = true;
            "x"
        };
        let out = wrapf!(None::<BoxError>, "{}", note());
        assert!(out.is_none());
        assert!(!formatted);
    }

    #[test]
    fn app_error_records_macro_call_site() {
        let err: AppError = app_error!(Code::Timeout, "deadline {}ms", 250);
        assert_eq!(err.kind(), &Kind::Timeout);
        assert_eq!(err.location().map(|l| l.file()), Some(file!()));
    }

    #[test]
    fn field_error_macro() {
        let value = "-3";
        let err = field_error!("quantity", "got {}, want > 0", sanitized!(value));
        assert_eq!(err.field(), "quantity");
        assert_eq!(err.user_message(), "invalid quantity: got -3, want > 0");
    }
}
