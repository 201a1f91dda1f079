//! Error taxonomy: machine-readable codes, semantic kinds, and the fixed
//! mapping tables between them.
//!
//! # Mapping Tables
//!
//! ```text
//! Code                              Kind          HTTP   Log level
//! --------------------------------  ------------  -----  ---------
//! INVALID_INPUT, VALIDATION         validation    400    warn
//! UNAUTHORIZED, PERMISSION_DENIED   auth          403    warn
//! NOT_FOUND                         not_found     404    warn
//! TIMEOUT                           timeout       408    warn
//! CONFLICT                          conflict      409    error
//! RATE_LIMITED                      rate_limit    429    warn
//! NETWORK                           network       500    warn
//! INTERNAL, VIDEO_DECODE_FAIL       internal      500    error
//! anything else                     other         500    error
//! ```
//!
//! `unauthorized` (401) and `forbidden` (403) are never produced by the
//! code table; they are set explicitly by sentinels, variants, or a kind
//! override. Every lookup here is total: unknown input falls through to a
//! documented default, never to a failure.
//!
//! # Forward Compatibility
//!
//! Codes and kinds travel over the wire as strings. Unknown strings are kept
//! verbatim (`Code::Custom`, `Kind::Opaque`) rather than rejected, so a newer
//! peer can send codes this build has never heard of.
//!
//! # Example
//!
//! ```rust
//! use service_errors::{Code, Kind, LogLevel};
//!
//! let code = Code::parse("NOT_FOUND");
//! assert_eq!(code, Code::NotFound);
//! assert_eq!(code.default_kind(), Kind::NotFound);
//! assert_eq!(Kind::NotFound.http_status(), 404);
//! assert_eq!(Kind::NotFound.log_level(), LogLevel::Warn);
//!
//! // Unknown codes survive untouched and classify as `other`.
//! let future = Code::parse("QUOTA_EXHAUSTED");
//! assert_eq!(future.as_str(), "QUOTA_EXHAUSTED");
//! assert_eq!(future.default_kind(), Kind::Other);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Code
// ============================================================================

/// Machine-readable error identifier.
///
/// Stable across versions and used for programmatic dispatch. Immutable once
/// assigned to an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Code {
    /// `INVALID_INPUT`
    InvalidInput,
    /// `NOT_FOUND`
    NotFound,
    /// `CONFLICT`
    Conflict,
    /// `TIMEOUT`
    Timeout,
    /// `RATE_LIMITED`
    RateLimited,
    /// `PERMISSION_DENIED`
    PermissionDenied,
    /// `VALIDATION`
    Validation,
    /// `VIDEO_DECODE_FAIL` (media pipeline extension)
    VideoDecodeFail,
    /// `NETWORK`
    Network,
    /// `INTERNAL`
    Internal,
    /// `UNAUTHORIZED`
    Unauthorized,
    /// A code this crate does not define, kept verbatim.
    Custom(Cow<'static, str>),
}

impl Code {
    /// Every code with a fixed spelling, in declaration order.
    pub const ALL: [Code; 11] = [
        Code::InvalidInput,
        Code::NotFound,
        Code::Conflict,
        Code::Timeout,
        Code::RateLimited,
        Code::PermissionDenied,
        Code::Validation,
        Code::VideoDecodeFail,
        Code::Network,
        Code::Internal,
        Code::Unauthorized,
    ];

    /// Wire spelling of the code.
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            Code::InvalidInput => "INVALID_INPUT",
            Code::NotFound => "NOT_FOUND",
            Code::Conflict => "CONFLICT",
            Code::Timeout => "TIMEOUT",
            Code::RateLimited => "RATE_LIMITED",
            Code::PermissionDenied => "PERMISSION_DENIED",
            Code::Validation => "VALIDATION",
            Code::VideoDecodeFail => "VIDEO_DECODE_FAIL",
            Code::Network => "NETWORK",
            Code::Internal => "INTERNAL",
            Code::Unauthorized => "UNAUTHORIZED",
            Code::Custom(s) => s,
        }
    }

    fn known(s: &str) -> Option<Code> {
        Code::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Parse a wire string. Never fails: unknown spellings become `Custom`.
    pub fn parse(s: &str) -> Code {
        Code::known(s).unwrap_or_else(|| Code::Custom(Cow::Owned(s.to_owned())))
    }

    /// Build a caller-defined code.
    ///
    /// A spelling that matches a predefined code yields that code, so
    /// `Code::custom("NOT_FOUND") == Code::NotFound`.
    pub fn custom(s: impl Into<Cow<'static, str>>) -> Code {
        let s = s.into();
        Code::known(&s).unwrap_or(Code::Custom(s))
    }

    /// True for codes this crate defines.
    #[inline]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Code::Custom(_))
    }

    /// The kind an error with this code gets unless overridden.
    #[inline]
    pub fn default_kind(&self) -> Kind {
        kind_for_code(self)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Code {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Code::parse(s))
    }
}

impl From<String> for Code {
    fn from(s: String) -> Self {
        Code::known(&s).unwrap_or(Code::Custom(Cow::Owned(s)))
    }
}

impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Code {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Code::from)
    }
}

// ============================================================================
// Kind
// ============================================================================

/// Coarse semantic category used for HTTP status, log severity and metrics
/// grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `validation`
    Validation,
    /// `network`
    Network,
    /// `timeout`
    Timeout,
    /// `not_found`
    NotFound,
    /// `conflict`
    Conflict,
    /// `forbidden`
    Forbidden,
    /// `internal`
    Internal,
    /// `rate_limit`
    RateLimit,
    /// `auth`
    Auth,
    /// `unauthorized`
    Unauthorized,
    /// `other`
    Other,
    /// A kind string received over the wire that this build does not know.
    ///
    /// Only produced by parsing; [`kind_for_code`] never returns it.
    Opaque(Cow<'static, str>),
}

impl Kind {
    /// The closed set of kinds, in declaration order.
    pub const ALL: [Kind; 11] = [
        Kind::Validation,
        Kind::Network,
        Kind::Timeout,
        Kind::NotFound,
        Kind::Conflict,
        Kind::Forbidden,
        Kind::Internal,
        Kind::RateLimit,
        Kind::Auth,
        Kind::Unauthorized,
        Kind::Other,
    ];

    /// Wire spelling of the kind.
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            Kind::Validation => "validation",
            Kind::Network => "network",
            Kind::Timeout => "timeout",
            Kind::NotFound => "not_found",
            Kind::Conflict => "conflict",
            Kind::Forbidden => "forbidden",
            Kind::Internal => "internal",
            Kind::RateLimit => "rate_limit",
            Kind::Auth => "auth",
            Kind::Unauthorized => "unauthorized",
            Kind::Other => "other",
            Kind::Opaque(s) => s,
        }
    }

    fn known(s: &str) -> Option<Kind> {
        Kind::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Parse a wire string. Never fails: unknown spellings become `Opaque`.
    pub fn parse(s: &str) -> Kind {
        Kind::known(s).unwrap_or_else(|| Kind::Opaque(Cow::Owned(s.to_owned())))
    }

    /// HTTP status for this kind.
    #[inline]
    pub const fn http_status(&self) -> u16 {
        http_status_for_kind(self)
    }

    /// Suggested log severity for this kind.
    #[inline]
    pub const fn log_level(&self) -> LogLevel {
        log_level_for_kind(self)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Kind::parse(s))
    }
}

impl From<String> for Kind {
    fn from(s: String) -> Self {
        Kind::known(&s).unwrap_or(Kind::Opaque(Cow::Owned(s)))
    }
}

impl Serialize for Kind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Kind::from)
    }
}

// ============================================================================
// Log Level
// ============================================================================

/// Severity the logger should use for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// `debug`
    Debug,
    /// `info`
    Info,
    /// `warn`
    Warn,
    /// `error`
    Error,
}

impl LogLevel {
    /// Lowercase spelling.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Equivalent `tracing` level.
    #[inline]
    pub const fn to_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Mapping Tables
// ============================================================================

/// Default kind for a code. Unlisted codes map to [`Kind::Other`].
pub fn kind_for_code(code: &Code) -> Kind {
    match code {
        Code::InvalidInput | Code::Validation => Kind::Validation,
        Code::NotFound => Kind::NotFound,
        Code::Conflict => Kind::Conflict,
        Code::Timeout => Kind::Timeout,
        Code::RateLimited => Kind::RateLimit,
        Code::PermissionDenied | Code::Unauthorized => Kind::Auth,
        Code::Network => Kind::Network,
        Code::Internal | Code::VideoDecodeFail => Kind::Internal,
        Code::Custom(_) => Kind::Other,
    }
}

/// HTTP status for a kind. Unlisted kinds map to 500.
pub const fn http_status_for_kind(kind: &Kind) -> u16 {
    match kind {
        Kind::Validation => 400,
        Kind::Unauthorized => 401,
        Kind::Auth | Kind::Forbidden => 403,
        Kind::NotFound => 404,
        Kind::Timeout => 408,
        Kind::Conflict => 409,
        Kind::RateLimit => 429,
        Kind::Network | Kind::Internal | Kind::Other | Kind::Opaque(_) => 500,
    }
}

/// Log severity for a kind.
///
/// Downstream alerting keys off this table; `unauthorized` and unknown kinds
/// land on `error`.
pub const fn log_level_for_kind(kind: &Kind) -> LogLevel {
    match kind {
        Kind::Validation | Kind::NotFound => LogLevel::Warn,
        Kind::Forbidden | Kind::Auth | Kind::RateLimit => LogLevel::Warn,
        Kind::Timeout | Kind::Network => LogLevel::Warn,
        Kind::Internal | Kind::Conflict | Kind::Other => LogLevel::Error,
        Kind::Unauthorized | Kind::Opaque(_) => LogLevel::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_table_matches_documented_defaults() {
        let expected = [
            (Code::InvalidInput, Kind::Validation),
            (Code::Validation, Kind::Validation),
            (Code::NotFound, Kind::NotFound),
            (Code::Conflict, Kind::Conflict),
            (Code::Timeout, Kind::Timeout),
            (Code::RateLimited, Kind::RateLimit),
            (Code::PermissionDenied, Kind::Auth),
            (Code::Unauthorized, Kind::Auth),
            (Code::Network, Kind::Network),
            (Code::Internal, Kind::Internal),
            (Code::VideoDecodeFail, Kind::Internal),
        ];
        for (code, kind) in expected {
            assert_eq!(kind_for_code(&code), kind, "code {code}");
        }
        assert_eq!(kind_for_code(&Code::custom("SOMETHING_NEW")), Kind::Other);
    }

    #[test]
    fn every_code_maps_into_closed_kind_set() {
        for code in Code::ALL {
            let kind = kind_for_code(&code);
            assert!(Kind::ALL.contains(&kind), "{code} -> {kind}");
        }
    }

    #[test]
    fn http_status_table() {
        let expected = [
            (Kind::Validation, 400),
            (Kind::Unauthorized, 401),
            (Kind::Auth, 403),
            (Kind::Forbidden, 403),
            (Kind::NotFound, 404),
            (Kind::Timeout, 408),
            (Kind::Conflict, 409),
            (Kind::RateLimit, 429),
            (Kind::Network, 500),
            (Kind::Internal, 500),
            (Kind::Other, 500),
        ];
        for (kind, status) in expected {
            assert_eq!(kind.http_status(), status, "kind {kind}");
        }
        assert_eq!(Kind::parse("brand_new").http_status(), 500);
    }

    #[test]
    fn log_level_table() {
        let warn = [
            Kind::Validation,
            Kind::NotFound,
            Kind::Forbidden,
            Kind::Auth,
            Kind::RateLimit,
            Kind::Timeout,
            Kind::Network,
        ];
        for kind in warn {
            assert_eq!(kind.log_level(), LogLevel::Warn, "kind {kind}");
        }
        let error = [Kind::Internal, Kind::Conflict, Kind::Other, Kind::Unauthorized];
        for kind in error {
            assert_eq!(kind.log_level(), LogLevel::Error, "kind {kind}");
        }
    }

    #[test]
    fn parse_roundtrips_known_spellings() {
        for code in Code::ALL {
            assert_eq!(Code::parse(code.as_str()), code);
        }
        for kind in Kind::ALL {
            assert_eq!(Kind::parse(kind.as_str()), kind);
        }
    }

    #[test]
    fn unknown_strings_are_kept_opaque() {
        let code = Code::parse("LEGACY_42");
        assert!(!code.is_known());
        assert_eq!(code.to_string(), "LEGACY_42");

        let kind = Kind::parse("quota");
        assert_eq!(kind, Kind::Opaque(Cow::Borrowed("quota")));
        assert_eq!(kind.log_level(), LogLevel::Error);
    }

    #[test]
    fn custom_normalizes_known_spellings() {
        assert_eq!(Code::custom("TIMEOUT"), Code::Timeout);
        assert!(matches!(Code::custom("MINE"), Code::Custom(Cow::Borrowed("MINE"))));
    }

    #[test]
    fn serde_uses_wire_strings() {
        assert_eq!(serde_json::to_string(&Code::RateLimited).unwrap(), "\"RATE_LIMITED\"");
        assert_eq!(serde_json::to_string(&Kind::RateLimit).unwrap(), "\"rate_limit\"");
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), "\"warn\"");

        let code: Code = serde_json::from_str("\"NOPE\"").unwrap();
        assert_eq!(code.as_str(), "NOPE");
        let kind: Kind = serde_json::from_str("\"not_found\"").unwrap();
        assert_eq!(kind, Kind::NotFound);
    }

    #[test]
    fn log_level_converts_to_tracing() {
        assert_eq!(LogLevel::Warn.to_tracing(), tracing::Level::WARN);
        assert_eq!(LogLevel::Error.to_tracing(), tracing::Level::ERROR);
        assert!(LogLevel::Debug < LogLevel::Error);
    }
}
