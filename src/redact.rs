//! Metadata redaction applied before anything leaves the process.
//!
//! A key is sensitive when, compared case-insensitively, it is exactly one of
//! [`SENSITIVE_KEYS`] or contains one of [`SENSITIVE_FRAGMENTS`]. Sensitive
//! values are replaced by [`REDACTION_MARKER`]; keys are always preserved.
//! Only top-level keys are inspected.

use crate::Metadata;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::fmt;

/// Replacement written in place of a sensitive value.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Keys that are sensitive when matched exactly.
pub const SENSITIVE_KEYS: [&str; 7] = [
    "password",
    "token",
    "secret",
    "email",
    "ssn",
    "credit_card",
    "api_key",
];

/// Substrings that make any key containing them sensitive.
pub const SENSITIVE_FRAGMENTS: [&str; 3] = ["password", "token", "secret"];

/// Whether values under `key` must be redacted.
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEYS.contains(&lower.as_str())
        || SENSITIVE_FRAGMENTS.iter().any(|frag| lower.contains(frag))
}

/// Owned copy of `metadata` with sensitive values replaced.
pub fn redact_metadata(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .map(|(k, v)| {
            let value = if is_sensitive_key(k) {
                Value::String(REDACTION_MARKER.to_owned())
            } else {
                v.clone()
            };
            (k.clone(), value)
        })
        .collect()
}

/// Borrowed view over metadata that redacts while serializing or formatting.
///
/// Avoids cloning the map on the serialization path.
#[derive(Clone, Copy)]
pub struct Redacted<'a>(pub &'a Metadata);

impl<'a> Redacted<'a> {
    /// Iterate `(key, value)` pairs with sensitive values replaced.
    pub fn iter(self) -> impl Iterator<Item = (&'a str, RedactedValue<'a>)> + 'a {
        let map: &'a Metadata = self.0;
        map.iter().map(|(k, v)| {
            let value = if is_sensitive_key(k) {
                RedactedValue::Marker
            } else {
                RedactedValue::Plain(v)
            };
            (k.as_str(), value)
        })
    }
}

/// A metadata value as it may be shown outside the process.
#[derive(Clone, Copy)]
pub enum RedactedValue<'a> {
    /// The value is not sensitive.
    Plain(&'a Value),
    /// The value was withheld.
    Marker,
}

impl Serialize for RedactedValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RedactedValue::Plain(v) => v.serialize(serializer),
            RedactedValue::Marker => serializer.serialize_str(REDACTION_MARKER),
        }
    }
}

impl fmt::Display for RedactedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Strings print bare; everything else uses compact JSON.
            RedactedValue::Plain(Value::String(s)) => f.write_str(s),
            RedactedValue::Plain(v) => write!(f, "{v}"),
            RedactedValue::Marker => f.write_str(REDACTION_MARKER),
        }
    }
}

impl fmt::Debug for RedactedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedactedValue::Plain(v) => fmt::Debug::fmt(v, f),
            RedactedValue::Marker => f.write_str(REDACTION_MARKER),
        }
    }
}

impl Serialize for Redacted<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, &v)?;
        }
        map.end()
    }
}

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
