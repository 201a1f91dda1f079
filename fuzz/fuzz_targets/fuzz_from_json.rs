#![no_main]

use libfuzzer_sys::fuzz_target;
use service_errors::{AppError, REDACTION_MARKER, is_sensitive_key};

fuzz_target!(|data: &[u8]| {
    let Ok(err) = AppError::from_json(data) else {
        return;
    };
    // Whatever decoded must encode again, with sensitive keys redacted.
    let Ok(bytes) = err.to_json() else {
        panic!("decoded error failed to re-encode");
    };
    let value: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => panic!("re-encoded error is not JSON: {e}"),
    };
    if let Some(metadata) = value.get("metadata").and_then(|m| m.as_object()) {
        for (key, value) in metadata {
            if is_sensitive_key(key) {
                assert_eq!(value, REDACTION_MARKER);
            }
        }
    }
});
