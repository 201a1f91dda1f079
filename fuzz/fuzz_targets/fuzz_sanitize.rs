#![no_main]

use libfuzzer_sys::fuzz_target;
use service_errors::convenience::{MAX_SANITIZED_LEN, sanitize};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let out = sanitize(text);
        assert!(out.len() <= MAX_SANITIZED_LEN);
        assert!(!out.chars().any(char::is_control));
    }
});
