#![no_main]

use libfuzzer_sys::fuzz_target;
use service_errors::{AppError, Code};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data).into_owned();
    let split = text.len() / 2;
    let (internal, user) = match text.is_char_boundary(split) {
        true => text.split_at(split),
        false => (text.as_str(), ""),
    };

    let err = AppError::new(Code::parse(user), internal.to_owned(), user.to_owned())
        .with_meta(user.to_owned(), internal.to_owned());
    let mut line = String::new();
    let written = err.internal_log().write_to(&mut line);
    assert!(written.is_ok());
    assert!(line.contains(" message='"));
    let _ = format!("{err} {err:?}");
});
