use chrono::{TimeDelta, Utc};
use service_errors::{
    AppError, Code, Envelope, FieldError, RateLimitError, Result, ResultExt, log_error, opt,
    sanitized, sentinels,
};
use std::io;

fn find_order(id: &str) -> Result<String> {
    if id.is_empty() {
        return Err(FieldError::new("order_id", "must not be empty").into());
    }
    Err(AppError::new_with(
        Code::NotFound,
        format!("orders row {} missing in shard eu-2", sanitized!(id)),
        "order not found",
        [opt::request_id("req-7f3a"), opt::cause(&sentinels::NOT_FOUND)],
    ))
}

fn read_invoice() -> std::result::Result<Vec<u8>, io::Error> {
    Err(io::Error::new(
        io::ErrorKind::PermissionDenied,
        "open /srv/invoices/2024-11.pdf",
    ))
}

fn print_body(label: &str, body: &Envelope<()>) {
    match body.to_json() {
        Ok(bytes) => println!("   {label}: {}", String::from_utf8_lossy(&bytes)),
        Err(err) => println!("   {label}: encoding failed: {err}"),
    }
}

fn main() {
    // Structured JSON events on stdout, as a log shipper would consume them.
    tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::DEBUG)
        .with_current_span(false)
        .init();

    println!("--- Basic Usage Example ---\n");

    // SCENARIO 1: classified error, logged and returned
    let err = find_order("A-1009\r\nforged: line").unwrap_err();
    println!("1. [CLIENT] What the caller sees:");
    print_body("body", &Envelope::from_error(&err));
    println!("\n   [OPERATOR] What goes to the log:");
    err.log();

    // SCENARIO 2: foreign error wrapped on the way up
    let err = read_invoice().wrap_err("render invoice").unwrap_err();
    println!("\n2. [CLIENT] A foreign error never leaks its text:");
    print_body("body", &Envelope::from_error(&err));
    log_error(&err);

    // SCENARIO 3: rate limiting with retry advice
    let reset = Utc::now() + TimeDelta::seconds(30);
    let err = RateLimitError::new_with(0, reset, [opt::meta("api_key", "sk-live-9")]);
    println!(
        "\n3. [CLIENT] Rate limited, retry after {}s:",
        err.retry_after(Utc::now()).as_secs()
    );
    print_body("body", &Envelope::from_error(&err));
    log_error(&err);
}
