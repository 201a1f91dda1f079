//! Capture mode is process-wide, so it gets its own test binary.

use service_errors::{AppError, CaptureMode, Code, capture_mode, sentinels, set_capture_mode};

#[test]
fn capture_mode_controls_stack_traces() {
    assert_eq!(capture_mode(), CaptureMode::Always);

    set_capture_mode(CaptureMode::Never);
    assert_eq!(capture_mode(), CaptureMode::Never);
    let err = AppError::new(Code::Internal, "no trace wanted", "");
    assert!(err.stack_trace().is_none());
    assert!(err.stack_frames().is_empty());

    set_capture_mode(CaptureMode::Always);
    let err = AppError::new(Code::Internal, "trace wanted", "");
    // Platforms without unwinding support report nothing captured.
    if let Some(trace) = err.stack_trace() {
        assert!(!err.stack_frames().is_empty());
        assert!(!trace.to_string().is_empty());
    }

    assert!(sentinels::INTERNAL.stack_trace().is_none());
}
