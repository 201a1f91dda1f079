//! Execution trace capture and frame extraction.
//!
//! Capture and frame extraction sit behind two narrow entry points,
//! [`StackTrace::capture`] and [`parse_frames`]. Capture records raw
//! instruction pointers only; symbols are resolved when frames are first
//! asked for, so errors that are never inspected never pay for symbolication.
//!
//! # Capture Policy
//!
//! Capturing a trace costs microseconds, which matters on hot rejection
//! paths (rate limiting, validation). The process-wide [`CaptureMode`]
//! controls it:
//!
//! - `Always` (default): every diagnostic error carries a trace
//! - `Environment`: defer to `RUST_LIB_BACKTRACE` / `RUST_BACKTRACE`
//! - `Never`: no traces, `stack_frames()` is always empty
//!
//! Sentinel errors never capture regardless of mode.

use backtrace::{Backtrace, BacktraceFrame, BacktraceSymbol};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

// ============================================================================
// Capture Mode
// ============================================================================

/// Process-wide stack capture policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CaptureMode {
    /// Capture on every diagnostic construction.
    Always = 0,
    /// Capture only when the backtrace environment variables enable it.
    Environment = 1,
    /// Never capture.
    Never = 2,
}

static CAPTURE_MODE: AtomicU8 = AtomicU8::new(CaptureMode::Always as u8);

/// Set the capture policy for every thread.
#[inline]
pub fn set_capture_mode(mode: CaptureMode) {
    CAPTURE_MODE.store(mode as u8, Ordering::Relaxed);
}

/// Current capture policy.
#[inline]
pub fn capture_mode() -> CaptureMode {
    match CAPTURE_MODE.load(Ordering::Relaxed) {
        0 => CaptureMode::Always,
        1 => CaptureMode::Environment,
        _ => CaptureMode::Never,
    }
}

/// Same precedence as the standard library: `RUST_LIB_BACKTRACE` wins over
/// `RUST_BACKTRACE`, and `0` disables. Read once per process.
fn environment_enables_capture() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var_os("RUST_LIB_BACKTRACE")
            .or_else(|| std::env::var_os("RUST_BACKTRACE"))
            .is_some_and(|value| value != "0")
    })
}

// ============================================================================
// Stack Trace
// ============================================================================

/// Opaque captured execution trace, unresolved until read.
pub struct StackTrace {
    inner: Backtrace,
}

impl StackTrace {
    /// Capture the current trace according to [`capture_mode`].
    ///
    /// Returns `None` when capture is disabled or unsupported on this
    /// platform.
    #[inline(never)]
    pub fn capture() -> Option<Self> {
        let enabled = match capture_mode() {
            CaptureMode::Always => true,
            CaptureMode::Environment => environment_enables_capture(),
            CaptureMode::Never => false,
        };
        if !enabled {
            return None;
        }
        let inner = Backtrace::new_unresolved();
        (!inner.frames().is_empty()).then_some(Self { inner })
    }

    /// Resolve symbols and extract frames.
    pub fn frames(&self) -> Vec<Frame> {
        let mut resolved = self.inner.clone();
        resolved.resolve();
        parse_frames(&resolved)
    }

    /// The raw, unresolved backtrace.
    #[inline]
    pub fn backtrace(&self) -> &Backtrace {
        &self.inner
    }
}

impl fmt::Debug for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackTrace")
            .field("frames", &self.inner.frames().len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, frame) in self.frames().iter().enumerate() {
            writeln!(f, "{index:>4}: {}", frame.function)?;
            writeln!(f, "             at {}:{}", frame.file, frame.line)?;
        }
        Ok(())
    }
}

// ============================================================================
// Frames
// ============================================================================

/// One resolved frame, shaped for error-tracking SDKs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Source file, or `unknown`.
    pub file: String,
    /// Line number, or 0 when unresolved.
    pub line: u32,
    /// Symbol name, or `unknown`.
    pub function: String,
}

impl Frame {
    /// Placeholder returned when a trace has no identifiable frames.
    pub fn unknown() -> Self {
        Self {
            file: "unknown".to_owned(),
            line: 0,
            function: "unknown".to_owned(),
        }
    }

    /// `None` when the symbol carries neither a name nor a file.
    fn from_symbol(symbol: &BacktraceSymbol) -> Option<Self> {
        let function = symbol.name().map(|name| format!("{name:#}"));
        let file = symbol.filename().map(|path| path.display().to_string());
        if function.is_none() && file.is_none() {
            return None;
        }
        Some(Self {
            file: file.unwrap_or_else(|| "unknown".to_owned()),
            line: symbol.lineno().unwrap_or(0),
            function: function.unwrap_or_else(|| "unknown".to_owned()),
        })
    }
}

/// Extract frames from a backtrace.
///
/// Inlined calls appear as extra symbols on one physical frame; each becomes
/// its own [`Frame`], innermost first. An empty trace yields no frames. A
/// trace whose frames carry no identifiable symbol (never resolved, or
/// stripped of debug info) yields a single [`Frame::unknown`].
pub fn parse_frames(trace: &Backtrace) -> Vec<Frame> {
    if trace.frames().is_empty() {
        return Vec::new();
    }
    let mut frames: Vec<Frame> = trace
        .frames()
        .iter()
        .flat_map(BacktraceFrame::symbols)
        .filter_map(Frame::from_symbol)
        .collect();
    if frames.is_empty() {
        frames.push(Frame::unknown());
    }
    frames
}
