//! Cross-thread error carrying.
//!
//! A worker thread that hits an error cannot hand the live error to its
//! consumer without also handing over whatever the error borrows. The
//! snapshot renders everything to owned strings at the catch site, so the
//! worker's stack can unwind fully before the value crosses the channel.

use crate::error::{Error, ErrorKind, KeyMessage};
use std::error::Error as StdError;

pub const DEFAULT_ORIGIN: &str = "in background";

/// One-shot snapshot of an in-flight [`Error`].
///
/// Holds only the kind tag, the rendered trace, and an origin label.
/// Immutable once constructed; consumed by [`ErrorSnapshot::reraise`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSnapshot {
    kind: ErrorKind,
    trace: String,
    origin: String,
}

impl ErrorSnapshot {
    /// Captures `err` with the default `"in background"` origin label.
    pub fn capture(err: &Error) -> Self {
        Self::capture_where(err, DEFAULT_ORIGIN)
    }

    /// Captures `err`, rendering its full source chain to a string before
    /// returning. Nothing of the original error is retained.
    pub fn capture_where(err: &Error, origin: impl Into<String>) -> Self {
        Self {
            kind: err.kind(),
            trace: render_trace(err),
            origin: origin.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn trace(&self) -> &str {
        &self.trace
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Rebuilds a same-kind error carrying the captured trace.
    ///
    /// The message reads `"Caught <kind> <origin>.\nOriginal <trace>"`.
    /// Key-lookup errors are given the message verbatim because their
    /// display quotes the payload, which garbles multi-line traces. Kinds
    /// that cannot be rebuilt from a single message become a generic
    /// [`Error::Internal`] with the same message; the failed construction
    /// is a shim artifact and is dropped, not chained.
    pub fn reraise(self) -> Error {
        let msg = format!("Caught {} {}.\nOriginal {}", self.kind.name(), self.origin, self.trace);
        if self.kind == ErrorKind::KeyNotFound {
            return Error::KeyNotFound(KeyMessage::verbatim(msg));
        }
        match self.kind.with_message(msg) {
            Ok(err) => err,
            Err(msg) => Error::Internal { message: msg },
        }
    }
}

fn render_trace(err: &Error) -> String {
    let mut out = format!("error: {}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!("\ncaused by: {}", cause));
        source = cause.source();
    }
    out
}
