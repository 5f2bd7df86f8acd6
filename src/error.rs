//! Error types
//!
//! `Fault` is the request-scoped error every pipeline stage and resource
//! handler returns; the translator in `pipeline::translate` is the only place
//! that turns one into a response. `StartupError` covers process startup.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Fault category as it appears in the `status` field of an error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultKind {
    /// Client fault (4xx)
    Fail,
    /// Server fault (5xx), also the default when nothing was set
    Error,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A request fault.
///
/// The kind and status code are independent: setting a 4xx status code does
/// not turn the kind into `Fail`. Only [`Fault::fail`] or [`Fault::with_kind`]
/// do that.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Fault {
    kind: FaultKind,
    status_code: u16,
    message: String,
    trace: Option<String>,
}

impl Fault {
    pub const DEFAULT_STATUS: u16 = 500;

    /// Server fault with status 500 and a captured trace.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let trace = Some(capture_trace(&message));
        Self {
            kind: FaultKind::Error,
            status_code: Self::DEFAULT_STATUS,
            message,
            trace,
        }
    }

    /// Client fault with an explicit status code.
    pub fn fail(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(message)
            .with_status(status_code)
            .with_kind(FaultKind::Fail)
    }

    #[must_use]
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: FaultKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn without_trace(mut self) -> Self {
        self.trace = None;
        self
    }

    pub const fn kind(&self) -> FaultKind {
        self.kind
    }

    pub const fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    pub fn not_found() -> Self {
        Self::fail(404, "No document found with that ID")
    }
}

fn capture_trace(message: &str) -> String {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => format!("Fault: {message}\n{backtrace}"),
        _ => format!("Fault: {message}"),
    }
}

/// Errors that stop the process before it starts serving
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid address: {0}")]
    Address(String),
}
