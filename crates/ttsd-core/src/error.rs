//! The closed error taxonomy surfaced to clients, plus the internal
//! wrapper that carries a human-readable detail for logs without leaking
//! that detail into the wire-level kind clients branch on.
//!
//! One variant per failure mode, the way [`ErrorKind`]'s sibling types in
//! the rest of the scheduler are modeled — no string-typed catch-all.

use thiserror::Error;

/// The closed set of error kinds an RPC method or a scheduler-internal
/// failure path may report to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("no error")]
    None,
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("invalid state for this operation")]
    InvalidState,
    #[error("requested voice is not supported")]
    InvalidVoice,
    #[error("no synthesis engine available")]
    EngineNotFound,
    #[error("operation failed")]
    OperationFailed,
    #[error("network required by the engine is unavailable")]
    OutOfNetwork,
    #[error("operation timed out")]
    TimedOut,
    #[error("audio policy denied output")]
    AudioPolicyBlocked,
    /// The engine does not support a requested optional capability (only
    /// used today for a non-default pitch on an engine without pitch
    /// control).
    #[error("requested feature is not supported by the active engine")]
    NotSupportedFeature,
}

/// A scheduler-level failure: the closed [`ErrorKind`] clients see, plus a
/// free-text detail for logs and diagnostics that never crosses the wire
/// as part of the kind itself.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct SchedulerError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SchedulerError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the scheduler for operations that can
/// fail with the closed taxonomy above.
pub type Result<T> = std::result::Result<T, SchedulerError>;
