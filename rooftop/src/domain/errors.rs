//! Structured error types for rooftop
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! Failures scoped to a single observation or event are absorbed where they
//! occur and surfaced as a diagnostic line only; these enums cover the
//! failures that a caller has to decide about. Aborting the whole session
//! is reserved for missing capabilities checked in the preflight.

use thiserror::Error;

/// Hardware-event resolution failures. Each one aborts a single
/// `(event, umask)` candidate, never the session.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Event {0} not found in the descriptor dump")]
    EventNotFound(String),

    #[error("Umask {umask} not found under event {event}")]
    UmaskNotFound { event: String, umask: String },

    #[error("Checking tool failed for {query}: {reason}")]
    CheckFailed { query: String, reason: String },

    #[error("Unrecognized checking tool response: {0}")]
    UnrecognizedResponse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Use-case configuration and measurement failures.
#[derive(Error, Debug)]
pub enum UseCaseError {
    #[error("Missing usc.json in {0}")]
    MissingConfig(String),

    #[error("Invalid use-case configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Monitoring loop failures.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Failed to spawn monitored command: {0}")]
    SpawnFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Run driver failures.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Binary not found: {0}")]
    BinaryNotFound(String),

    #[error("Command exited with status {0}")]
    NonZeroExit(i32),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
