//! Domain model for rooftop
//!
//! Core newtypes and structured errors shared across modules.

pub mod errors;
pub mod types;

pub use types::Pid;

pub use errors::{MonitorError, ResolveError, RunError, UseCaseError};
