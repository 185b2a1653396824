//! External event checking tool invocation.
//!
//! Each candidate `(event, umask)` pair is handed to libpfm4's
//! `check_events` binary, whose last output line carries the numeric
//! counter code:
//!
//! ```text
//! Codes    : 0x53003c
//! ```
//!
//! The code is normalized into the profiler's raw register syntax by
//! replacing the `0x` prefix with `r`. The invocation is behind a trait so
//! the resolver can be exercised without the tool installed.

use crate::domain::ResolveError;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Sentinel umask for events that declare no sub-masks.
pub const NO_UMASK: &str = "none";

/// One blocking external check per candidate `(event, umask)`.
pub trait EventChecker {
    /// Run the check and return the tool's raw text output.
    ///
    /// # Errors
    /// Returns [`ResolveError::CheckFailed`] when the tool is unavailable
    /// or exits abnormally.
    fn check(&self, event: &str, umask: Option<&str>) -> Result<String, ResolveError>;
}

/// The real `check_events` binary from a libpfm4 build tree.
#[derive(Debug, Clone)]
pub struct CheckEventsTool {
    binary: PathBuf,
}

impl CheckEventsTool {
    pub fn new(binary: &Path) -> Self {
        Self { binary: binary.to_path_buf() }
    }
}

impl EventChecker for CheckEventsTool {
    fn check(&self, event: &str, umask: Option<&str>) -> Result<String, ResolveError> {
        let query = query_string(event, umask);
        let output = Command::new(&self.binary).arg(&query).output().map_err(|e| {
            ResolveError::CheckFailed { query: query.clone(), reason: e.to_string() }
        })?;
        if !output.status.success() {
            return Err(ResolveError::CheckFailed {
                query,
                reason: format!("exit status {}", output.status.code().unwrap_or(-1)),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// `EVT` or `EVT:MASK`, as the checking tool expects it.
#[must_use]
pub fn query_string(event: &str, umask: Option<&str>) -> String {
    match umask {
        Some(umask) if umask != NO_UMASK => format!("{event}:{umask}"),
        _ => event.to_string(),
    }
}

/// Extract the register from the checker output.
///
/// The last non-empty line must carry the `Codes` marker; its code token is
/// rewritten from `0x...` to the profiler's `r...` syntax.
///
/// # Errors
/// Returns [`ResolveError::UnrecognizedResponse`] carrying the offending
/// output when no such line is found.
pub fn register_from_output(output: &str) -> Result<String, ResolveError> {
    let unrecognized = || ResolveError::UnrecognizedResponse(output.trim().to_string());
    let last = output
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(unrecognized)?;
    if !last.contains("Codes") {
        return Err(unrecognized());
    }
    let code = last.split_whitespace().nth(2).ok_or_else(unrecognized)?;
    if !code.starts_with("0x") {
        return Err(unrecognized());
    }
    Ok(code.replacen("0x", "r", 1))
}
