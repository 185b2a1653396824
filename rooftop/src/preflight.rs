//! Pre-flight checks for rooftop
//!
//! Validates the profiling environment before any counting run starts.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Most restrictive `perf_event_paranoid` level that still allows
/// unprivileged per-process counting.
const MAX_PARANOID_FOR_USER: i32 = 2;

/// Run all pre-flight checks before a profiling session
pub fn run_preflight_checks(event_checker: Option<&Path>) -> Result<()> {
    check_perf_available()?;
    check_perf_event_paranoid()?;
    if let Some(checker) = event_checker {
        check_binary_exists(checker)?;
    }
    Ok(())
}

/// Check that the perf front-end is installed
fn check_perf_available() -> Result<()> {
    if crate::runner::which("perf").is_some() {
        return Ok(());
    }
    bail!(
        "perf not found on PATH.\n\n\
         Install it with your distribution's linux-tools package\n\
         (e.g. apt install linux-tools-common linux-tools-$(uname -r))."
    );
}

/// Check that the kernel allows unprivileged event counting
fn check_perf_event_paranoid() -> Result<()> {
    // Root can count regardless of the paranoid level
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    let raw = std::fs::read_to_string("/proc/sys/kernel/perf_event_paranoid")
        .context("Failed to read /proc/sys/kernel/perf_event_paranoid")?;
    let level: i32 = raw.trim().parse().unwrap_or(0);

    if level > MAX_PARANOID_FOR_USER {
        bail!(
            "perf_event_paranoid is {level}, hardware counters are unavailable.\n\n\
             Lower it with: sudo sysctl kernel.perf_event_paranoid={MAX_PARANOID_FOR_USER}\n\
             or run as root."
        );
    }
    Ok(())
}

/// Check that a configured helper binary exists and is a file
fn check_binary_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!(
            "Binary not found: {}\n\n\
             Make sure the path is correct and the binary exists.",
            path.display()
        );
    }
    if !path.is_file() {
        bail!(
            "Not a file: {}\n\n\
             The event checker must be an executable file, not a directory.",
            path.display()
        );
    }
    Ok(())
}
