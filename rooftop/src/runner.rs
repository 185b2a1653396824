//! Run driver: spawn one configured run, capture its output, keep status.
//!
//! The log file named by the run identifier is the only persistent marker
//! of a completed run: if it exists the run is skipped unless the caller
//! forces re-execution. That read-then-write check carries no transactional
//! guarantee; concurrent invocations against the same output directory are
//! outside the supported envelope.

use crate::domain::RunError;
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

/// Lines of log tail surfaced when a run fails.
const TAIL_LINES: usize = 30;

/// Whether a run still has to be executed: its log does not exist, or the
/// caller forces re-execution.
#[must_use]
pub fn should_run(log_path: &Path, force: bool) -> bool {
    force || !log_path.exists()
}

/// Environment for a run: the current process environment, the caller's
/// extra pairs, and `OMP_NUM_THREADS` when a thread count is given.
#[must_use]
pub fn build_env(extra: &[(String, String)], threads: Option<u32>) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    for (key, value) in extra {
        env.insert(key.clone(), value.clone());
    }
    if let Some(threads) = threads {
        env.insert("OMP_NUM_THREADS".to_string(), threads.to_string());
    }
    env
}

/// Run a command line, capturing stdout and stderr into the log.
///
/// The log opens with a `~> command` header; on success a
/// `time = ... sec` trailer is appended so later scans can recover the
/// elapsed time of the run.
///
/// # Errors
/// [`RunError::BinaryNotFound`] when the executable is missing (a failed
/// build earlier in the session, not a crash), [`RunError::NonZeroExit`]
/// with the log tail logged when the command fails.
pub fn run_logged(
    exe: &str,
    args: &[String],
    log_path: &Path,
    env: &HashMap<String, String>,
) -> Result<(), RunError> {
    if !Path::new(exe).exists() && which(exe).is_none() {
        let mut log = fs::File::create(log_path)?;
        writeln!(log, "\nERROR : binary not found - {exe}")?;
        return Err(RunError::BinaryNotFound(exe.to_string()));
    }

    let start = Instant::now();
    let mut log = fs::File::create(log_path)?;
    writeln!(log, "\n~> {exe} {}\n", args.join(" "))?;

    let status = Command::new(exe)
        .args(args)
        .env_clear()
        .envs(env)
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log.try_clone()?))
        .status()?;

    if status.success() {
        writeln!(log, "\ntime = {:11.3} sec", start.elapsed().as_secs_f64())?;
        Ok(())
    } else {
        drop(log);
        for line in tail_log(log_path) {
            debug!("{line}");
        }
        Err(RunError::NonZeroExit(status.code().unwrap_or(-1)))
    }
}

/// Last non-empty lines of a log, for failure diagnostics.
#[must_use]
pub fn tail_log(log_path: &Path) -> Vec<String> {
    let Ok(text) = fs::read_to_string(log_path) else {
        return Vec::new();
    };
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(TAIL_LINES);
    lines[skip..].iter().map(|line| format!("    {}", line.trim())).collect()
}

/// Terse per-run status: ` OK (time = ... sec)` or ` KO (time = ... sec)`.
pub fn print_status(start: Instant, ok: bool) {
    let verdict = if ok { " OK" } else { " KO" };
    println!("{verdict} (time = {:11.3} sec)", start.elapsed().as_secs_f64());
}

/// Minimal PATH lookup for bare executable names.
#[must_use]
pub fn which(exe: &str) -> Option<std::path::PathBuf> {
    if exe.contains('/') {
        let path = std::path::PathBuf::from(exe);
        return path.exists().then_some(path);
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).map(|dir| dir.join(exe)).find(|candidate| candidate.exists())
}
