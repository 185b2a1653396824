//! Supervised sampling of a running child process.
//!
//! While a monitored command runs, the controller polls its liveness at a
//! fixed short interval and appends a point-in-time memory and CPU sample
//! to history logs at each iteration. History resolution is therefore
//! bounded below by the polling interval, not by any profiler rate.
//!
//! Termination is purely cooperative on child exit; there is no timeout on
//! the monitored process.
//!
//! History logs are named through the run-identity codec
//! (`root.mem.n=XX.t=YY.log`, `root.cpu.n=XX.t=YY.log`) and carry a
//! `# pid ...` header followed by one row per sample. Values the kernel
//! does not expose are written as `-1` so rows keep a fixed column count.

// Tick-to-percent arithmetic intentionally converts counters to f64
#![allow(clippy::cast_precision_loss)]
#![allow(unsafe_code)] // sysconf() requires unsafe

use crate::domain::{MonitorError, Pid};
use log::info;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use tokio::process::Child;

/// Liveness polling period; also the history sampling floor.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Kernel clock ticks per second (`USER_HZ`), for CPU-time accounting.
/// Falls back to the common 100 Hz when the kernel does not answer.
fn ticks_per_sec() -> f64 {
    // SAFETY: sysconf takes no pointers and only returns a value
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as f64
    } else {
        100.0
    }
}

#[derive(Debug, Clone)]
pub struct Monitor {
    interval: Duration,
    /// Whether memory/CPU history logs are written at all.
    watch: bool,
}

/// One memory sample, in bytes (`-1` when unavailable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySample {
    pub vms: i64,
    pub rss: i64,
    pub swap: i64,
}

impl Monitor {
    #[must_use]
    pub fn new(watch: bool) -> Self {
        Self { interval: POLL_INTERVAL, watch }
    }

    #[must_use]
    pub fn with_interval(watch: bool, interval: Duration) -> Self {
        Self { interval, watch }
    }

    /// Poll the child until it exits, appending history samples each
    /// iteration.
    ///
    /// `root` and the `n=XX`/`t=YY` pairs name the history logs in `dir`.
    ///
    /// # Errors
    /// Fails when the child cannot be polled or a history log cannot be
    /// written; a vanished `/proc` entry (child exiting mid-sample) is not
    /// an error.
    pub async fn supervise(
        &self,
        root: &str,
        n_pair: &str,
        t_pair: &str,
        mut child: Child,
        dir: &Path,
    ) -> Result<ExitStatus, MonitorError> {
        let start = Instant::now();
        let mut mem_log = self.open_history(dir, root, "mem", n_pair, t_pair)?;
        let mut cpu_log = self.open_history(dir, root, "cpu", n_pair, t_pair)?;
        let mut previous_ticks: Option<u64> = None;

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if let Some(raw_pid) = child.id() {
                let pid = Pid(raw_pid);
                let elapsed = start.elapsed().as_secs_f64();
                if let Some(ref mut log) = mem_log {
                    append_memory_row(log, pid, elapsed)?;
                }
                if let Some(ref mut log) = cpu_log {
                    previous_ticks = append_cpu_row(
                        log,
                        pid,
                        elapsed,
                        previous_ticks,
                        self.interval.as_secs_f64(),
                    )?;
                }
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    fn open_history(
        &self,
        dir: &Path,
        root: &str,
        what: &str,
        n_pair: &str,
        t_pair: &str,
    ) -> Result<Option<HistoryLog>, MonitorError> {
        if !self.watch {
            return Ok(None);
        }
        let path = dir.join(format!("{root}.{what}.{n_pair}.{t_pair}.log"));
        info!("Watching {what} in {} ...", path.display());
        Ok(Some(HistoryLog { path, file: None, what: what.to_string() }))
    }
}

/// Launch a monitored command, naming the executable in the failure.
///
/// # Errors
/// Returns [`MonitorError::SpawnFailed`] when the command cannot be
/// started at all.
pub fn spawn_monitored(
    command: &mut tokio::process::Command,
    name: &str,
) -> Result<Child, MonitorError> {
    command.spawn().map_err(|e| MonitorError::SpawnFailed(format!("{name}: {e}")))
}

/// Lazily created history log: the header needs the child PID, which is
/// only known once the child is running.
struct HistoryLog {
    path: PathBuf,
    file: Option<fs::File>,
    what: String,
}

impl HistoryLog {
    fn file(&mut self, pid: Pid) -> Result<&mut fs::File, MonitorError> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                let mut file = fs::File::create(&self.path)?;
                writeln!(file, "# pid {}", pid.0)?;
                if self.what == "mem" {
                    writeln!(file, "# time(sec) vms(Bytes) rss(Bytes) swap(Bytes)")?;
                } else {
                    writeln!(file, "# time(sec) cpu(%)")?;
                }
                file
            }
        };
        Ok(self.file.insert(file))
    }
}

fn append_memory_row(log: &mut HistoryLog, pid: Pid, elapsed: f64) -> Result<(), MonitorError> {
    let Ok(status) = fs::read_to_string(format!("/proc/{}/status", pid.0)) else {
        return Ok(()); // Child exited between poll and sample
    };
    let sample = parse_status_memory(&status);
    let file = log.file(pid)?;
    writeln!(
        file,
        "{elapsed:.0} {} {} {} # pid {}",
        sample.vms, sample.rss, sample.swap, pid.0
    )?;
    Ok(())
}

fn append_cpu_row(
    log: &mut HistoryLog,
    pid: Pid,
    elapsed: f64,
    previous_ticks: Option<u64>,
    interval_sec: f64,
) -> Result<Option<u64>, MonitorError> {
    let Ok(stat) = fs::read_to_string(format!("/proc/{}/stat", pid.0)) else {
        return Ok(previous_ticks);
    };
    let Some(ticks) = parse_stat_ticks(&stat) else {
        return Ok(previous_ticks);
    };
    // Percent of one core over the last polling interval
    let percent = previous_ticks.map_or(0.0, |prev| {
        (ticks.saturating_sub(prev)) as f64 / ticks_per_sec() / interval_sec * 100.0
    });
    let file = log.file(pid)?;
    writeln!(file, "{elapsed:.0} {percent:.0} # pid {}", pid.0)?;
    Ok(Some(ticks))
}

/// Extract VmSize/VmRSS/VmSwap (kB fields) from `/proc/<pid>/status`.
#[must_use]
pub fn parse_status_memory(status: &str) -> MemorySample {
    let field = |name: &str| -> i64 {
        status
            .lines()
            .find(|line| line.starts_with(name))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|kb| kb.parse::<i64>().ok())
            .map_or(-1, |kb| kb * 1024)
    };
    MemorySample { vms: field("VmSize:"), rss: field("VmRSS:"), swap: field("VmSwap:") }
}

/// Cumulative utime+stime clock ticks from `/proc/<pid>/stat`.
///
/// The comm field may contain spaces, so fields are counted after the
/// closing parenthesis: utime and stime are the 12th and 13th fields past
/// it.
#[must_use]
pub fn parse_stat_ticks(stat: &str) -> Option<u64> {
    let after_comm = stat.rsplit_once(')')?.1;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}
