//! Use-case configuration and perf-stat measurement.
//!
//! A use case is a user-supplied workload living in its own directory with
//! a `usc.json` configuration. Each configured `(MPI, threads)` pair runs
//! in a `n=XX.t=YY` subdirectory under `perf stat`, and the captured
//! counter log is later scraped into one [`UseCaseSample`] positioned on
//! the roofline chart.
//!
//! Counter scraping tolerates the quirks of real perf output: the `:u`
//! modifier may be dropped from the event column, counts carry thousands
//! separators, and packed floating-point events count instructions rather
//! than flops, so they are scaled by the per-instruction flop width before
//! summing.

// Count-to-rate arithmetic intentionally converts counters to f64
#![allow(clippy::cast_precision_loss)]

use crate::domain::UseCaseError;
use crate::events::RegisterMapping;
use crate::metrics::BenchKind;
use crate::roofline::UseCaseSample;
use crate::runid::RunToken;
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file expected in every use-case directory.
pub const CONFIG_FILE: &str = "usc.json";

/// Counter scaling constants, from the platform configuration.
#[derive(Debug, Clone, Copy)]
pub struct ScaleFactors {
    /// Flops counted per packed SIMD instruction.
    pub flop_per_packed_simd: u64,
    /// Flops counted per packed SSE instruction.
    pub flop_per_packed_sse: u64,
    /// Bytes moved per counted cache miss.
    pub cache_line_bytes: u64,
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self { flop_per_packed_simd: 1, flop_per_packed_sse: 1, cache_line_bytes: 64 }
    }
}

/// Raw `usc.json` shape. Every list-valued field is a single
/// whitespace-separated string, except ARGS which separates per-run
/// argument strings with `|` so each run of a scaling series can get its
/// own problem size.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(rename = "EXE")]
    exe: Option<String>,
    #[serde(rename = "ARGS")]
    args: Option<String>,
    #[serde(rename = "MPI")]
    mpi: Option<String>,
    #[serde(rename = "THD")]
    thd: Option<String>,
    #[serde(rename = "COLOR")]
    color: Option<String>,
    #[serde(rename = "MARKER")]
    marker: Option<String>,
    #[serde(rename = "LABEL")]
    label: Option<String>,
    #[serde(rename = "LOGID")]
    log_id: Option<String>,
}

/// Validated use-case configuration.
#[derive(Debug, Clone)]
pub struct UseCaseConfig {
    /// Use-case name, the base name of its directory.
    pub name: String,
    /// Workload executable, relative to the use-case directory.
    pub exe: String,
    /// Per-run argument strings; empty when the workload takes none.
    pub args: Vec<String>,
    /// MPI process counts, one per run; `-1` marks a sequential run.
    pub mpi: Vec<i64>,
    /// Thread counts, one per run.
    pub threads: Vec<u32>,
    /// Plot color per run.
    pub colors: Vec<String>,
    /// Plot marker per run.
    pub markers: Vec<char>,
    /// Legend label stem shared by all runs.
    pub label: Option<String>,
    /// Extra identifiers every matched log name must contain.
    pub log_ids: Vec<String>,
}

impl UseCaseConfig {
    /// Read and validate `usc.json` from a use-case directory.
    ///
    /// When `for_plot` is set the COLOR, MARKER and LABEL styling fields
    /// become mandatory, since the runs will end up on the roofline chart.
    ///
    /// # Errors
    /// [`UseCaseError::MissingConfig`] when there is no `usc.json`,
    /// [`UseCaseError::InvalidConfig`] when a consistency check fails;
    /// every failed check is also printed as a `KO` line first.
    pub fn load(dir: &Path, for_plot: bool) -> Result<Self, UseCaseError> {
        let name = dir
            .file_name()
            .map_or_else(|| dir.display().to_string(), |n| n.to_string_lossy().into_owned());
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Err(UseCaseError::MissingConfig(dir.display().to_string()));
        }
        let raw: RawConfig = serde_json::from_str(&fs::read_to_string(&path)?)?;

        let mut config = Self {
            name,
            exe: raw.exe.clone().unwrap_or_default(),
            args: raw.args.as_deref().map_or_else(Vec::new, |a| {
                a.split('|').map(|s| s.trim().to_string()).collect()
            }),
            mpi: split_ints(raw.mpi.as_deref()),
            threads: split_ints(raw.thd.as_deref()),
            colors: split_words(raw.color.as_deref()),
            markers: split_words(raw.marker.as_deref())
                .iter()
                .filter_map(|m| m.chars().next())
                .collect(),
            label: raw.label.clone(),
            log_ids: split_words(raw.log_id.as_deref()),
        };
        for (key, value) in [
            ("EXE", &raw.exe),
            ("ARGS", &raw.args),
            ("MPI", &raw.mpi),
            ("THD", &raw.thd),
            ("LOGID", &raw.log_id),
        ] {
            if let Some(value) = value {
                println!("Configuring {} with {key} = {value}", config.name);
            }
        }
        config.apply_defaults();
        config.check(for_plot)?;
        Ok(config)
    }

    /// Fill the defaulted dimensions: at least one single-threaded run,
    /// sequential (`n=-1`) when no MPI list is given, and a singleton ARGS
    /// broadcast to every run.
    fn apply_defaults(&mut self) {
        if self.threads.is_empty() && self.mpi.is_empty() {
            self.threads = vec![1];
        }
        if self.mpi.is_empty() {
            self.mpi = vec![-1; self.threads.len()];
        }
        if self.threads.is_empty() {
            self.threads = vec![1; self.mpi.len()];
        }
        if self.args.len() == 1 && self.mpi.len() > 1 {
            self.args = vec![self.args[0].clone(); self.mpi.len()];
        }
    }

    fn check(&self, for_plot: bool) -> Result<(), UseCaseError> {
        let mut faults = Vec::new();
        if self.exe.is_empty() {
            faults.push("EXE must be specified".to_string());
        }
        if self.mpi.len() != self.threads.len() {
            faults.push("number of MPI must equal number of THD".to_string());
        }
        if !self.args.is_empty() && self.mpi.len() != self.args.len() {
            faults.push("number of MPI must equal number of ARGS".to_string());
        }
        if for_plot {
            if self.colors.is_empty() || self.markers.is_empty() || self.label.is_none() {
                faults.push("missing COLOR or MARKER or LABEL (mandatory)".to_string());
            }
            if !self.colors.is_empty() && self.mpi.len() != self.colors.len() {
                faults.push("number of MPI must equal number of COLOR".to_string());
            }
            if !self.markers.is_empty() && self.mpi.len() != self.markers.len() {
                faults.push("number of MPI must equal number of MARKER".to_string());
            }
        }
        match faults.first() {
            None => Ok(()),
            Some(first) => {
                for fault in &faults {
                    println!("Configuring {} KO : {fault}", self.name);
                }
                Err(UseCaseError::InvalidConfig(first.clone()))
            }
        }
    }

    /// One planned run per configured `(MPI, threads)` pair, with the
    /// canonical `n=`/`t=` pairs naming its run directory and logs.
    #[must_use]
    pub fn plan_runs(&self) -> Vec<RunSpec> {
        let max = self.mpi.iter().copied().max().unwrap_or(1).max(1);
        self.mpi
            .iter()
            .zip(&self.threads)
            .enumerate()
            .map(|(idx, (&n, &t))| RunSpec {
                mpi: n,
                threads: t,
                args: self.args.get(idx).cloned().unwrap_or_default(),
                n_pair: RunToken::bounded("n", n, max).pair(),
                t_pair: RunToken::bounded("t", i64::from(t), max).pair(),
            })
            .collect()
    }
}

/// One planned use-case execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub mpi: i64,
    pub threads: u32,
    /// Argument string for this run, empty when the workload takes none.
    pub args: String,
    /// `n=XX` directory and log segment.
    pub n_pair: String,
    /// `t=YY` directory and log segment.
    pub t_pair: String,
}

impl RunSpec {
    /// Name of the per-configuration run directory.
    #[must_use]
    pub fn dir_name(&self) -> String {
        format!("{}.{}", self.n_pair, self.t_pair)
    }
}

fn split_words(value: Option<&str>) -> Vec<String> {
    value.map_or_else(Vec::new, |v| v.split_whitespace().map(str::to_string).collect())
}

fn split_ints<T: std::str::FromStr>(value: Option<&str>) -> Vec<T> {
    value.map_or_else(Vec::new, |v| {
        v.split_whitespace().filter_map(|n| n.parse().ok()).collect()
    })
}

/// The `perf stat` command-line prefix counting the given events.
#[must_use]
pub fn perf_stat_prefix(events: &[String]) -> Vec<String> {
    vec!["perf".to_string(), "stat".to_string(), "-e".to_string(), events.join(",")]
}

/// Whether the event column of a counter line names the wanted event.
/// perf sometimes drops the `:u` modifier in its report.
fn event_matches(logged: &str, wanted: &str) -> bool {
    logged == wanted || format!("{logged}:u") == wanted
}

fn scale_count(
    count: u64,
    event: &str,
    mappings: &[RegisterMapping],
    kind: BenchKind,
    factors: &ScaleFactors,
) -> u64 {
    match kind {
        BenchKind::BandwidthRate => count * factors.cache_line_bytes,
        BenchKind::ComputeRate => {
            for mapping in mappings {
                if !event_matches(&mapping.register, event)
                    && !event_matches(event, &mapping.register)
                {
                    continue;
                }
                let description = mapping.description.to_lowercase();
                if description.contains("packed") {
                    if description.contains("simd") {
                        return count * factors.flop_per_packed_simd;
                    }
                    if description.contains("sse") {
                        return count * factors.flop_per_packed_sse;
                    }
                }
                break;
            }
            count
        }
    }
}

/// Sum the counts of the given events out of one perf-stat capture.
///
/// Only lines after the `Performance counter stats` banner are counter
/// lines. Returns the accumulated scaled count and the `seconds time
/// elapsed` reading; either is zero when nothing matched.
#[must_use]
pub fn scrape_stat_log(
    text: &str,
    events: &[String],
    mappings: &[RegisterMapping],
    kind: BenchKind,
    factors: &ScaleFactors,
) -> (f64, f64) {
    let mut total = 0.0_f64;
    let mut elapsed = 0.0_f64;
    for event in events {
        let mut in_stats = false;
        let mut found = false;
        for line in text.lines() {
            if line.contains("Performance counter stats") {
                in_stats = true;
            }
            if !in_stats {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() >= 2 && event_matches(tokens[1], event) {
                if let Ok(count) = tokens[0].replace(',', "").parse::<u64>() {
                    total += scale_count(count, event, mappings, kind, factors) as f64;
                    found = true;
                }
            }
            if found && tokens.len() == 4 && tokens[1..] == ["seconds", "time", "elapsed"] {
                if let Ok(sec) = tokens[0].parse::<f64>() {
                    elapsed = sec;
                }
            }
        }
        if !found {
            debug!("Counter {event} not found in perf-stat capture");
        }
    }
    (total, elapsed)
}

/// Find the perf-stat log of one run directory: it starts with
/// `<name>.perf-stat.<n=XX.t=YY>` and contains every required identifier.
#[must_use]
pub fn find_stat_log(dir: &Path, name: &str, nt: &str, log_ids: &[String]) -> Option<PathBuf> {
    let prefix = format!("{name}.perf-stat.{nt}");
    let mut candidates: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(&prefix) && log_ids.iter().all(|id| n.contains(id.as_str())))
        .collect();
    candidates.sort();
    candidates.first().map(|n| dir.join(n))
}

/// Scrape every completed run of a use case into roofline samples.
///
/// Runs without a stat log, with zero counted flops or bytes, or with a
/// degenerate elapsed time are reported and skipped; they never fail the
/// analysis.
///
/// # Errors
/// Fails only when the use-case directory cannot be listed.
pub fn collect_samples(
    config: &UseCaseConfig,
    dir: &Path,
    compute_events: &[String],
    bandwidth_events: &[String],
    mappings: &[RegisterMapping],
    factors: &ScaleFactors,
) -> Result<Vec<UseCaseSample>, UseCaseError> {
    println!("Analysing {} statistics ...", config.name);
    let mut run_dirs: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("n=") && n.contains(".t="))
        .collect();
    run_dirs.sort();

    let mut samples = Vec::new();
    for (idx, nt) in run_dirs.iter().enumerate() {
        let Some((n, t)) = parse_nt(nt) else {
            continue;
        };
        print!("Analysing {} statistics for n = {n} and t = {t} ...", config.name);
        let scrape = ScrapeInputs { compute_events, bandwidth_events, mappings, factors };
        let Some(sample) = sample_one_run(config, &dir.join(nt), nt, idx, n, t, &scrape) else {
            continue;
        };
        println!(
            " OK : MB/s = {:11.3}, GFlops = {:11.3}, F/B = {:11.3}",
            sample.bandwidth_mbs(),
            sample.achieved_gflops(),
            sample.intensity()
        );
        samples.push(sample);
    }
    Ok(samples)
}

/// Events and scaling shared by every run of one analysis.
struct ScrapeInputs<'a> {
    compute_events: &'a [String],
    bandwidth_events: &'a [String],
    mappings: &'a [RegisterMapping],
    factors: &'a ScaleFactors,
}

fn sample_one_run(
    config: &UseCaseConfig,
    run_dir: &Path,
    nt: &str,
    idx: usize,
    n: i64,
    t: i64,
    scrape: &ScrapeInputs<'_>,
) -> Option<UseCaseSample> {
    let Some(log) = find_stat_log(run_dir, &config.name, nt, &config.log_ids) else {
        println!(" No result available, check logs");
        return None;
    };
    let Ok(text) = fs::read_to_string(&log) else {
        println!(" No result available, check logs");
        return None;
    };
    let (flops, elapsed) = scrape_stat_log(
        &text,
        scrape.compute_events,
        scrape.mappings,
        BenchKind::ComputeRate,
        scrape.factors,
    );
    let (bytes, _) = scrape_stat_log(
        &text,
        scrape.bandwidth_events,
        scrape.mappings,
        BenchKind::BandwidthRate,
        scrape.factors,
    );
    if flops <= 0.0 || bytes <= 0.0 {
        println!(" No result available, check logs");
        return None;
    }
    if elapsed.abs() < 1.0e-6 {
        println!(" KO");
        return None;
    }
    let mut label = config.label.clone().unwrap_or_else(|| config.name.clone());
    if n == -1 {
        label.push_str(", SEQ");
    } else {
        label.push_str(&format!(", {n} MPI"));
    }
    label.push_str(&format!(", {t} THD"));
    Some(UseCaseSample {
        flops,
        bytes,
        elapsed_sec: elapsed,
        color: config.colors.get(idx).cloned().unwrap_or_else(|| "magenta".to_string()),
        marker: config.markers.get(idx).copied().unwrap_or('.'),
        label,
    })
}

/// The `n` and `t` values of a `n=XX.t=YY` run directory name.
fn parse_nt(nt: &str) -> Option<(i64, i64)> {
    let (n_key, t_key) = nt.split_once('.')?;
    let n = n_key.strip_prefix("n=")?.parse().ok()?;
    let t = t_key.strip_prefix("t=")?.parse().ok()?;
    Some((n, t))
}
