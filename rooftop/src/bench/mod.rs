//! Benchmark families and the scan registry.
//!
//! Each third-party benchmark is represented by one [`BenchFamily`]
//! implementation: a small capability set (name, metric kind, log prefix,
//! scalar extraction) with no inheritance between families. The
//! [`BenchRegistry`] composes the configured families and drives the log
//! scan; the codec, aggregator and roofline layers never see a family's
//! quirks.
//!
//! Downloading, patching and building the benchmark source trees is out of
//! scope here; families only consume the raw captured text of runs that
//! already happened.

pub mod linpack;
pub mod stream;

use crate::metrics::{BenchKind, MetricTable, Observation, PeakTracker, StepFilter};
use log::warn;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub use linpack::LinpackFamily;
pub use stream::StreamFamily;

/// Capability set of one benchmark family.
pub trait BenchFamily {
    /// Family name, also the root of its run identifiers.
    fn name(&self) -> &str;

    /// Which roofline input this family measures.
    fn kind(&self) -> BenchKind;

    /// Scrape every scalar observation out of one captured log.
    ///
    /// `log_name` is the run identifier (decoded for the configuration
    /// dimensions); `text` is the raw captured output. A log that yields
    /// nothing is an expected steady state, not an error.
    fn extract(&self, log_name: &str, text: &str) -> Vec<Observation>;

    /// Attribution line for an observation that takes the peak record.
    fn peak_extra(&self, obs: &Observation) -> String {
        format!("N = {}, step = {}", obs.primary, obs.secondary)
    }
}

/// Ordered collection of configured benchmark families.
#[derive(Default)]
pub struct BenchRegistry {
    families: Vec<Box<dyn BenchFamily>>,
}

impl BenchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in families: stream (bandwidth) and linpack (compute).
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(StreamFamily::new()));
        registry.register(Box::new(LinpackFamily::new()));
        registry
    }

    pub fn register(&mut self, family: Box<dyn BenchFamily>) {
        self.families.push(family);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Scan a log directory with every family, folding observations into
    /// per-family tables and the shared peak tracker.
    ///
    /// Prints one analysis status line per family. Logs failing the name
    /// filter are not even opened; unreadable logs are skipped with a
    /// diagnostic.
    ///
    /// # Errors
    /// Fails only when the directory itself cannot be listed.
    pub fn scan(
        &self,
        dir: &Path,
        filter: &StepFilter,
        peaks: &mut PeakTracker,
    ) -> std::io::Result<BTreeMap<String, MetricTable>> {
        let mut logs: Vec<String> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".log"))
            .collect();
        logs.sort();

        let mut tables = BTreeMap::new();
        for family in &self.families {
            let table = scan_family(family.as_ref(), dir, &logs, filter, peaks);
            print_family_status(family.as_ref(), &table, peaks);
            tables.insert(family.name().to_string(), table);
        }
        Ok(tables)
    }
}

fn scan_family(
    family: &dyn BenchFamily,
    dir: &Path,
    logs: &[String],
    filter: &StepFilter,
    peaks: &mut PeakTracker,
) -> MetricTable {
    let prefix = format!("{}.", family.name());
    let mut table = MetricTable::new();
    for log_name in logs {
        if !log_name.starts_with(&prefix) || !filter.matches(log_name) {
            continue;
        }
        let text = match fs::read_to_string(dir.join(log_name)) {
            Ok(text) => text,
            Err(err) => {
                warn!("Can not read {log_name}, skip it ({err})");
                continue;
            }
        };
        for obs in family.extract(log_name, &text) {
            peaks.track(family.kind(), obs.value, log_name, Some(&family.peak_extra(&obs)));
            table.ingest(&obs);
        }
    }
    table
}

fn print_family_status(family: &dyn BenchFamily, table: &MetricTable, peaks: &PeakTracker) {
    if table.is_empty() {
        println!("Analysing {:>9}: benchmark has not been run", family.name());
        return;
    }
    if let Some(record) = peaks.peak(family.kind()) {
        println!(
            "Analysing {:>9}: maximum = {:11.3} {:>7}, {}",
            family.name(),
            record.value,
            family.kind().unit(),
            record.log
        );
        if let Some(ref extra) = record.extra {
            println!("{:>51} {extra}", " ");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneShotFamily;

    impl BenchFamily for OneShotFamily {
        fn name(&self) -> &str {
            "oneshot"
        }
        fn kind(&self) -> BenchKind {
            BenchKind::ComputeRate
        }
        fn extract(&self, _log_name: &str, text: &str) -> Vec<Observation> {
            text.lines()
                .filter_map(|line| line.strip_prefix("value "))
                .filter_map(|v| v.parse().ok())
                .map(|value| Observation::new("p", "s", "step", value))
                .collect()
        }
    }

    #[test]
    fn test_scan_feeds_tables_and_peaks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("oneshot.n=01.log"), "value 10\nvalue 25\n").unwrap();
        std::fs::write(dir.path().join("other.n=01.log"), "value 99\n").unwrap();

        let mut registry = BenchRegistry::new();
        registry.register(Box::new(OneShotFamily));
        let mut peaks = PeakTracker::new();
        let tables = registry.scan(dir.path(), &StepFilter::default(), &mut peaks).unwrap();

        let table = &tables["oneshot"];
        assert_eq!(table.get("p", "s", "step"), Some(25.0));
        // The foreign log is never attributed to this family
        let record = peaks.peak(BenchKind::ComputeRate).unwrap();
        assert_eq!(record.log, "oneshot.n=01.log");
        assert!((record.value - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scan_applies_the_log_name_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("oneshot.n=01.log"), "value 10\n").unwrap();
        std::fs::write(dir.path().join("oneshot.n=02.log"), "value 90\n").unwrap();

        let mut registry = BenchRegistry::new();
        registry.register(Box::new(OneShotFamily));
        let filter = StepFilter::new(&[], &["n=02".to_string()]);
        let mut peaks = PeakTracker::new();
        registry.scan(dir.path(), &filter, &mut peaks).unwrap();

        assert!((peaks.peak_value(BenchKind::ComputeRate) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scan_with_no_logs_reports_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = BenchRegistry::new();
        registry.register(Box::new(OneShotFamily));
        let mut peaks = PeakTracker::new();
        let tables = registry.scan(dir.path(), &StepFilter::default(), &mut peaks).unwrap();
        assert!(tables["oneshot"].is_empty());
        assert!(peaks.peak(BenchKind::ComputeRate).is_none());
    }
}
