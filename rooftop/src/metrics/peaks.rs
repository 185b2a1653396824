//! Per-kind peak tracking with provenance.

use std::fmt;

/// The two benchmark metric kinds feeding the roofline model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BenchKind {
    /// Compute rate, reported in GFlop/s.
    ComputeRate,
    /// Memory bandwidth, reported in MB/s.
    BandwidthRate,
}

impl BenchKind {
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            BenchKind::ComputeRate => "GFlop/s",
            BenchKind::BandwidthRate => "MB/s",
        }
    }
}

impl fmt::Display for BenchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchKind::ComputeRate => write!(f, "compute"),
            BenchKind::BandwidthRate => write!(f, "bandwidth"),
        }
    }
}

/// Best value observed for one benchmark kind, with the attribution of
/// whichever observation currently holds the record. No history is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakRecord {
    pub value: f64,
    /// Log identifier the record came from.
    pub log: String,
    /// Free-form description of the winning configuration
    /// (e.g. `N = 35000, NB = 8`).
    pub extra: Option<String>,
}

/// Monotonic global reducer, one record per [`BenchKind`].
///
/// Rebuilt from scratch on every scan; updates only on strict improvement
/// so that rescans and out-of-order log visits converge to the same record.
#[derive(Debug, Clone, Default)]
pub struct PeakTracker {
    compute: Option<PeakRecord>,
    bandwidth: Option<PeakRecord>,
}

impl PeakTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: BenchKind) -> &mut Option<PeakRecord> {
        match kind {
            BenchKind::ComputeRate => &mut self.compute,
            BenchKind::BandwidthRate => &mut self.bandwidth,
        }
    }

    /// Update the record for `kind` on strict improvement only.
    /// Returns true when the record changed.
    pub fn track(&mut self, kind: BenchKind, value: f64, log: &str, extra: Option<&str>) -> bool {
        let slot = self.slot(kind);
        let improved = slot.as_ref().is_none_or(|record| value > record.value);
        if improved {
            *slot = Some(PeakRecord {
                value,
                log: log.to_string(),
                extra: extra.map(ToString::to_string),
            });
        }
        improved
    }

    #[must_use]
    pub fn peak(&self, kind: BenchKind) -> Option<&PeakRecord> {
        match kind {
            BenchKind::ComputeRate => self.compute.as_ref(),
            BenchKind::BandwidthRate => self.bandwidth.as_ref(),
        }
    }

    /// Record value for `kind`, or zero when that kind has never reported.
    #[must_use]
    pub fn peak_value(&self, kind: BenchKind) -> f64 {
        self.peak(kind).map_or(0.0, |record| record.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_keeps_best_attribution() {
        let mut peaks = PeakTracker::new();
        assert!(peaks.track(BenchKind::ComputeRate, 10.0, "log-a", None));
        assert!(peaks.track(BenchKind::ComputeRate, 25.0, "log-b", Some("N = 2")));
        assert!(!peaks.track(BenchKind::ComputeRate, 7.0, "log-c", None));

        let record = peaks.peak(BenchKind::ComputeRate).unwrap();
        assert!((record.value - 25.0).abs() < f64::EPSILON);
        assert_eq!(record.log, "log-b");
        assert_eq!(record.extra.as_deref(), Some("N = 2"));
    }

    #[test]
    fn test_equal_value_does_not_steal_the_record() {
        let mut peaks = PeakTracker::new();
        peaks.track(BenchKind::BandwidthRate, 5.0, "first", None);
        assert!(!peaks.track(BenchKind::BandwidthRate, 5.0, "second", None));
        assert_eq!(peaks.peak(BenchKind::BandwidthRate).unwrap().log, "first");
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut peaks = PeakTracker::new();
        peaks.track(BenchKind::ComputeRate, 100.0, "hpl", None);
        assert!(peaks.peak(BenchKind::BandwidthRate).is_none());
        assert!((peaks.peak_value(BenchKind::BandwidthRate)).abs() < f64::EPSILON);
        assert!((peaks.peak_value(BenchKind::ComputeRate) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unit_labels() {
        assert_eq!(BenchKind::ComputeRate.unit(), "GFlop/s");
        assert_eq!(BenchKind::BandwidthRate.unit(), "MB/s");
    }
}
