//! Dense three-level metric table with monotonic max-merge.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One pre-extracted scalar measurement.
///
/// Extraction of the scalar from a family-specific text format is the
/// job of a [`crate::bench::BenchFamily`]; by the time an observation
/// reaches the table it is already `(primary, secondary, step) -> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Outer dimension, e.g. the problem size.
    pub primary: String,
    /// Inner dimension, e.g. the block size or the operation name.
    pub secondary: String,
    /// Innermost dimension, e.g. the `n=01.t=04` configuration label.
    pub step: String,
    pub value: f64,
}

impl Observation {
    pub fn new(primary: &str, secondary: &str, step: &str, value: f64) -> Self {
        Self {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            step: step.to_string(),
            value,
        }
    }
}

/// `primary -> secondary -> step -> value`, max-merged.
///
/// BTreeMaps keep iteration (and the serialized shape handed to the
/// renderer) deterministic. Once set, a cell only ever increases; once
/// densified, absent cells are literal zeros.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricTable {
    cells: BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>,
}

impl MetricTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one observation: `cell = max(existing, value)`.
    ///
    /// Returns true when the stored value was raised. Re-ingesting an
    /// identical observation is a no-op and a strictly smaller value never
    /// lowers a cell.
    pub fn ingest(&mut self, obs: &Observation) -> bool {
        let cell = self
            .cells
            .entry(obs.primary.clone())
            .or_default()
            .entry(obs.secondary.clone())
            .or_default()
            .entry(obs.step.clone())
            .or_insert(f64::NEG_INFINITY);
        if obs.value > *cell {
            *cell = obs.value;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn get(&self, primary: &str, secondary: &str, step: &str) -> Option<f64> {
        self.cells.get(primary)?.get(secondary)?.get(step).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of populated cells across all levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.values().flat_map(BTreeMap::values).map(BTreeMap::len).sum()
    }

    pub fn primaries(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Every distinct step label present in the table, sorted.
    #[must_use]
    pub fn step_labels(&self) -> BTreeSet<String> {
        self.cells
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::keys)
            .cloned()
            .collect()
    }

    /// Every distinct secondary key present in the table, sorted.
    #[must_use]
    pub fn secondary_keys(&self) -> BTreeSet<String> {
        self.cells.values().flat_map(BTreeMap::keys).cloned().collect()
    }

    /// Distinct step labels containing `needle`, sorted.
    #[must_use]
    pub fn steps_matching(&self, needle: &str) -> Vec<String> {
        self.step_labels().into_iter().filter(|s| s.contains(needle)).collect()
    }

    /// Ensure every primary key already present carries every declared
    /// `(secondary, step)` cell, defaulting missing ones to zero.
    ///
    /// Plotting needs a complete rectangular grid even though some
    /// combinations are legitimately never observed (unsupported hardware
    /// event, skipped configuration tier).
    pub fn densify<S: AsRef<str>>(&mut self, secondaries: &[S], steps: &[S]) {
        for by_secondary in self.cells.values_mut() {
            for secondary in secondaries {
                let by_step = by_secondary.entry(secondary.as_ref().to_string()).or_default();
                for step in steps {
                    by_step.entry(step.as_ref().to_string()).or_insert(0.0);
                }
            }
        }
    }

    /// Largest cell value with its coordinates, for annotation and
    /// reporting. None when the table is empty.
    #[must_use]
    pub fn maximum(&self) -> Option<(&str, &str, &str, f64)> {
        let mut best: Option<(&str, &str, &str, f64)> = None;
        for (primary, by_secondary) in &self.cells {
            for (secondary, by_step) in by_secondary {
                for (step, &value) in by_step {
                    if best.is_none_or(|(_, _, _, b)| value > b) {
                        best = Some((primary, secondary, step, value));
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_is_monotonic() {
        let mut table = MetricTable::new();
        assert!(table.ingest(&Observation::new("p", "s", "step", 10.0)));
        assert!(!table.ingest(&Observation::new("p", "s", "step", 7.0)));
        assert_eq!(table.get("p", "s", "step"), Some(10.0));
        assert!(table.ingest(&Observation::new("p", "s", "step", 25.0)));
        assert_eq!(table.get("p", "s", "step"), Some(25.0));
        // Re-ingesting the record value is a no-op
        assert!(!table.ingest(&Observation::new("p", "s", "step", 25.0)));
        assert_eq!(table.get("p", "s", "step"), Some(25.0));
    }

    #[test]
    fn test_densify_completes_the_grid() {
        let mut table = MetricTable::new();
        table.ingest(&Observation::new("p1", "A", "x", 1.0));
        table.ingest(&Observation::new("p2", "B", "y", 2.0));
        assert_eq!(table.secondary_keys().len(), 2);
        table.densify(&["A", "B"], &["x", "y"]);

        for primary in ["p1", "p2"] {
            for secondary in ["A", "B"] {
                for step in ["x", "y"] {
                    assert!(table.get(primary, secondary, step).is_some());
                }
            }
        }
        assert_eq!(table.len(), 8);
        assert_eq!(table.get("p1", "A", "x"), Some(1.0));
        assert_eq!(table.get("p1", "B", "y"), Some(0.0));
        assert_eq!(table.get("p2", "A", "x"), Some(0.0));
    }

    #[test]
    fn test_densify_does_not_invent_primaries() {
        let mut table = MetricTable::new();
        table.ingest(&Observation::new("p1", "A", "x", 1.0));
        table.densify(&["A"], &["x", "y"]);
        assert_eq!(table.primaries().count(), 1);
    }

    #[test]
    fn test_steps_matching_collects_distinct_labels() {
        let mut table = MetricTable::new();
        table.ingest(&Observation::new("p1", "A", "n=1.read", 1.0));
        table.ingest(&Observation::new("p2", "B", "n=1.read", 2.0));
        table.ingest(&Observation::new("p1", "A", "n=2.write", 3.0));
        assert_eq!(table.steps_matching("read"), vec!["n=1.read".to_string()]);
        assert_eq!(table.steps_matching("n=").len(), 2);
    }

    #[test]
    fn test_maximum_reports_coordinates() {
        let mut table = MetricTable::new();
        table.ingest(&Observation::new("p1", "A", "x", 3.0));
        table.ingest(&Observation::new("p2", "B", "y", 9.0));
        let (primary, secondary, step, value) = table.maximum().unwrap();
        assert_eq!((primary, secondary, step), ("p2", "B", "y"));
        assert!((value - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_table_has_no_maximum() {
        assert!(MetricTable::new().maximum().is_none());
        assert!(MetricTable::new().is_empty());
    }

    #[test]
    fn test_serialized_shape_is_nested_maps() {
        let mut table = MetricTable::new();
        table.ingest(&Observation::new("p", "s", "step", 1.5));
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["cells"]["p"]["s"]["step"], 1.5);
    }
}
