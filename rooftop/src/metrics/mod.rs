//! Metric aggregation.
//!
//! Benchmark logs are rescanned from scratch every time metrics are
//! requested; nothing here is persisted. Scraped scalar observations fold
//! into a three-level [`MetricTable`] (primary key, secondary key, step
//! label) under a max-merge rule, so repeated, partial, or restarted scans
//! of the same log set are always safe. Global per-kind bests are tracked
//! separately by [`PeakTracker`] with the provenance of the record holder.

pub mod filter;
pub mod peaks;
pub mod table;

pub use filter::StepFilter;
pub use peaks::{BenchKind, PeakRecord, PeakTracker};
pub use table::{MetricTable, Observation};
