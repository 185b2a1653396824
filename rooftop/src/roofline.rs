//! Roofline model derivation and workload classification.
//!
//! Given the best compute rate and the best memory bandwidth measured by
//! the benchmark families, the model places the ridge point at
//! `(Pmax / Bmax, Pmax)` and classifies each measured workload sample by
//! its arithmetic intensity: below the ridge the workload is limited by
//! memory bandwidth, at or above it by compute throughput.
//!
//! The model is derived state. It is recomputed on demand from the peak
//! records and never persisted; requesting it before both peaks exist is a
//! normal occurrence during iterative tuning and yields `None`, not an
//! error.

// Extent arithmetic intentionally mixes sample counts into f64 scaling
#![allow(clippy::cast_precision_loss)]

use crate::metrics::{BenchKind, PeakTracker};

/// Flop per GFlop (decimal, as benchmark tools report GFlop/s).
pub const FLOPS_PER_GFLOP: f64 = 1_000_000_000.0;

/// Byte per MB (binary, as benchmark tools report MB/s).
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Whether a workload is limited by memory traffic or by compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    BandwidthBound,
    ComputeBound,
}

/// Where the bandwidth-bound and compute-bound regions meet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgePoint {
    /// Arithmetic intensity at the ridge, in Flop/Byte.
    pub intensity: f64,
    /// Peak compute rate, in GFlop/s.
    pub peak_gflops: f64,
}

/// One measured workload positioned on the roofline chart.
///
/// Plotted at `(flops / bytes, flops / elapsed_sec)`. The color, marker
/// and label fields are pass-through styling for the renderer.
#[derive(Debug, Clone)]
pub struct UseCaseSample {
    /// Counted floating-point operations (already scaled for packed ops).
    pub flops: f64,
    /// Counted bytes moved (cache misses times the cache line size).
    pub bytes: f64,
    pub elapsed_sec: f64,
    pub color: String,
    pub marker: char,
    pub label: String,
}

impl UseCaseSample {
    /// Arithmetic intensity, in Flop/Byte.
    #[must_use]
    pub fn intensity(&self) -> f64 {
        self.flops / self.bytes
    }

    /// Achieved compute rate, in GFlop/s.
    #[must_use]
    pub fn achieved_gflops(&self) -> f64 {
        self.flops / self.elapsed_sec / FLOPS_PER_GFLOP
    }

    /// Achieved bandwidth, in MB/s.
    #[must_use]
    pub fn bandwidth_mbs(&self) -> f64 {
        self.bytes / self.elapsed_sec / BYTES_PER_MB
    }
}

/// Roofline model derived from the two peak records.
#[derive(Debug, Clone, Copy)]
pub struct RooflineModel {
    peak_flops: f64,
    peak_bytes: f64,
}

impl RooflineModel {
    /// Build the model from raw rates (Flop/s and Byte/s).
    ///
    /// Returns `None` when either rate is non-positive: no successful
    /// benchmark run has reported yet, so the whole computation is skipped
    /// rather than producing a misleading chart.
    #[must_use]
    pub fn from_rates(flops_per_sec: f64, bytes_per_sec: f64) -> Option<Self> {
        if flops_per_sec <= 0.0 || bytes_per_sec <= 0.0 {
            return None;
        }
        Some(Self { peak_flops: flops_per_sec, peak_bytes: bytes_per_sec })
    }

    /// Build the model from benchmark-unit peaks (GFlop/s and MB/s).
    #[must_use]
    pub fn from_peaks(peak_gflops: f64, peak_mbs: f64) -> Option<Self> {
        Self::from_rates(peak_gflops * FLOPS_PER_GFLOP, peak_mbs * BYTES_PER_MB)
    }

    /// Build the model straight from the tracked peak records.
    #[must_use]
    pub fn from_tracker(peaks: &PeakTracker) -> Option<Self> {
        Self::from_peaks(
            peaks.peak_value(BenchKind::ComputeRate),
            peaks.peak_value(BenchKind::BandwidthRate),
        )
    }

    #[must_use]
    pub fn ridge(&self) -> RidgePoint {
        RidgePoint {
            intensity: self.peak_flops / self.peak_bytes,
            peak_gflops: self.peak_flops / FLOPS_PER_GFLOP,
        }
    }

    /// Peak bandwidth in MB/s, for annotation.
    #[must_use]
    pub fn peak_mbs(&self) -> f64 {
        self.peak_bytes / BYTES_PER_MB
    }

    /// Classify a sample: intensity below the ridge is bandwidth-bound,
    /// at or above it compute-bound.
    #[must_use]
    pub fn classify(&self, sample: &UseCaseSample) -> Bound {
        if sample.intensity() < self.ridge().intensity {
            Bound::BandwidthBound
        } else {
            Bound::ComputeBound
        }
    }

    /// Textual report of the ridge point and per-sample classification.
    #[must_use]
    pub fn report_lines(&self, samples: &[UseCaseSample]) -> Vec<String> {
        let ridge = self.ridge();
        let mut lines = vec![format!(
            "ridge point = ({:11.3} Flop/Byte, {:11.3} GFlop/s)",
            ridge.intensity, ridge.peak_gflops
        )];
        for sample in samples {
            let bound = match self.classify(sample) {
                Bound::BandwidthBound => "bandwidth-bound",
                Bound::ComputeBound => "compute-bound",
            };
            lines.push(format!(
                "{}: I = {:11.3} Flop/Byte, {:11.3} GFlop/s, {:11.3} MB/s, {:11.3} sec => {}",
                sample.label,
                sample.intensity(),
                sample.achieved_gflops(),
                sample.bandwidth_mbs(),
                sample.elapsed_sec,
                bound
            ));
        }
        lines
    }
}

/// User overrides for the computed chart extents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtentOverrides {
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub y_max: Option<f64>,
}

/// Chart extents handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotExtent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl PlotExtent {
    /// Default extent policy.
    ///
    /// Horizontal lower bound is `0.7 * min(0, sample intensities)` unless
    /// that falls at or beyond the ridge, in which case it clamps to zero.
    /// Horizontal upper bound is twice the ridge with no samples, else
    /// `1.3 * max(ridge, sample intensities)`. Vertical upper bound scales
    /// up with the number of plotted samples so annotations do not overlap.
    /// Every bound is individually overridable.
    #[must_use]
    pub fn for_samples(
        model: &RooflineModel,
        samples: &[UseCaseSample],
        overrides: ExtentOverrides,
    ) -> Self {
        let ridge = model.ridge();
        let intensities: Vec<f64> = samples.iter().map(UseCaseSample::intensity).collect();

        let mut x_min = intensities.iter().fold(0.0_f64, |acc, &i| acc.min(i)) * 0.7;
        if x_min >= ridge.intensity {
            x_min = 0.0;
        }
        let x_max = if intensities.is_empty() {
            2.0 * ridge.intensity
        } else {
            1.3 * intensities.iter().fold(ridge.intensity, |acc, &i| acc.max(i))
        };
        let y_max = (1.1 + samples.len() as f64 * 0.1) * ridge.peak_gflops;

        Self {
            x_min: overrides.x_min.unwrap_or(x_min),
            x_max: overrides.x_max.unwrap_or(x_max),
            y_max: overrides.y_max.unwrap_or(y_max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(flops: f64, bytes: f64, elapsed: f64) -> UseCaseSample {
        UseCaseSample {
            flops,
            bytes,
            elapsed_sec: elapsed,
            color: "magenta".to_string(),
            marker: '.',
            label: "uc".to_string(),
        }
    }

    #[test]
    fn test_ridge_point_from_raw_rates() {
        // Pmax = 100 GFlop/s, Bmax = 50 GB/s => I_ridge = 2.0, P_ridge = 100
        let model = RooflineModel::from_rates(100.0e9, 50.0e9).unwrap();
        let ridge = model.ridge();
        assert!((ridge.intensity - 2.0).abs() < 1e-12);
        assert!((ridge.peak_gflops - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_classification_against_the_ridge() {
        let model = RooflineModel::from_rates(100.0e9, 50.0e9).unwrap();
        // I = 1.0 < 2.0 => bandwidth-bound
        assert_eq!(model.classify(&sample(1.0e9, 1.0e9, 1.0)), Bound::BandwidthBound);
        // I = 3.0 >= 2.0 => compute-bound
        assert_eq!(model.classify(&sample(3.0e9, 1.0e9, 1.0)), Bound::ComputeBound);
    }

    #[test]
    fn test_missing_peak_skips_the_model() {
        assert!(RooflineModel::from_peaks(0.0, 50.0).is_none());
        assert!(RooflineModel::from_peaks(100.0, 0.0).is_none());
        assert!(RooflineModel::from_peaks(-1.0, 50.0).is_none());
    }

    #[test]
    fn test_from_peaks_applies_benchmark_units() {
        let model = RooflineModel::from_peaks(100.0, 51200.0).unwrap();
        let ridge = model.ridge();
        // 100e9 Flop/s over 51200 * 1024^2 Byte/s
        let expected = 100.0e9 / (51200.0 * 1024.0 * 1024.0);
        assert!((ridge.intensity - expected).abs() < 1e-9);
        assert!((model.peak_mbs() - 51200.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_plot_coordinates() {
        let s = sample(4.0e9, 2.0e9, 2.0);
        assert!((s.intensity() - 2.0).abs() < 1e-12);
        assert!((s.achieved_gflops() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_extent_defaults_without_samples() {
        let model = RooflineModel::from_rates(100.0e9, 50.0e9).unwrap();
        let extent = PlotExtent::for_samples(&model, &[], ExtentOverrides::default());
        assert!((extent.x_min).abs() < 1e-12);
        assert!((extent.x_max - 4.0).abs() < 1e-12); // 2 * ridge
        assert!((extent.y_max - 110.0).abs() < 1e-9); // 1.1 * P_ridge
    }

    #[test]
    fn test_extent_stretches_to_cover_samples() {
        let model = RooflineModel::from_rates(100.0e9, 50.0e9).unwrap();
        let samples = vec![sample(6.0e9, 1.0e9, 1.0)]; // I = 6.0 beyond the ridge
        let extent = PlotExtent::for_samples(&model, &samples, ExtentOverrides::default());
        assert!((extent.x_max - 7.8).abs() < 1e-9); // 1.3 * 6.0
        assert!((extent.y_max - 120.0).abs() < 1e-9); // (1.1 + 0.1) * 100
    }

    #[test]
    fn test_extent_overrides_win() {
        let model = RooflineModel::from_rates(100.0e9, 50.0e9).unwrap();
        let overrides =
            ExtentOverrides { x_min: Some(0.5), x_max: Some(10.0), y_max: Some(500.0) };
        let extent = PlotExtent::for_samples(&model, &[], overrides);
        assert_eq!(extent, PlotExtent { x_min: 0.5, x_max: 10.0, y_max: 500.0 });
    }

    #[test]
    fn test_report_names_the_bound() {
        let model = RooflineModel::from_rates(100.0e9, 50.0e9).unwrap();
        let lines = model.report_lines(&[sample(1.0e9, 1.0e9, 1.0)]);
        assert!(lines[0].contains("ridge point"));
        assert!(lines[1].contains("bandwidth-bound"));
    }
}
