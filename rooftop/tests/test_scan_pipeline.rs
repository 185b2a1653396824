use rooftop::bench::BenchRegistry;
use rooftop::metrics::{BenchKind, PeakTracker, StepFilter};
use rooftop::roofline::{ExtentOverrides, PlotExtent, RooflineModel};

const STREAM_LOG: &str = "\
STREAM version $Revision: 5.10 $
Array size = 10000000 (elements), Offset = 0 (elements)
Function    Best Rate MB/s  Avg time     Min time     Max time
Copy:           22139.1     0.007257     0.007227     0.007294
Scale:          21857.8     0.007329     0.007320     0.007342
Add:            24383.4     0.009858     0.009843     0.009876
Triad:          24305.9     0.009894     0.009873     0.009935
";

const HPL_LOG: &str = "\
T/V                N    NB     P     Q               Time                 Gflops
--------------------------------------------------------------------------------
WR11C2R4       35000   128     4     4             123.45              2.315e+02
WR11C2R4       35000   192     4     4             110.02              2.598e+02
";

#[test]
fn test_logs_to_roofline_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("stream.size=10000000.n=01.t=04.log"), STREAM_LOG)
        .expect("write stream log");
    std::fs::write(dir.path().join("HPL.size=35000.n=16.t=01.log"), HPL_LOG)
        .expect("write hpl log");

    let registry = BenchRegistry::standard();
    let mut peaks = PeakTracker::new();
    let tables = registry
        .scan(dir.path(), &StepFilter::default(), &mut peaks)
        .expect("scan");

    // Both families produced tables keyed the canonical way
    assert_eq!(tables["stream"].get("10000000", "Add", "n=01.t=04"), Some(24383.4));
    assert_eq!(tables["HPL"].get("35000", "192", "n=16.t=01"), Some(259.8));

    // Peaks carry the producing log
    let bw = peaks.peak(BenchKind::BandwidthRate).expect("bandwidth peak");
    assert_eq!(bw.log, "stream.size=10000000.n=01.t=04.log");
    assert!((bw.value - 24383.4).abs() < 1e-9);
    let gf = peaks.peak(BenchKind::ComputeRate).expect("compute peak");
    assert!((gf.value - 259.8).abs() < 1e-9);

    // The model derives from the tracked peaks
    let model = RooflineModel::from_tracker(&peaks).expect("model");
    let ridge = model.ridge();
    let expected_intensity = (259.8 * 1.0e9) / (24383.4 * 1024.0 * 1024.0);
    assert!((ridge.intensity - expected_intensity).abs() < 1e-9);
    assert!((ridge.peak_gflops - 259.8).abs() < 1e-9);

    let extent = PlotExtent::for_samples(&model, &[], ExtentOverrides::default());
    assert!((extent.x_max - 2.0 * ridge.intensity).abs() < 1e-9);
}

#[test]
fn test_filter_narrows_the_scan() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("HPL.size=35000.n=16.t=01.log"), HPL_LOG)
        .expect("write hpl log");
    let slow = HPL_LOG.replace("2.598e+02", "9.999e+02");
    std::fs::write(dir.path().join("HPL.size=35000.n=01.t=01.log"), slow)
        .expect("write hpl log");

    let registry = BenchRegistry::standard();

    // Unfiltered, the n=01 run owns the peak
    let mut peaks = PeakTracker::new();
    registry.scan(dir.path(), &StepFilter::default(), &mut peaks).expect("scan");
    assert!((peaks.peak_value(BenchKind::ComputeRate) - 999.9).abs() < 1e-9);

    // Excluding it restores the n=16 peak
    let filter = StepFilter::new(&[], &["n=01".to_string()]);
    let mut peaks = PeakTracker::new();
    registry.scan(dir.path(), &filter, &mut peaks).expect("scan");
    assert!((peaks.peak_value(BenchKind::ComputeRate) - 259.8).abs() < 1e-9);
}

#[test]
fn test_no_logs_means_no_model() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = BenchRegistry::standard();
    let mut peaks = PeakTracker::new();
    registry.scan(dir.path(), &StepFilter::default(), &mut peaks).expect("scan");
    assert!(RooflineModel::from_tracker(&peaks).is_none());
}
