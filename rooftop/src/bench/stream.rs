//! STREAM memory-bandwidth family.
//!
//! A STREAM log carries the array size and, after the `Function` header,
//! one best-rate line per kernel:
//!
//! ```text
//! Array size = 10000000 (elements), Offset = 0 (elements)
//! Function    Best Rate MB/s  Avg time     Min time     Max time
//! Copy:           22139.1     0.007257     0.007227     0.007294
//! Scale:          21857.8     0.007329     0.007320     0.007342
//! Add:            24383.4     0.009858     0.009843     0.009876
//! Triad:          24305.9     0.009894     0.009873     0.009935
//! ```
//!
//! Rates reported as `inf` (a zero-time artifact of tiny sizes) are
//! dropped at extraction, the same way a missing pattern simply produces
//! no observation.

use crate::bench::BenchFamily;
use crate::metrics::{BenchKind, Observation};
use crate::runid;

/// The four STREAM kernels, in report order.
const STEPS: [&str; 4] = ["Copy", "Scale", "Add", "Triad"];

#[derive(Debug, Default)]
pub struct StreamFamily;

impl StreamFamily {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BenchFamily for StreamFamily {
    fn name(&self) -> &str {
        "stream"
    }

    fn kind(&self) -> BenchKind {
        BenchKind::BandwidthRate
    }

    /// Observations are keyed by array size (primary), kernel name
    /// (secondary) and the `n=XX.t=YY` configuration label (step).
    fn extract(&self, log_name: &str, text: &str) -> Vec<Observation> {
        let decoded = runid::decode(log_name);
        let step = match (decoded.pair("n"), decoded.pair("t")) {
            (Some(n), Some(t)) => format!("{n}.{t}"),
            _ => return Vec::new(), // Configuration unknown, nothing to key on
        };

        let mut observations = Vec::new();
        let mut array_size: Option<i64> = None;
        let mut in_table = false;
        for line in text.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() >= 4 && tokens[..3] == ["Array", "size", "="] {
                array_size = tokens[3].parse().ok();
                continue;
            }
            if array_size.is_some() && tokens.first() == Some(&"Function") {
                in_table = true;
                continue;
            }
            if !in_table || tokens.len() < 2 {
                continue;
            }
            for kernel in STEPS {
                if tokens[0] == format!("{kernel}:") && !tokens[1].eq_ignore_ascii_case("inf") {
                    if let (Some(size), Ok(rate)) = (array_size, tokens[1].parse::<f64>()) {
                        observations.push(Observation::new(
                            &size.to_string(),
                            kernel,
                            &step,
                            rate,
                        ));
                    }
                    break;
                }
            }
        }
        observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
STREAM version $Revision: 5.10 $
Array size = 10000000 (elements), Offset = 0 (elements)
Function    Best Rate MB/s  Avg time     Min time     Max time
Copy:           22139.1     0.007257     0.007227     0.007294
Scale:          21857.8     0.007329     0.007320     0.007342
Add:            24383.4     0.009858     0.009843     0.009876
Triad:          24305.9     0.009894     0.009873     0.009935
";

    #[test]
    fn test_extract_all_four_kernels() {
        let family = StreamFamily::new();
        let obs = family.extract("stream.size=10000000.n=01.t=04.log", LOG);
        assert_eq!(obs.len(), 4);
        assert_eq!(obs[0].primary, "10000000");
        assert_eq!(obs[0].secondary, "Copy");
        assert_eq!(obs[0].step, "n=01.t=04");
        assert!((obs[3].value - 24305.9).abs() < 1e-9);
    }

    #[test]
    fn test_rates_before_the_function_header_are_ignored() {
        let family = StreamFamily::new();
        let text = "Array size = 100 (elements)\nCopy: 999.9 0 0 0\n";
        assert!(family.extract("stream.n=01.t=01.log", text).is_empty());
    }

    #[test]
    fn test_inf_rate_is_dropped() {
        let family = StreamFamily::new();
        let text = "\
Array size = 100 (elements)
Function  Best Rate MB/s
Copy:     inf   0.0   0.0   0.0
Scale:    12.5  0.0   0.0   0.0
";
        let obs = family.extract("stream.n=01.t=01.log", text);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].secondary, "Scale");
    }

    #[test]
    fn test_unkeyed_log_yields_nothing() {
        let family = StreamFamily::new();
        assert!(family.extract("stream.log", LOG).is_empty());
    }

    #[test]
    fn test_peak_extra_names_size_and_kernel() {
        let family = StreamFamily::new();
        let obs = Observation::new("10000000", "Triad", "n=01.t=04", 24305.9);
        assert_eq!(family.peak_extra(&obs), "N = 10000000, step = Triad");
    }
}
