//! HPLinpack compute-rate family.
//!
//! HPL prints one seven-column result row per tried decomposition:
//!
//! ```text
//! T/V                N    NB     P     Q               Time                 Gflops
//! --------------------------------------------------------------------------------
//! WR11C2R4       35000   128     4     4             123.45              2.315e+02
//! ```
//!
//! Only `W`-prefixed rows are results; everything else in the log is
//! configuration echo and residual checks.

use crate::bench::BenchFamily;
use crate::metrics::{BenchKind, Observation};
use crate::runid;

#[derive(Debug, Default)]
pub struct LinpackFamily;

impl LinpackFamily {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BenchFamily for LinpackFamily {
    fn name(&self) -> &str {
        "HPL"
    }

    fn kind(&self) -> BenchKind {
        BenchKind::ComputeRate
    }

    /// Observations are keyed by problem size N (primary), block size NB
    /// (secondary) and the `n=XX.t=YY` configuration label (step).
    fn extract(&self, log_name: &str, text: &str) -> Vec<Observation> {
        let decoded = runid::decode(log_name);
        let step = match (decoded.pair("n"), decoded.pair("t")) {
            (Some(n), Some(t)) => format!("{n}.{t}"),
            _ => return Vec::new(),
        };

        let mut observations = Vec::new();
        for line in text.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 7 || !tokens[0].starts_with('W') {
                continue;
            }
            let (Ok(n), Ok(nb), Ok(gflops)) =
                (tokens[1].parse::<i64>(), tokens[2].parse::<i64>(), tokens[6].parse::<f64>())
            else {
                continue;
            };
            observations.push(Observation::new(&n.to_string(), &nb.to_string(), &step, gflops));
        }
        observations
    }

    fn peak_extra(&self, obs: &Observation) -> String {
        format!("N = {}, NB = {}", obs.primary, obs.secondary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
T/V                N    NB     P     Q               Time                 Gflops
--------------------------------------------------------------------------------
WR11C2R4       35000   128     4     4             123.45              2.315e+02
WR11C2R4       35000   192     4     4             110.02              2.598e+02
||Ax-b||_oo/(eps*(||A||_oo*||x||_oo+||b||_oo)*N)=        0.0031242 ...... PASSED
";

    #[test]
    fn test_extract_result_rows() {
        let family = LinpackFamily::new();
        let obs = family.extract("HPL.size=35000.div=0128.block=05.n=16.t=01.log", LOG);
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].primary, "35000");
        assert_eq!(obs[0].secondary, "128");
        assert_eq!(obs[0].step, "n=16.t=01");
        assert!((obs[1].value - 259.8).abs() < 1e-9);
    }

    #[test]
    fn test_non_result_rows_are_ignored() {
        let family = LinpackFamily::new();
        let text = "T/V N NB P Q Time Gflops\nsome other line\n";
        assert!(family.extract("HPL.n=01.t=01.log", text).is_empty());
    }

    #[test]
    fn test_peak_extra_names_the_decomposition() {
        let family = LinpackFamily::new();
        let obs = Observation::new("35000", "192", "n=16.t=01", 259.8);
        assert_eq!(family.peak_extra(&obs), "N = 35000, NB = 192");
    }
}
