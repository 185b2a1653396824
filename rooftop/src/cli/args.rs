//! CLI argument definitions

use crate::metrics::StepFilter;
use crate::roofline::ExtentOverrides;
use crate::usecase::ScaleFactors;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rooftop",
    about = "Place measured workloads on the machine roofline",
    after_help = "\
EXAMPLES:
    rooftop --report                             Analyse benchmark logs in .
    rooftop --report --exclude n=01              Skip single-process runs
    rooftop --stat --use-case ./pfa --gf-event FP_ARITH_INST_RETIRED \\
            --cm-event cache-misses              Count a use case under perf"
)]
pub struct Args {
    /// Directory holding the benchmark run logs
    #[arg(short = 'd', long, default_value = ".", value_name = "DIR")]
    pub results: PathBuf,

    /// Analyse completed runs and report the roofline
    #[arg(short, long)]
    pub report: bool,

    /// Run the configured use cases under perf stat
    #[arg(short, long)]
    pub stat: bool,

    /// Use-case directory (repeatable); each must hold a usc.json
    #[arg(short, long, value_name = "DIR")]
    pub use_case: Vec<PathBuf>,

    /// Re-run even when a log of the run already exists
    #[arg(short, long)]
    pub force: bool,

    /// Only consider runs whose identifier contains every one of these
    #[arg(long, value_name = "SUBSTR")]
    pub include: Vec<String>,

    /// Skip runs whose identifier contains any of these
    #[arg(long, value_name = "SUBSTR")]
    pub exclude: Vec<String>,

    /// Extra identifier segment every use-case log must carry
    #[arg(long = "log-id", value_name = "ID")]
    pub log_ids: Vec<String>,

    /// Floating-point counter event, EVT or EVT:MASK (repeatable)
    #[arg(long = "gf-event", value_name = "EVT[:MASK]")]
    pub gf_events: Vec<String>,

    /// Memory-traffic counter event, EVT or EVT:MASK (repeatable)
    #[arg(long = "cm-event", value_name = "EVT[:MASK]")]
    pub cm_events: Vec<String>,

    /// Event descriptor dump (libpfm4 showevtinfo output)
    #[arg(long, value_name = "FILE")]
    pub event_dump: Option<PathBuf>,

    /// Event checking tool (libpfm4 check_events binary)
    #[arg(long, value_name = "BIN")]
    pub check_events: Option<PathBuf>,

    /// Cache line size scaling memory-traffic counts to bytes
    #[arg(long, default_value = "64", value_name = "BYTES")]
    pub cache_line_bytes: u64,

    /// Flops counted per packed SIMD instruction
    #[arg(long, default_value = "1", value_name = "N")]
    pub flop_per_packed_simd: u64,

    /// Flops counted per packed SSE instruction
    #[arg(long, default_value = "1", value_name = "N")]
    pub flop_per_packed_sse: u64,

    /// Chart lower intensity bound override
    #[arg(long, value_name = "FLOP/BYTE")]
    pub rlm_x_min: Option<f64>,

    /// Chart upper intensity bound override
    #[arg(long, value_name = "FLOP/BYTE")]
    pub rlm_x_max: Option<f64>,

    /// Chart upper rate bound override
    #[arg(long, value_name = "GFLOPS")]
    pub rlm_y_max: Option<f64>,

    /// Sample memory and CPU usage of use-case runs
    #[arg(short, long)]
    pub watch: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    #[must_use]
    pub fn step_filter(&self) -> StepFilter {
        StepFilter::new(&self.include, &self.exclude)
    }

    #[must_use]
    pub fn extent_overrides(&self) -> ExtentOverrides {
        ExtentOverrides { x_min: self.rlm_x_min, x_max: self.rlm_x_max, y_max: self.rlm_y_max }
    }

    #[must_use]
    pub fn scale_factors(&self) -> ScaleFactors {
        ScaleFactors {
            flop_per_packed_simd: self.flop_per_packed_simd,
            flop_per_packed_sse: self.flop_per_packed_sse,
            cache_line_bytes: self.cache_line_bytes,
        }
    }
}
