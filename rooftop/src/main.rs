//! # rooftop - Main Entry Point
//!
//! Supports two operational modes, combinable in one invocation:
//! - **Stat** (`--stat --use-case DIR`): run each configured use case under
//!   `perf stat` with the resolved counter events
//! - **Report** (`--report`): scan completed benchmark and use-case logs
//!   and print the roofline placement

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use rooftop::bench::BenchRegistry;
use rooftop::cli::Args;
use rooftop::events::{
    self, CheckEventsTool, EventChecker, EventDump, EventQuery, RegisterMapping,
};
use rooftop::metrics::PeakTracker;
use rooftop::monitor::{self, Monitor};
use rooftop::preflight::run_preflight_checks;
use rooftop::roofline::{PlotExtent, RooflineModel, UseCaseSample};
use rooftop::runner;
use rooftop::usecase::{self, RunSpec, UseCaseConfig};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

#[tokio::main]
async fn main() {
    env_logger::init();
    std::process::exit(match run(Args::parse()).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("paranoid") {
        EXIT_NOPERM
    } else if msg.contains("missing mode") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

async fn run(args: Args) -> Result<()> {
    if !args.report && !args.stat {
        bail!(
            "Missing mode: --report and/or --stat\n\n\
             Run 'rooftop --help' for more options"
        );
    }

    let counting = CountingEvents::resolve(&args)?;
    let use_cases = load_use_cases(&args)?;

    if args.stat {
        run_preflight_checks(args.check_events.as_deref())?;
        if counting.is_empty() {
            bail!(
                "No counter events configured.\n\n\
                 Declare at least one --gf-event and one --cm-event."
            );
        }
        for (dir, config) in &use_cases {
            measure_use_case(&args, dir, config, &counting).await?;
        }
    }

    if args.report {
        report(&args, &counting, &use_cases)?;
    }
    Ok(())
}

/// Load every `--use-case` configuration exactly once; the stat runs and
/// the report consume the same loaded set.
fn load_use_cases(args: &Args) -> Result<Vec<(PathBuf, UseCaseConfig)>> {
    let mut out = Vec::new();
    for dir in &args.use_case {
        out.push((dir.clone(), UseCaseConfig::load(dir, args.report)?));
    }
    Ok(out)
}

/// The counter events of one session, split by the roofline axis they feed.
///
/// Symbolic events found in the descriptor dump are replaced by their
/// resolved registers; anything else passes through as a raw profiler event
/// name. Every entry carries the `:u` user-space modifier.
struct CountingEvents {
    compute: Vec<String>,
    bandwidth: Vec<String>,
    mappings: Vec<RegisterMapping>,
}

impl CountingEvents {
    fn resolve(args: &Args) -> Result<Self> {
        let resolver = match (&args.event_dump, &args.check_events) {
            (Some(dump_path), Some(tool)) => {
                let text = fs::read_to_string(dump_path).with_context(|| {
                    format!("Failed to read event dump {}", dump_path.display())
                })?;
                let dump = EventDump::parse(&text);
                info!("Loaded {} event descriptors from {}", dump.len(), dump_path.display());
                Some((dump, CheckEventsTool::new(tool)))
            }
            (None, None) => None,
            _ => bail!("--event-dump and --check-events must be given together"),
        };

        let mut mappings = Vec::new();
        let compute = resolve_list(&args.gf_events, resolver.as_ref(), &mut mappings);
        let bandwidth = resolve_list(&args.cm_events, resolver.as_ref(), &mut mappings);
        for mapping in &mappings {
            debug!("Resolved {} as {}", mapping.query(), mapping.register);
        }
        Ok(Self { compute, bandwidth, mappings })
    }

    fn is_empty(&self) -> bool {
        self.compute.is_empty() || self.bandwidth.is_empty()
    }
}

fn resolve_list(
    raw: &[String],
    resolver: Option<&(EventDump, CheckEventsTool)>,
    mappings: &mut Vec<RegisterMapping>,
) -> Vec<String> {
    let mut out = Vec::new();
    for entry in raw {
        let query = EventQuery::parse(entry);
        if let Some((dump, checker)) = resolver {
            if dump.find(&query.event).is_some() {
                let resolved =
                    events::resolve(dump, std::slice::from_ref(&query), checker as &dyn EventChecker);
                for mapping in resolved {
                    out.push(mapping.register.clone());
                    mappings.push(mapping);
                }
                continue;
            }
        }
        out.push(entry.clone());
    }
    events::with_user_modifier(&mut out);
    out
}

/// Run every configured `(MPI, threads)` pair of one use case under
/// `perf stat`, one `n=XX.t=YY` run directory per pair.
async fn measure_use_case(
    args: &Args,
    dir: &Path,
    config: &UseCaseConfig,
    counting: &CountingEvents,
) -> Result<()> {
    let uc_dir = fs::canonicalize(dir)
        .with_context(|| format!("Use-case directory {} not found", dir.display()))?;

    let mut log_ids = config.log_ids.clone();
    log_ids.extend(args.log_ids.iter().cloned());
    let events: Vec<String> =
        counting.compute.iter().chain(&counting.bandwidth).cloned().collect();
    let monitor = Monitor::new(args.watch);

    for spec in config.plan_runs() {
        let run_dir = uc_dir.join(spec.dir_name());
        fs::create_dir_all(&run_dir)?;

        let mut log_name = format!("{}.perf-stat.{}", config.name, spec.dir_name());
        for id in &log_ids {
            log_name.push('.');
            log_name.push_str(id);
        }
        log_name.push_str(".log");
        let log_path = run_dir.join(&log_name);
        if !runner::should_run(&log_path, args.force) {
            info!("{log_name} exists, skip the run");
            continue;
        }

        let mut cmd_line = usecase::perf_stat_prefix(&events);
        if spec.mpi != -1 {
            cmd_line.extend(["mpirun".to_string(), "-n".to_string(), spec.mpi.to_string()]);
        }
        cmd_line.push(uc_dir.join(&config.exe).display().to_string());
        cmd_line.extend(spec.args.split_whitespace().map(str::to_string));

        print!("Running {} for {} ...", config.name, spec.dir_name());
        if let Err(err) =
            run_monitored(&cmd_line, &log_path, &run_dir, &config.name, &spec, &monitor).await
        {
            warn!("Run {} failed ({err})", spec.dir_name());
        }
    }
    Ok(())
}

/// Spawn one command with its output captured in the run log, polling it
/// until exit so memory and CPU histories can be sampled.
async fn run_monitored(
    cmd_line: &[String],
    log_path: &Path,
    run_dir: &Path,
    root: &str,
    spec: &RunSpec,
    monitor: &Monitor,
) -> Result<()> {
    let start = Instant::now();
    let mut log = fs::File::create(log_path)?;
    writeln!(log, "\n~> {}\n", cmd_line.join(" "))?;

    let mut command = tokio::process::Command::new(&cmd_line[0]);
    command
        .args(&cmd_line[1..])
        .current_dir(run_dir)
        .env("OMP_NUM_THREADS", spec.threads.to_string())
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log.try_clone()?));
    let child = monitor::spawn_monitored(&mut command, &cmd_line[0])?;

    let status = monitor.supervise(root, &spec.n_pair, &spec.t_pair, child, run_dir).await?;
    if status.success() {
        writeln!(log, "\ntime = {:11.3} sec", start.elapsed().as_secs_f64())?;
    } else {
        drop(log);
        for line in runner::tail_log(log_path) {
            debug!("{line}");
        }
    }
    runner::print_status(start, status.success());
    if !status.success() {
        bail!("exit status {}", status.code().unwrap_or(-1));
    }
    Ok(())
}

/// Scan completed runs, derive the roofline and place every use-case
/// sample on it.
fn report(
    args: &Args,
    counting: &CountingEvents,
    use_cases: &[(PathBuf, UseCaseConfig)],
) -> Result<()> {
    let filter = args.step_filter();
    let registry = BenchRegistry::standard();
    let mut peaks = PeakTracker::new();
    let mut tables = registry
        .scan(&args.results, &filter, &mut peaks)
        .with_context(|| format!("Failed to scan {}", args.results.display()))?;

    if !args.quiet {
        for (family, table) in &mut tables {
            if table.is_empty() {
                continue;
            }
            // Exported tables must form a complete rectangular grid
            let secondaries: Vec<String> = table.secondary_keys().into_iter().collect();
            let steps: Vec<String> = table.step_labels().into_iter().collect();
            table.densify(&secondaries, &steps);

            let name = format!("rooftop.{family}{}.metrics.json", filter.name_suffix());
            let path = args.results.join(&name);
            fs::write(&path, serde_json::to_string_pretty(table)?)?;
            info!("Wrote {name}");
        }
    }

    let Some(model) = RooflineModel::from_tracker(&peaks) else {
        println!("Roofline: no data available (run the benchmarks first)");
        return Ok(());
    };

    let samples = collect_all_samples(args, counting, use_cases)?;
    for line in model.report_lines(&samples) {
        println!("{line}");
    }
    let extent = PlotExtent::for_samples(&model, &samples, args.extent_overrides());
    println!(
        "chart extent: I in [{:.3}, {:.3}] Flop/Byte, rate <= {:.3} GFlop/s",
        extent.x_min, extent.x_max, extent.y_max
    );
    Ok(())
}

fn collect_all_samples(
    args: &Args,
    counting: &CountingEvents,
    use_cases: &[(PathBuf, UseCaseConfig)],
) -> Result<Vec<UseCaseSample>> {
    let mut samples = Vec::new();
    if use_cases.is_empty() {
        return Ok(samples);
    }
    if counting.is_empty() {
        warn!("No counter events configured, use-case samples are skipped");
        return Ok(samples);
    }
    let factors = args.scale_factors();
    for (dir, config) in use_cases {
        samples.extend(usecase::collect_samples(
            config,
            dir,
            &counting.compute,
            &counting.bandwidth,
            &counting.mappings,
            &factors,
        )?);
    }
    Ok(samples)
}
