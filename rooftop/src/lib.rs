//! # rooftop - Roofline Benchmark Orchestrator
//!
//! rooftop drives throughput benchmarks and counted workload runs on one
//! machine and reduces their captured logs to a roofline chart: the two
//! measured hardware ceilings (peak compute rate, peak memory bandwidth)
//! and each workload placed against them by its arithmetic intensity.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            Benchmark & use-case executions               │
//! │   (STREAM, HPL, user workloads under perf stat)          │
//! └───────────────────────┬──────────────────────────────────┘
//!                         │ one log file per run, named by
//!                         │ the run identity codec
//!                         ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                  rooftop (this crate)                    │
//! │                                                          │
//! │  ┌─────────┐   ┌──────────┐   ┌──────────┐             │
//! │  │  bench  │──▶│ metrics  │──▶│ roofline │             │
//! │  │ (scan)  │   │ (tables, │   │ (ridge,  │             │
//! │  └─────────┘   │  peaks)  │   │  extents)│             │
//! │       ▲        └──────────┘   └──────────┘             │
//! │       │              ▲               ▲                  │
//! │  ┌─────────┐   ┌──────────┐   ┌──────────┐             │
//! │  │ runner  │   │  events  │   │ usecase  │             │
//! │  │ monitor │   │ (pfm4)   │   │ (perf)   │             │
//! │  └─────────┘   └──────────┘   └──────────┘             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`runid`]: canonical run identifiers, `root.key=value...log`
//! - [`metrics`]: max-merge observation tables, peak records, step filters
//! - [`roofline`]: ridge point, workload classification, chart extents
//! - [`events`]: symbolic counter resolution against a libpfm4 dump
//! - [`bench`]: benchmark families (STREAM, HPL) and the scan registry
//! - [`usecase`]: `usc.json` configuration and perf-stat scraping
//! - [`runner`] / [`monitor`]: run execution, log capture, liveness polling
//! - [`preflight`]: environment checks before any counting run
//!
//! ## Key Concepts
//!
//! - **Run identifier**: filesystem-safe run name whose existence marks the
//!   run as done; zero-padded so sorted listings follow run order
//! - **Peak record**: best observed value of a metric kind with the log
//!   that produced it
//! - **Ridge point**: `(Pmax/Bmax, Pmax)`, the knee of the roofline
//! - **Arithmetic intensity**: flops per byte moved, the x axis

pub mod bench;
pub mod cli;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod monitor;
pub mod preflight;
pub mod roofline;
pub mod runid;
pub mod runner;
pub mod usecase;
