//! The self-calibrating timed-benchmark protocol.
//!
//! This crate is the control plane above the numerical kernels. It owns the
//! logic that makes results from different machines comparable:
//!
//! 1. [`calibration`] - fix a target tolerance, a required iteration count,
//!    and a worst-case per-run cost from reference and optimized solves
//! 2. [`schedule`] - turn a wall-clock budget and the worst-case cost into a
//!    repetition count, then drive exactly that many scored solves
//! 3. [`quality`] - evaluate the collected scaled-residual samples and fold
//!    every failure channel into one verdict
//! 4. [`driver`] - the full phase sequence over a generated problem
//! 5. [`report`] - the structured result document
//!
//! # Module Structure
//!
//! - [`calibration`] - [`CalibrationResult`], [`KernelSuite`], [`calibrate`]
//! - [`schedule`] - [`repetition_count`], [`run_scored_phase`]
//! - [`quality`] - [`SampleSet`], [`BenchmarkVerdict`], [`evaluate`]
//! - [`driver`] - [`BenchmarkConfig`], [`run_benchmark`]
//! - [`report`] - [`Report`], [`emit_report`]

pub mod calibration;
pub mod driver;
pub mod quality;
pub mod report;
pub mod schedule;

pub use calibration::{CalibrationConfig, CalibrationResult, KernelSuite, calibrate};
pub use driver::{BenchmarkConfig, run_benchmark};
pub use quality::{BenchmarkVerdict, QualityReport, SampleSet, evaluate};
pub use report::{Report, emit_report};
pub use schedule::{ScoredPhase, repetition_count, run_scored_phase};
