//! The full benchmark phase sequence over a generated problem.
//!
//! Phase order: problem setup, tunable optimization, correctness gate,
//! reference-kernel timing, calibration, scored runs, aggregation, report.
//! Every phase is collective and runs with identical control flow on every
//! worker; only logging and report emission are gated to the reporting
//! rank.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cgmark_core::{Communicator, Geometry, PhaseTimings, RunRecord, SolveError, Stopwatch};
use cgmark_kernels::{
    CgWorkspace, CsrMatrix, HaloExchange, SerialExchange, cg_optimized, cg_reference,
    generate_problem, optimize_problem, run_correctness_suite, setup_halo, symgs::symgs,
};

use crate::calibration::{CalibrationConfig, KernelSuite, calibrate};
use crate::quality::{BenchmarkVerdict, evaluate};
use crate::report::Report;
use crate::schedule::run_scored_phase;

/// Calls in the reference-kernel timing loop.
const REFERENCE_KERNEL_CALLS: usize = 10;

/// Seed for the reference-kernel timing vector.
const TIMING_SEED: u64 = 0x0dd5eed;

/// Top-level benchmark parameters.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Wall-clock budget for the scored phase, in seconds.
    pub budget_seconds: f64,
    pub calibration: CalibrationConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            // Exploratory default; official runs use hours here.
            budget_seconds: 60.0,
            calibration: CalibrationConfig::default(),
        }
    }
}

/// The generated stencil problem wired into the [`KernelSuite`] contract.
///
/// Owns the scratch workspace and the per-kernel timing buckets; the guess
/// vector stays with the caller.
struct StencilSuite<'a> {
    matrix: &'a CsrMatrix,
    rhs: &'a [f64],
    exchange: &'a dyn HaloExchange,
    workspace: CgWorkspace,
    timings: PhaseTimings,
}

impl<'a> StencilSuite<'a> {
    fn new(matrix: &'a CsrMatrix, rhs: &'a [f64], exchange: &'a dyn HaloExchange) -> Self {
        Self {
            matrix,
            rhs,
            exchange,
            workspace: CgWorkspace::new(matrix),
            timings: PhaseTimings::new(),
        }
    }

    /// Hand back the kernel time accumulated so far and start a fresh
    /// bucket. Lets the driver keep calibration time out of the score.
    fn take_timings(&mut self) -> PhaseTimings {
        std::mem::take(&mut self.timings)
    }
}

impl KernelSuite for StencilSuite<'_> {
    fn reference_solve(
        &mut self,
        x: &mut [f64],
        max_iters: usize,
        tolerance: f64,
    ) -> Result<RunRecord, SolveError> {
        cg_reference(
            self.matrix,
            self.exchange,
            &mut self.workspace,
            self.rhs,
            x,
            max_iters,
            tolerance,
            &mut self.timings,
        )
    }

    fn optimized_solve(
        &mut self,
        x: &mut [f64],
        max_iters: usize,
        tolerance: f64,
    ) -> Result<RunRecord, SolveError> {
        cg_optimized(
            self.matrix,
            self.exchange,
            &mut self.workspace,
            self.rhs,
            x,
            max_iters,
            tolerance,
            &mut self.timings,
        )
    }
}

/// Time the raw exchange + spmv + smoother sequence on a randomized vector.
///
/// Returns the mean per call; this bucket is a kernel microbenchmark, not a
/// scheduling input, so a mean is appropriate here.
fn time_reference_kernels(
    a: &CsrMatrix,
    exchange: &dyn HaloExchange,
    calls: usize,
) -> Result<f64, SolveError> {
    let mut rng = StdRng::seed_from_u64(TIMING_SEED);
    let mut x: Vec<f64> = (0..a.ncols()).map(|_| rng.gen_range(1.0..2.0)).collect();
    let mut y = vec![0.0; a.ncols()];

    let clock = Stopwatch::start();
    for _ in 0..calls {
        exchange.exchange(a, &mut x)?;
        a.spmv(&x, &mut y);
        symgs(a, &x[..a.nrows()], &mut y);
    }
    Ok(clock.elapsed_seconds() / calls as f64)
}

/// Run the whole benchmark and assemble the report.
///
/// Collective. Kernel errors inside any phase are logged and counted, never
/// fatal; the report records what actually happened.
pub fn run_benchmark(
    geometry: &Geometry,
    comm: &dyn Communicator,
    config: &BenchmarkConfig,
) -> Report {
    let mut timings = PhaseTimings::new();

    let setup_clock = Stopwatch::start();
    let mut problem = generate_problem(geometry);
    setup_halo(geometry, &mut problem.matrix);
    timings.setup = setup_clock.elapsed_seconds();
    comm.barrier();

    if comm.is_root() {
        info!(
            "problem: {} local rows, {} nonzeros, {} worker(s)",
            problem.matrix.nrows(),
            problem.matrix.nnz(),
            comm.size()
        );
    }

    let optimize_clock = Stopwatch::start();
    optimize_problem(&mut problem);
    timings.optimize = optimize_clock.elapsed_seconds();

    let exchange = SerialExchange;

    let correctness = run_correctness_suite(&problem, &exchange);
    if comm.is_root() {
        info!(
            "correctness suite: {} passed, {} failed",
            correctness.passed, correctness.failed
        );
    }

    timings.reference_kernels =
        match time_reference_kernels(&problem.matrix, &exchange, REFERENCE_KERNEL_CALLS) {
            Ok(mean) => mean,
            Err(err) => {
                log::warn!("reference kernel timing failed: {err}");
                0.0
            }
        };

    let mut x = std::mem::take(&mut problem.guess);
    let mut suite = StencilSuite::new(&problem.matrix, &problem.rhs, &exchange);

    let calibration = calibrate(&mut suite, &mut x, comm, &config.calibration);
    if comm.is_root() {
        info!(
            "calibration: target {:e}, {} required iterations, worst case {:.6} s",
            calibration.target_tolerance,
            calibration.required_iterations,
            calibration.worst_case_seconds
        );
    }
    // Calibration kernel time never counts toward the score.
    let _calibration_timings = suite.take_timings();
    comm.barrier();

    let scored = run_scored_phase(
        &mut suite,
        &mut x,
        comm,
        &calibration,
        config.budget_seconds,
        &config.calibration,
    );
    timings.accumulate(&suite.take_timings());
    comm.barrier();

    if comm.is_root() {
        info!(
            "scored phase: {} repetitions, {} total iterations, {:.6} s",
            scored.samples.len(),
            scored.total_iterations,
            scored.elapsed_seconds
        );
    }

    let quality = evaluate(&scored.samples, calibration.target_tolerance);
    let scored_seconds = scored.elapsed_seconds;
    let verdict = BenchmarkVerdict::new(scored, &quality, &calibration, &correctness, timings);

    Report::new(
        geometry,
        config.budget_seconds,
        scored_seconds,
        calibration,
        correctness,
        quality,
        verdict,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_kernel_timing_is_positive() {
        let geometry = Geometry::new(1, 0, 4, 4, 4);
        let mut problem = generate_problem(&geometry);
        setup_halo(&geometry, &mut problem.matrix);

        let mean = time_reference_kernels(&problem.matrix, &SerialExchange, 3).unwrap();
        assert!(mean > 0.0);
    }

    #[test]
    fn suite_resets_nothing_itself() {
        // The harness owns guess resets; a solve from a dirty guess must
        // start from that dirty guess.
        let geometry = Geometry::new(1, 0, 3, 3, 3);
        let mut problem = generate_problem(&geometry);
        setup_halo(&geometry, &mut problem.matrix);
        let exchange = SerialExchange;
        let mut suite = StencilSuite::new(&problem.matrix, &problem.rhs, &exchange);

        let mut zeroed = vec![0.0; problem.matrix.nrows()];
        let from_zero = suite.reference_solve(&mut zeroed, 5, 0.0).unwrap();

        let mut dirty = vec![10.0; problem.matrix.nrows()];
        let from_dirty = suite.reference_solve(&mut dirty, 5, 0.0).unwrap();

        assert_ne!(
            from_zero.initial_residual_norm,
            from_dirty.initial_residual_norm
        );
    }
}
