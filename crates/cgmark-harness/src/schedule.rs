//! Time-boxed scheduling of the scored phase.
//!
//! The wall-clock budget is consumed up front: it fixes the repetition count
//! before the first scored run and is never polled afterwards, so no run is
//! ever interrupted mid-solve. Every worker derives the same count from the
//! same calibrated inputs.

use log::{debug, warn};

use cgmark_core::{Communicator, Stopwatch};

use crate::calibration::{CalibrationConfig, CalibrationResult, KernelSuite};
use crate::quality::SampleSet;

/// Scored repetitions that fit the budget.
///
/// `floor(budget / worst_case)`, clamped to at least one: the benchmark
/// always runs, however large the worst case is relative to the budget. A
/// zero or non-finite worst case (degenerate calibration) also clamps to one
/// rather than failing or running unbounded.
pub fn repetition_count(budget_seconds: f64, worst_case_seconds: f64) -> usize {
    if !worst_case_seconds.is_finite() || worst_case_seconds <= 0.0 {
        return 1;
    }
    let count = (budget_seconds / worst_case_seconds).floor();
    if count.is_finite() && count >= 1.0 {
        count as usize
    } else {
        1
    }
}

/// Outcome of the scored phase.
#[derive(Debug, Clone)]
pub struct ScoredPhase {
    /// One scaled residual per repetition; length equals the scheduled
    /// repetition count exactly.
    pub samples: SampleSet,
    /// Iterations spent across all scored runs.
    pub total_iterations: usize,
    /// Kernel invocations that returned an error.
    pub error_count: usize,
    /// Wall time of the whole scored phase. This is the duration the
    /// benchmark score is computed from; calibration time is excluded.
    pub elapsed_seconds: f64,
}

/// Drive exactly the scheduled number of scored solver invocations.
///
/// Collective. Each run starts from a zeroed guess and a zero tolerance
/// with the full iteration cap, so every repetition performs comparable
/// work. A failed run, or one whose record violates the run-record
/// invariants, contributes an infinite sample - the set keeps one entry
/// per repetition and the failure surfaces in quality evaluation instead
/// of aborting the phase.
pub fn run_scored_phase<K: KernelSuite + ?Sized>(
    suite: &mut K,
    x: &mut [f64],
    comm: &dyn Communicator,
    calibration: &CalibrationResult,
    budget_seconds: f64,
    config: &CalibrationConfig,
) -> ScoredPhase {
    let repetitions = repetition_count(budget_seconds, calibration.worst_case_seconds);
    // Every scored run must be permitted at least the calibrated iteration
    // count, or non-convergence would be baked in silently.
    let max_iters = config.reference_max_iters.max(calibration.required_iterations);

    let mut samples = SampleSet::with_capacity(repetitions);
    let mut total_iterations = 0;
    let mut error_count = 0;
    let clock = Stopwatch::start();

    for call in 0..repetitions {
        x.fill(0.0);
        match suite.optimized_solve(x, max_iters, 0.0) {
            Ok(record) if record.is_valid() => {
                if comm.is_root() {
                    debug!(
                        "call [{call}] scaled residual [{:e}]",
                        record.scaled_residual()
                    );
                }
                samples.push(record.scaled_residual());
                total_iterations += record.iterations;
            }
            Ok(record) => {
                warn!(
                    "scored solve [{call}] returned an invalid record: \
                     residual {:e} / {:e} in {:e} s",
                    record.residual_norm, record.initial_residual_norm, record.elapsed_seconds
                );
                samples.push(f64::INFINITY);
            }
            Err(err) => {
                warn!("scored solve [{call}] failed: {err}");
                error_count += 1;
                samples.push(f64::INFINITY);
            }
        }
    }

    ScoredPhase {
        samples,
        total_iterations,
        error_count,
        elapsed_seconds: clock.elapsed_seconds(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmark_core::{RunRecord, SingleProcess, SolveError};

    #[test]
    fn budget_divides_into_repetitions() {
        assert_eq!(repetition_count(60.0, 7.5), 8);
        assert_eq!(repetition_count(60.0, 7.0), 8); // floor(8.57)
        assert_eq!(repetition_count(10.0, 1.0), 10);
    }

    #[test]
    fn worst_case_beyond_budget_clamps_to_one() {
        assert_eq!(repetition_count(60.0, 65.0), 1);
        assert_eq!(repetition_count(60.0, 60.0), 1);
        assert_eq!(repetition_count(0.0, 5.0), 1);
    }

    #[test]
    fn degenerate_worst_case_clamps_to_one() {
        assert_eq!(repetition_count(60.0, 0.0), 1);
        assert_eq!(repetition_count(60.0, -1.0), 1);
        assert_eq!(repetition_count(60.0, f64::NAN), 1);
        assert_eq!(repetition_count(60.0, f64::INFINITY), 1);
    }

    /// Suite returning a fixed record, tracking invocation caps.
    struct FixedSuite {
        record: RunRecord,
        fail_on: Option<usize>,
        calls: usize,
        caps_seen: Vec<usize>,
    }

    impl FixedSuite {
        fn new(record: RunRecord) -> Self {
            Self {
                record,
                fail_on: None,
                calls: 0,
                caps_seen: Vec::new(),
            }
        }
    }

    impl KernelSuite for FixedSuite {
        fn reference_solve(
            &mut self,
            _x: &mut [f64],
            _max_iters: usize,
            _tolerance: f64,
        ) -> Result<RunRecord, SolveError> {
            Ok(self.record)
        }

        fn optimized_solve(
            &mut self,
            _x: &mut [f64],
            max_iters: usize,
            _tolerance: f64,
        ) -> Result<RunRecord, SolveError> {
            let call = self.calls;
            self.calls += 1;
            self.caps_seen.push(max_iters);
            if self.fail_on == Some(call) {
                Err(SolveError::NonFiniteResidual { iteration: 1 })
            } else {
                Ok(self.record)
            }
        }
    }

    fn calibration(worst_case_seconds: f64, required_iterations: usize) -> CalibrationResult {
        CalibrationResult {
            target_tolerance: 1e-9,
            required_iterations,
            worst_case_seconds,
            tolerance_failures: 0,
            error_count: 0,
        }
    }

    fn record() -> RunRecord {
        RunRecord {
            iterations: 50,
            residual_norm: 5e-10,
            initial_residual_norm: 1.0,
            elapsed_seconds: 0.001,
        }
    }

    #[test]
    fn sample_count_equals_repetition_count() {
        let mut suite = FixedSuite::new(record());
        let mut x = vec![0.0; 4];
        let result = run_scored_phase(
            &mut suite,
            &mut x,
            &SingleProcess,
            &calibration(7.5, 50),
            60.0,
            &CalibrationConfig::default(),
        );

        assert_eq!(result.samples.len(), 8);
        assert_eq!(suite.calls, 8);
        assert_eq!(result.total_iterations, 8 * 50);
        assert_eq!(result.error_count, 0);
    }

    #[test]
    fn failed_runs_still_contribute_a_sample() {
        let mut suite = FixedSuite::new(record());
        suite.fail_on = Some(1);
        let mut x = vec![0.0; 4];
        let result = run_scored_phase(
            &mut suite,
            &mut x,
            &SingleProcess,
            &calibration(20.0, 50),
            60.0,
            &CalibrationConfig::default(),
        );

        assert_eq!(result.samples.len(), 3);
        assert_eq!(result.error_count, 1);
        assert!(result.samples.as_slice()[1].is_infinite());
    }

    #[test]
    fn invalid_records_surface_as_failing_samples() {
        let mut suite = FixedSuite::new(RunRecord {
            iterations: 50,
            residual_norm: f64::NAN,
            initial_residual_norm: 1.0,
            elapsed_seconds: 0.001,
        });
        let mut x = vec![0.0; 4];
        let result = run_scored_phase(
            &mut suite,
            &mut x,
            &SingleProcess,
            &calibration(30.0, 50),
            60.0,
            &CalibrationConfig::default(),
        );

        assert_eq!(result.samples.len(), 2);
        assert!(result.samples.as_slice().iter().all(|s| s.is_infinite()));
        // Not a kernel error, just an untrustworthy record
        assert_eq!(result.error_count, 0);
        assert_eq!(result.total_iterations, 0);
    }

    #[test]
    fn scored_cap_covers_required_iterations() {
        let mut suite = FixedSuite::new(record());
        let mut x = vec![0.0; 4];

        // Calibration needed more iterations than the reference cap
        run_scored_phase(
            &mut suite,
            &mut x,
            &SingleProcess,
            &calibration(100.0, 75),
            60.0,
            &CalibrationConfig::default(),
        );
        assert_eq!(suite.caps_seen, vec![75]);

        // And the reference cap dominates when calibration converged fast
        let mut suite = FixedSuite::new(record());
        run_scored_phase(
            &mut suite,
            &mut x,
            &SingleProcess,
            &calibration(100.0, 20),
            60.0,
            &CalibrationConfig::default(),
        );
        assert_eq!(suite.caps_seen, vec![50]);
    }

    #[test]
    fn rerunning_with_identical_calibration_reproduces_the_schedule() {
        let calibration = calibration(7.5, 50);
        let config = CalibrationConfig::default();

        let mut first_suite = FixedSuite::new(record());
        let mut x = vec![0.0; 4];
        let first = run_scored_phase(
            &mut first_suite,
            &mut x,
            &SingleProcess,
            &calibration,
            60.0,
            &config,
        );

        let mut second_suite = FixedSuite::new(record());
        let second = run_scored_phase(
            &mut second_suite,
            &mut x,
            &SingleProcess,
            &calibration,
            60.0,
            &config,
        );

        assert_eq!(first.samples.len(), second.samples.len());
        assert_eq!(first.samples.as_slice(), second.samples.as_slice());
    }
}
