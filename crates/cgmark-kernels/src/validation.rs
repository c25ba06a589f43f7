//! Correctness suites run before the timed phases.
//!
//! Two suites guard the benchmark against a broken kernel stack: the
//! smoother must actually help CG converge, and both the operator and the
//! smoother must be symmetric as applied. The harness consumes only the
//! pass/fail tally; a failing sub-test marks the whole benchmark result as
//! failed without stopping it.

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use cgmark_core::PhaseTimings;

use crate::cg::{CgWorkspace, cg_solve};
use crate::halo::HaloExchange;
use crate::ops::{dot, norm2};
use crate::problem::Problem;
use crate::symgs::symgs;

/// Seed for the randomized symmetry vectors; fixed so reruns are comparable.
const SYMMETRY_SEED: u64 = 0x5ca1ab1e;

/// Convergence tolerance the preconditioned solver must reach.
const CONVERGENCE_TOLERANCE: f64 = 1e-6;

/// Iteration cap for the effectiveness test.
const CONVERGENCE_CAP: usize = 500;

/// Pass/fail counts from the correctness suites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorrectnessTally {
    pub passed: usize,
    pub failed: usize,
}

impl CorrectnessTally {
    /// Record one sub-test outcome.
    pub fn record(&mut self, ok: bool) {
        if ok {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Whether any sub-test failed.
    pub fn any_failed(&self) -> bool {
        self.failed > 0
    }
}

/// Run every correctness suite against the generated problem.
///
/// Collective. Never panics on a failing sub-test; failures are tallied and
/// logged.
pub fn run_correctness_suite(problem: &Problem, exchange: &dyn HaloExchange) -> CorrectnessTally {
    let mut tally = CorrectnessTally::default();
    test_preconditioner_effectiveness(problem, exchange, &mut tally);
    test_symmetry(problem, exchange, &mut tally);
    tally
}

/// The smoother must not slow CG down: the preconditioned solve has to
/// converge, in no more iterations than the unpreconditioned one.
fn test_preconditioner_effectiveness(
    problem: &Problem,
    exchange: &dyn HaloExchange,
    tally: &mut CorrectnessTally,
) {
    let a = &problem.matrix;
    let mut timings = PhaseTimings::new();

    let mut run = |precondition: bool| {
        let mut ws = CgWorkspace::new(a);
        let mut x = vec![0.0; a.nrows()];
        cg_solve(
            a,
            exchange,
            &mut ws,
            &problem.rhs,
            &mut x,
            CONVERGENCE_CAP,
            CONVERGENCE_TOLERANCE,
            precondition,
            &mut timings,
        )
    };

    let plain = run(false);
    let preconditioned = run(true);

    match (&plain, &preconditioned) {
        (Ok(plain), Ok(preconditioned)) => {
            let converged = preconditioned.scaled_residual() <= CONVERGENCE_TOLERANCE;
            if !converged {
                warn!(
                    "preconditioned CG failed to converge: scaled residual {:e}",
                    preconditioned.scaled_residual()
                );
            }
            tally.record(converged);

            let effective = preconditioned.iterations <= plain.iterations;
            if !effective {
                warn!(
                    "smoother slowed CG down: {} iterations preconditioned vs {} plain",
                    preconditioned.iterations, plain.iterations
                );
            }
            tally.record(effective);
        }
        _ => {
            warn!("solver error during effectiveness test");
            tally.record(false);
            tally.record(false);
        }
    }
}

/// Both `A` and the smoother must be symmetric as applied:
/// `<A u, v> == <u, A v>` and `<M u, v> == <u, M v>` for randomized u, v.
fn test_symmetry(problem: &Problem, exchange: &dyn HaloExchange, tally: &mut CorrectnessTally) {
    let a = &problem.matrix;
    let nrows = a.nrows();
    let ncols = a.ncols();
    let mut rng = StdRng::seed_from_u64(SYMMETRY_SEED);

    let mut u: Vec<f64> = (0..ncols).map(|_| rng.gen_range(1.0..2.0)).collect();
    let mut v: Vec<f64> = (0..ncols).map(|_| rng.gen_range(1.0..2.0)).collect();

    let mut au = vec![0.0; nrows];
    let mut av = vec![0.0; nrows];
    if exchange.exchange(a, &mut u).is_err() || exchange.exchange(a, &mut v).is_err() {
        warn!("boundary exchange failed during symmetry test");
        tally.record(false);
        tally.record(false);
        return;
    }
    a.spmv(&u, &mut au);
    a.spmv(&v, &mut av);

    // Accumulated rounding in the two dot products grows with the row count.
    let threshold = |scale: f64| f64::EPSILON * scale * nrows as f64;

    let scale = norm2(&au) * norm2(&v[..nrows]) + norm2(&u[..nrows]) * norm2(&av);
    let departure = (dot(&au, &v[..nrows]) - dot(&u[..nrows], &av)).abs();
    let operator_symmetric = departure <= threshold(scale);
    if !operator_symmetric {
        warn!("operator symmetry departure {departure:e} exceeds threshold");
    }
    tally.record(operator_symmetric);

    // Smoother symmetry holds only from a zero initial guess.
    let mut mu = vec![0.0; ncols];
    symgs(a, &u[..nrows], &mut mu);
    let mut mv = vec![0.0; ncols];
    symgs(a, &v[..nrows], &mut mv);

    let scale = norm2(&mu[..nrows]) * norm2(&v[..nrows]) + norm2(&u[..nrows]) * norm2(&mv[..nrows]);
    let departure =
        (dot(&mu[..nrows], &v[..nrows]) - dot(&u[..nrows], &mv[..nrows])).abs();
    let smoother_symmetric = departure <= threshold(scale);
    if !smoother_symmetric {
        warn!("smoother symmetry departure {departure:e} exceeds threshold");
    }
    tally.record(smoother_symmetric);
}
