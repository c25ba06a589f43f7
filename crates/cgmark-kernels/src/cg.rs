//! Preconditioned conjugate gradient, reference and optimized variants.
//!
//! Both variants share one loop: the optimized entry point is the seam where
//! a tuned implementation plugs in, and by default it delegates to the same
//! kernels as the reference. The caller owns the guess vector and is
//! responsible for zeroing it before an invocation; the solver never resets
//! it.

#![allow(clippy::too_many_arguments)]

use cgmark_core::{PhaseTimings, RunRecord, SolveError, Stopwatch};

use crate::halo::HaloExchange;
use crate::ops::{axpby, dot, waxpby};
use crate::sparse::CsrMatrix;
use crate::symgs::symgs;

/// Scratch vectors reused across solver invocations.
///
/// `p` and `z` are sized for the full column space so the boundary exchange
/// can fill their ghost entries; `r` and `ap` only cover local rows.
#[derive(Debug, Clone)]
pub struct CgWorkspace {
    r: Vec<f64>,
    z: Vec<f64>,
    p: Vec<f64>,
    ap: Vec<f64>,
}

impl CgWorkspace {
    /// Allocate scratch space for the given operator.
    ///
    /// # Panics
    ///
    /// Panics if halo setup has not run.
    pub fn new(a: &CsrMatrix) -> Self {
        assert!(a.is_ready(), "workspace allocation before halo setup");
        Self {
            r: vec![0.0; a.nrows()],
            z: vec![0.0; a.ncols()],
            p: vec![0.0; a.ncols()],
            ap: vec![0.0; a.nrows()],
        }
    }
}

/// Reference solver: full preconditioned CG with the unoptimized kernels.
pub fn cg_reference(
    a: &CsrMatrix,
    exchange: &dyn HaloExchange,
    ws: &mut CgWorkspace,
    b: &[f64],
    x: &mut [f64],
    max_iters: usize,
    tolerance: f64,
    timings: &mut PhaseTimings,
) -> Result<RunRecord, SolveError> {
    cg_solve(a, exchange, ws, b, x, max_iters, tolerance, true, timings)
}

/// Optimized solver entry point.
///
/// This is the tuning seam: a platform-specific build replaces the body
/// while keeping the contract. The default delegates to the reference
/// kernels.
pub fn cg_optimized(
    a: &CsrMatrix,
    exchange: &dyn HaloExchange,
    ws: &mut CgWorkspace,
    b: &[f64],
    x: &mut [f64],
    max_iters: usize,
    tolerance: f64,
    timings: &mut PhaseTimings,
) -> Result<RunRecord, SolveError> {
    cg_solve(a, exchange, ws, b, x, max_iters, tolerance, true, timings)
}

/// Solve `A x = b` with preconditioned conjugate gradient.
///
/// Runs until the scaled residual drops to `tolerance` or `max_iters`
/// iterations have been spent; a zero tolerance therefore forces the full
/// iteration cap, which the benchmark uses to make every scored run perform
/// identical work. Per-kernel time lands in `timings`.
pub fn cg_solve(
    a: &CsrMatrix,
    exchange: &dyn HaloExchange,
    ws: &mut CgWorkspace,
    b: &[f64],
    x: &mut [f64],
    max_iters: usize,
    tolerance: f64,
    precondition: bool,
    timings: &mut PhaseTimings,
) -> Result<RunRecord, SolveError> {
    let nrows = a.nrows();
    assert!(a.is_ready(), "solve before halo setup");
    assert_eq!(b.len(), nrows, "rhs dimension mismatch");
    assert_eq!(x.len(), nrows, "guess dimension mismatch");

    let total = Stopwatch::start();

    // r = b - A x
    ws.p[..nrows].copy_from_slice(x);
    timed(&mut timings.halo_exchange, || exchange.exchange(a, &mut ws.p))?;
    timed(&mut timings.spmv, || a.spmv(&ws.p, &mut ws.ap));
    timed(&mut timings.vector_update, || {
        waxpby(1.0, b, -1.0, &ws.ap, &mut ws.r)
    });

    let mut normr = timed(&mut timings.dot_product, || dot(&ws.r, &ws.r)).sqrt();
    let normr0 = normr;
    if !normr.is_finite() {
        return Err(SolveError::NonFiniteResidual { iteration: 0 });
    }
    if normr0 == 0.0 {
        // Nothing to solve; report an exact zero-work run.
        return Ok(RunRecord {
            iterations: 0,
            residual_norm: 0.0,
            initial_residual_norm: 0.0,
            elapsed_seconds: total.elapsed_seconds(),
        });
    }

    let mut rtz = 0.0;
    let mut iterations = 0;

    for k in 1..=max_iters {
        if precondition {
            // The sweep must apply the same fixed symmetric operator every
            // iteration, which requires a zeroed guess.
            timed(&mut timings.preconditioner, || {
                ws.z.fill(0.0);
                symgs(a, &ws.r, &mut ws.z)
            });
        } else {
            ws.z[..nrows].copy_from_slice(&ws.r);
        }

        if k == 1 {
            ws.p.copy_from_slice(&ws.z);
            rtz = timed(&mut timings.dot_product, || dot(&ws.r, &ws.z[..nrows]));
        } else {
            let rtz_old = rtz;
            rtz = timed(&mut timings.dot_product, || dot(&ws.r, &ws.z[..nrows]));
            let beta = rtz / rtz_old;
            // p = z + beta * p
            timed(&mut timings.vector_update, || {
                axpby(1.0, &ws.z, beta, &mut ws.p)
            });
        }

        timed(&mut timings.halo_exchange, || exchange.exchange(a, &mut ws.p))?;
        timed(&mut timings.spmv, || a.spmv(&ws.p, &mut ws.ap));

        let p_ap = timed(&mut timings.dot_product, || {
            dot(&ws.p[..nrows], &ws.ap)
        });
        if !p_ap.is_finite() || p_ap <= 0.0 {
            return Err(SolveError::Breakdown { iteration: k });
        }
        let alpha = rtz / p_ap;

        timed(&mut timings.vector_update, || {
            axpby(alpha, &ws.p[..nrows], 1.0, x)
        });
        timed(&mut timings.vector_update, || {
            axpby(-alpha, &ws.ap, 1.0, &mut ws.r)
        });

        normr = timed(&mut timings.dot_product, || dot(&ws.r, &ws.r)).sqrt();
        if !normr.is_finite() {
            return Err(SolveError::NonFiniteResidual { iteration: k });
        }

        iterations = k;
        if normr / normr0 <= tolerance {
            break;
        }
    }

    let elapsed = total.elapsed_seconds();
    timings.total += elapsed;

    Ok(RunRecord {
        iterations,
        residual_norm: normr,
        initial_residual_norm: normr0,
        elapsed_seconds: elapsed,
    })
}

fn timed<T>(bucket: &mut f64, f: impl FnOnce() -> T) -> T {
    let clock = Stopwatch::start();
    let result = f();
    *bucket += clock.elapsed_seconds();
    result
}
