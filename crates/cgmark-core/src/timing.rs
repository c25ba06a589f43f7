//! Wall-clock measurement and named per-phase timing buckets.

use std::time::Instant;

use serde::Serialize;

/// Monotonic wall clock for one measurement interval.
///
/// Measurement is local to the worker; nothing here is collective.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    /// Start the clock.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock was started.
    pub fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Named timing buckets, one per benchmark phase or kernel.
///
/// The solver kernels accumulate into the per-kernel buckets while they run;
/// the driver fills the phase-level buckets. The whole record lands in the
/// final report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PhaseTimings {
    /// Total time inside scored solver invocations.
    pub total: f64,
    /// Dot products.
    pub dot_product: f64,
    /// Vector updates (axpy-style operations).
    pub vector_update: f64,
    /// Sparse matrix-vector products.
    pub spmv: f64,
    /// Boundary-value exchange.
    pub halo_exchange: f64,
    /// Preconditioner (smoother) application.
    pub preconditioner: f64,
    /// Problem generation and halo setup.
    pub setup: f64,
    /// The user-tunable optimization hook.
    pub optimize: f64,
    /// Reference kernel timing loop (mean per call).
    pub reference_kernels: f64,
}

impl PhaseTimings {
    /// All buckets zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every bucket of `other` into `self`.
    pub fn accumulate(&mut self, other: &PhaseTimings) {
        self.total += other.total;
        self.dot_product += other.dot_product;
        self.vector_update += other.vector_update;
        self.spmv += other.spmv;
        self.halo_exchange += other.halo_exchange;
        self.preconditioner += other.preconditioner;
        self.setup += other.setup;
        self.optimize += other.optimize;
        self.reference_kernels += other.reference_kernels;
    }
}
