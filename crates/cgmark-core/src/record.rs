//! Outcome of a single solver invocation.

use thiserror::Error;

/// Errors a solver kernel can report.
///
/// The harness never aborts a phase on these: each error is logged, counted,
/// and execution continues with whatever statistics were gathered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// The residual norm left the representable range.
    #[error("residual norm became non-finite at iteration {iteration}")]
    NonFiniteResidual { iteration: usize },

    /// The search-direction curvature collapsed; the operator is not
    /// positive definite as seen by the solver.
    #[error("conjugate gradient breakdown at iteration {iteration}")]
    Breakdown { iteration: usize },

    /// A vector did not carry enough entries for the operator.
    #[error("dimension mismatch: expected at least {expected} entries, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Boundary-value exchange with neighboring workers failed.
    #[error("boundary exchange failed: {0}")]
    Exchange(String),
}

/// One solver invocation's outcome: iteration count, residual trajectory
/// endpoints, and wall time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunRecord {
    /// Iterations performed.
    pub iterations: usize,
    /// Final residual norm.
    pub residual_norm: f64,
    /// Residual norm before the first iteration.
    pub initial_residual_norm: f64,
    /// Wall time of this invocation, in seconds.
    pub elapsed_seconds: f64,
}

impl RunRecord {
    /// Ratio of the final residual norm to the initial one.
    ///
    /// This is the benchmark's accuracy metric. A degenerate initial norm
    /// yields infinity so the run surfaces as a quality failure downstream
    /// instead of dividing by zero.
    pub fn scaled_residual(&self) -> f64 {
        if self.initial_residual_norm > 0.0 {
            self.residual_norm / self.initial_residual_norm
        } else if self.residual_norm == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    }

    /// Whether the record satisfies the data-model invariants: norms and
    /// elapsed time finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.residual_norm.is_finite()
            && self.residual_norm >= 0.0
            && self.initial_residual_norm.is_finite()
            && self.initial_residual_norm >= 0.0
            && self.elapsed_seconds.is_finite()
            && self.elapsed_seconds >= 0.0
    }
}
