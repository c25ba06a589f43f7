//! Boundary-exchange seam between neighboring workers.
//!
//! Before every matrix-vector product the ghost columns of the input vector
//! must hold the current values owned by neighboring workers. Which workers
//! exchange what is communication-topology detail hidden behind
//! [`HaloExchange`]; the harness only requires that `exchange` is collective
//! and leaves the ghost entries current.

use cgmark_core::SolveError;

use crate::sparse::CsrMatrix;

/// Fills the ghost columns of `x` with boundary values from neighboring
/// workers.
pub trait HaloExchange: Send + Sync {
    /// Collective: every worker in the group must call this together.
    fn exchange(&self, a: &CsrMatrix, x: &mut [f64]) -> Result<(), SolveError>;
}

/// Exchange for the one-worker group: there are no neighbors, so there is
/// nothing to move. Verifies the operator has no ghost columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialExchange;

impl HaloExchange for SerialExchange {
    fn exchange(&self, a: &CsrMatrix, x: &mut [f64]) -> Result<(), SolveError> {
        if !a.ghost_globals().is_empty() {
            return Err(SolveError::Exchange(format!(
                "{} ghost columns but no neighboring workers",
                a.ghost_globals().len()
            )));
        }
        if x.len() < a.ncols() {
            return Err(SolveError::DimensionMismatch {
                expected: a.ncols(),
                actual: x.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(n: usize) -> CsrMatrix {
        let row_ptr = (0..=n).collect();
        let col_idx = (0..n).collect();
        CsrMatrix::from_csr(n, row_ptr, col_idx, vec![1.0; n]).unwrap()
    }

    #[test]
    fn serial_exchange_is_a_no_op() {
        let a = identity(4);
        let mut x = vec![1.0, 2.0, 3.0, 4.0];
        let before = x.clone();
        SerialExchange.exchange(&a, &mut x).unwrap();
        assert_eq!(x, before);
    }

    #[test]
    fn serial_exchange_rejects_short_vectors() {
        let a = identity(4);
        let mut x = vec![0.0; 2];
        let err = SerialExchange.exchange(&a, &mut x).unwrap_err();
        assert_eq!(
            err,
            SolveError::DimensionMismatch {
                expected: 4,
                actual: 2
            }
        );
    }
}
