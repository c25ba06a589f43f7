//! Compressed sparse-row operator for the local partition.
//!
//! Rows are the grid points this worker owns; columns cover the local rows
//! plus ghost columns for off-worker neighbors. Column indices start as
//! global grid identifiers at generation time and become local after
//! [`crate::problem::setup_halo`] runs.

use rayon::prelude::*;

/// Local sparse matrix in compressed sparse-row layout.
///
/// Each row carries its diagonal position so the smoother can reach the
/// diagonal without searching.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    nrows: usize,
    /// Local rows plus ghost columns; zero until halo setup has run.
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
    /// Index into `values` of each row's diagonal entry.
    diag_idx: Vec<usize>,
    /// Global grid identifier of each ghost column, in column order.
    ghost_globals: Vec<usize>,
}

impl CsrMatrix {
    /// Build a matrix whose column indices are already local.
    ///
    /// Intended for tests and benchmarks; the benchmark itself goes through
    /// [`crate::problem::generate_problem`]. Returns `None` if the layout is
    /// inconsistent or some row lacks a diagonal entry.
    pub fn from_csr(
        nrows: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Option<Self> {
        if row_ptr.len() != nrows + 1 || col_idx.len() != values.len() {
            return None;
        }
        if row_ptr[0] != 0 || *row_ptr.last()? != values.len() {
            return None;
        }

        let mut diag_idx = Vec::with_capacity(nrows);
        for i in 0..nrows {
            let start = row_ptr[i];
            let end = row_ptr[i + 1];
            if end < start || end > col_idx.len() {
                return None;
            }
            let diag = (start..end).find(|&k| col_idx[k] == i)?;
            diag_idx.push(diag);
        }

        if col_idx.iter().any(|&c| c >= nrows) {
            return None;
        }

        Some(Self {
            nrows,
            ncols: nrows,
            row_ptr,
            col_idx,
            values,
            diag_idx,
            ghost_globals: Vec::new(),
        })
    }

    /// Construct from raw parts with unresolved (global) column indices.
    ///
    /// Used by problem generation; `ncols` stays zero until halo setup
    /// resolves the column space.
    pub(crate) fn from_global_parts(
        nrows: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
        diag_idx: Vec<usize>,
    ) -> Self {
        Self {
            nrows,
            ncols: 0,
            row_ptr,
            col_idx,
            values,
            diag_idx,
            ghost_globals: Vec::new(),
        }
    }

    pub(crate) fn finalize_columns(&mut self, ncols: usize, ghost_globals: Vec<usize>) {
        self.ncols = ncols;
        self.ghost_globals = ghost_globals;
    }

    pub(crate) fn col_idx_mut(&mut self) -> &mut [usize] {
        &mut self.col_idx
    }

    /// Number of local rows.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns (local rows plus ghost columns). Zero before halo
    /// setup.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Whether halo setup has resolved the column space.
    pub fn is_ready(&self) -> bool {
        self.ncols >= self.nrows
    }

    /// Global identifiers of the ghost columns, in column order.
    pub fn ghost_globals(&self) -> &[usize] {
        &self.ghost_globals
    }

    /// Column indices and values of row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let start = self.row_ptr[i];
        let end = self.row_ptr[i + 1];
        (&self.col_idx[start..end], &self.values[start..end])
    }

    /// Diagonal entry of row `i`.
    pub fn diagonal(&self, i: usize) -> f64 {
        self.values[self.diag_idx[i]]
    }

    /// Sparse matrix-vector product `y = A * x` over the local rows.
    ///
    /// `x` must carry ghost-column values already filled in by the boundary
    /// exchange. Rows are independent, so the product parallelizes across
    /// rows.
    ///
    /// # Panics
    ///
    /// Panics if halo setup has not run or a vector is too short.
    pub fn spmv(&self, x: &[f64], y: &mut [f64]) {
        assert!(self.is_ready(), "spmv before halo setup");
        assert!(x.len() >= self.ncols, "input vector too short");
        assert!(y.len() >= self.nrows, "output vector too short");

        y[..self.nrows]
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, yi)| {
                let start = self.row_ptr[i];
                let end = self.row_ptr[i + 1];
                let mut sum = 0.0;
                for k in start..end {
                    sum += self.values[k] * x[self.col_idx[k]];
                }
                *yi = sum;
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(n: usize) -> CsrMatrix {
        let row_ptr = (0..=n).collect();
        let col_idx = (0..n).collect();
        let values = vec![1.0; n];
        CsrMatrix::from_csr(n, row_ptr, col_idx, values).unwrap()
    }

    fn tridiagonal(n: usize) -> CsrMatrix {
        // [ 2 -1       ]
        // [-1  2 -1    ]
        // [    .. .. ..]
        let mut row_ptr = vec![0];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        for i in 0..n {
            if i > 0 {
                col_idx.push(i - 1);
                values.push(-1.0);
            }
            col_idx.push(i);
            values.push(2.0);
            if i + 1 < n {
                col_idx.push(i + 1);
                values.push(-1.0);
            }
            row_ptr.push(col_idx.len());
        }
        CsrMatrix::from_csr(n, row_ptr, col_idx, values).unwrap()
    }

    #[test]
    fn spmv_identity() {
        let a = identity(3);
        assert_eq!(a.nrows(), 3);
        assert_eq!(a.ncols(), 3);
        assert_eq!(a.nnz(), 3);

        let x = vec![1.0, 2.0, 3.0];
        let mut y = vec![0.0; 3];
        a.spmv(&x, &mut y);

        assert!((y[0] - 1.0).abs() < 1e-15);
        assert!((y[1] - 2.0).abs() < 1e-15);
        assert!((y[2] - 3.0).abs() < 1e-15);
    }

    #[test]
    fn spmv_tridiagonal() {
        let a = tridiagonal(3);
        let x = vec![1.0, 2.0, 3.0];
        let mut y = vec![0.0; 3];
        a.spmv(&x, &mut y);

        // y[0] = 2*1 - 1*2 = 0
        // y[1] = -1*1 + 2*2 - 1*3 = 0
        // y[2] = -1*2 + 2*3 = 4
        assert!((y[0] - 0.0).abs() < 1e-15);
        assert!((y[1] - 0.0).abs() < 1e-15);
        assert!((y[2] - 4.0).abs() < 1e-15);
    }

    #[test]
    fn diagonal_lookup() {
        let a = tridiagonal(4);
        for i in 0..4 {
            assert!((a.diagonal(i) - 2.0).abs() < 1e-15);
        }
    }

    #[test]
    fn from_csr_rejects_missing_diagonal() {
        // 2x2 with no (1,1) entry
        let row_ptr = vec![0, 1, 2];
        let col_idx = vec![0, 0];
        let values = vec![1.0, 1.0];
        assert!(CsrMatrix::from_csr(2, row_ptr, col_idx, values).is_none());
    }

    #[test]
    fn from_csr_rejects_inconsistent_layout() {
        assert!(CsrMatrix::from_csr(2, vec![0, 1], vec![0], vec![1.0]).is_none());
        assert!(CsrMatrix::from_csr(1, vec![0, 2], vec![0], vec![1.0]).is_none());
    }

    #[test]
    #[should_panic(expected = "input vector too short")]
    fn spmv_rejects_short_input() {
        let a = identity(3);
        let x = vec![1.0; 2];
        let mut y = vec![0.0; 3];
        a.spmv(&x, &mut y);
    }
}
