//! Synthetic problem generation on the worker grid.
//!
//! The operator is a 27-point stencil on a 3-D regular grid: 26.0 on the
//! diagonal, -1.0 for every in-bounds neighbor. The right-hand side is each
//! row's sum, so the exact solution is the all-ones vector. Symmetric,
//! diagonally dominant, positive definite.

use std::collections::HashMap;

use cgmark_core::Geometry;

use crate::sparse::CsrMatrix;

/// The immutable distributed linear system plus per-run buffers.
#[derive(Debug, Clone)]
pub struct Problem {
    pub geometry: Geometry,
    pub matrix: CsrMatrix,
    /// Right-hand side, one entry per local row.
    pub rhs: Vec<f64>,
    /// Initial guess; the harness zeroes this before every solver call.
    pub guess: Vec<f64>,
    /// Known exact solution (all ones).
    pub exact: Vec<f64>,
}

/// Assemble the local rows of the stencil operator.
///
/// Collective: every worker calls this once with its own geometry. Column
/// indices are left as global grid identifiers; [`setup_halo`] must run
/// before the operator is usable.
pub fn generate_problem(geometry: &Geometry) -> Problem {
    let nrows = geometry.local_rows();
    let (gnx, gny, gnz) = geometry.global_dims();
    let (nx, ny, nz) = (geometry.nx, geometry.ny, geometry.nz);
    let base_x = geometry.ipx * nx;
    let base_y = geometry.ipy * ny;
    let base_z = geometry.ipz * nz;

    // 27 entries per interior row
    let mut row_ptr = Vec::with_capacity(nrows + 1);
    let mut col_idx = Vec::with_capacity(nrows * 27);
    let mut values = Vec::with_capacity(nrows * 27);
    let mut diag_idx = Vec::with_capacity(nrows);
    let mut rhs = Vec::with_capacity(nrows);

    row_ptr.push(0);
    for iz in 0..nz {
        for iy in 0..ny {
            for ix in 0..nx {
                let gx = base_x + ix;
                let gy = base_y + iy;
                let gz = base_z + iz;
                let mut row_sum = 0.0;

                for dz in -1i64..=1 {
                    let sz = gz as i64 + dz;
                    if sz < 0 || sz >= gnz as i64 {
                        continue;
                    }
                    for dy in -1i64..=1 {
                        let sy = gy as i64 + dy;
                        if sy < 0 || sy >= gny as i64 {
                            continue;
                        }
                        for dx in -1i64..=1 {
                            let sx = gx as i64 + dx;
                            if sx < 0 || sx >= gnx as i64 {
                                continue;
                            }
                            let gid =
                                sx as usize + sy as usize * gnx + sz as usize * gnx * gny;
                            if dx == 0 && dy == 0 && dz == 0 {
                                diag_idx.push(values.len());
                                col_idx.push(gid);
                                values.push(26.0);
                                row_sum += 26.0;
                            } else {
                                col_idx.push(gid);
                                values.push(-1.0);
                                row_sum -= 1.0;
                            }
                        }
                    }
                }

                row_ptr.push(values.len());
                rhs.push(row_sum);
            }
        }
    }

    let matrix = CsrMatrix::from_global_parts(nrows, row_ptr, col_idx, values, diag_idx);

    Problem {
        geometry: geometry.clone(),
        matrix,
        rhs,
        guess: vec![0.0; nrows],
        exact: vec![1.0; nrows],
    }
}

/// Resolve global column identifiers into the local column space.
///
/// Collective. Columns this worker owns map to their local row index; every
/// other column becomes a ghost column past the local rows, numbered in
/// first-appearance order. The ghost list is the communication metadata a
/// boundary-exchange implementation consumes.
pub fn setup_halo(geometry: &Geometry, matrix: &mut CsrMatrix) {
    let nrows = matrix.nrows();
    let (gnx, gny, _) = geometry.global_dims();
    let (nx, ny, _) = (geometry.nx, geometry.ny, geometry.nz);
    let base_x = geometry.ipx * nx;
    let base_y = geometry.ipy * ny;
    let base_z = geometry.ipz * geometry.nz;

    let mut ghost_globals = Vec::new();
    let mut ghost_of: HashMap<usize, usize> = HashMap::new();

    for col in matrix.col_idx_mut() {
        let gid = *col;
        let gx = gid % gnx;
        let gy = (gid / gnx) % gny;
        let gz = gid / (gnx * gny);

        *col = if geometry.owns(gx, gy, gz) {
            (gx - base_x) + (gy - base_y) * nx + (gz - base_z) * nx * ny
        } else {
            match ghost_of.get(&gid) {
                Some(&ghost) => ghost,
                None => {
                    let ghost = nrows + ghost_globals.len();
                    ghost_globals.push(gid);
                    ghost_of.insert(gid, ghost);
                    ghost
                }
            }
        };
    }

    let ncols = nrows + ghost_globals.len();
    matrix.finalize_columns(ncols, ghost_globals);
}

/// User-tunable optimization hook.
///
/// Collective; its cost is measured and reported but its internals are
/// deliberately opaque to the harness. The default implementation changes
/// nothing.
pub fn optimize_problem(_problem: &mut Problem) {}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmark_core::Geometry;

    fn small_problem(n: usize) -> Problem {
        let geometry = Geometry::new(1, 0, n, n, n);
        let mut problem = generate_problem(&geometry);
        setup_halo(&geometry, &mut problem.matrix);
        problem
    }

    #[test]
    fn single_worker_has_no_ghosts() {
        let problem = small_problem(4);
        assert_eq!(problem.matrix.nrows(), 64);
        assert_eq!(problem.matrix.ncols(), 64);
        assert!(problem.matrix.ghost_globals().is_empty());
    }

    #[test]
    fn interior_row_has_27_entries() {
        let problem = small_problem(4);
        // Point (1, 1, 1) is interior for a 4x4x4 box
        let interior = 1 + 4 + 16;
        let (cols, vals) = problem.matrix.row(interior);
        assert_eq!(cols.len(), 27);
        assert!((problem.matrix.diagonal(interior) - 26.0).abs() < 1e-15);
        let negatives = vals.iter().filter(|&&v| v == -1.0).count();
        assert_eq!(negatives, 26);
    }

    #[test]
    fn corner_row_has_8_entries() {
        let problem = small_problem(4);
        let (cols, _) = problem.matrix.row(0);
        assert_eq!(cols.len(), 8);
    }

    #[test]
    fn rhs_is_row_sum_so_exact_solution_is_ones() {
        let problem = small_problem(3);
        let n = problem.matrix.nrows();
        let mut ax = vec![0.0; n];
        problem.matrix.spmv(&problem.exact, &mut ax);
        for (axi, bi) in ax.iter().zip(&problem.rhs) {
            assert!((axi - bi).abs() < 1e-12);
        }
    }

    #[test]
    fn operator_is_symmetric() {
        let problem = small_problem(3);
        let n = problem.matrix.nrows();
        // Collect entries and check a(i, j) == a(j, i)
        let mut entries = std::collections::HashMap::new();
        for i in 0..n {
            let (cols, vals) = problem.matrix.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                entries.insert((i, j), v);
            }
        }
        for (&(i, j), &v) in &entries {
            assert_eq!(entries.get(&(j, i)), Some(&v), "asymmetry at ({i}, {j})");
        }
    }

    #[test]
    fn guess_starts_at_zero() {
        let problem = small_problem(3);
        assert!(problem.guess.iter().all(|&g| g == 0.0));
        assert_eq!(problem.guess.len(), problem.matrix.nrows());
    }

    #[test]
    fn multi_worker_partition_produces_ghosts() {
        // Rank 0 of a 2-worker group owns half the domain; the stencil
        // reaches across the cut, so ghost columns must appear.
        let geometry = Geometry::new(2, 0, 2, 2, 2);
        let mut problem = generate_problem(&geometry);
        setup_halo(&geometry, &mut problem.matrix);

        assert_eq!(problem.matrix.nrows(), 8);
        assert!(!problem.matrix.ghost_globals().is_empty());
        assert_eq!(
            problem.matrix.ncols(),
            problem.matrix.nrows() + problem.matrix.ghost_globals().len()
        );
    }
}
