//! Numerical kernels for the cgmark benchmark.
//!
//! Provides the collaborators the timed-benchmark protocol drives: a local
//! sparse operator with its matrix-vector product, a symmetric Gauss-Seidel
//! smoother, the full preconditioned conjugate gradient loop in reference
//! and optimized variants, synthetic problem generation on a 3-D grid, and
//! the correctness suites.
//!
//! # Module Structure
//!
//! - [`sparse`] - compressed sparse-row operator and matrix-vector product
//! - [`ops`] - dot products and vector updates
//! - [`symgs`] - symmetric Gauss-Seidel sweep (the CG preconditioner)
//! - [`halo`] - boundary-exchange seam between workers
//! - [`problem`] - synthetic 27-point stencil problem on the worker grid
//! - [`cg`] - preconditioned conjugate gradient, reference and optimized
//! - [`validation`] - correctness suites consumed by the harness

pub mod cg;
pub mod halo;
pub mod ops;
pub mod problem;
pub mod sparse;
pub mod symgs;
pub mod validation;

pub use cg::{CgWorkspace, cg_optimized, cg_reference};
pub use halo::{HaloExchange, SerialExchange};
pub use problem::{Problem, generate_problem, optimize_problem, setup_halo};
pub use sparse::CsrMatrix;
pub use validation::{CorrectnessTally, run_correctness_suite};
