//! Dense vector primitives used by the conjugate gradient loop.
//!
//! All reductions use fixed-size chunking with an ordered combine, so
//! results are bit-identical across runs regardless of how the thread pool
//! schedules the chunks. Scored repetitions must be comparable run to run.

use rayon::prelude::*;

/// Chunk size for parallel reductions.
const CHUNK: usize = 4096;

/// Dot product of two vectors.
///
/// # Panics
///
/// Panics if the vectors differ in length.
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len(), "dot length mismatch");

    let partials: Vec<f64> = x
        .par_chunks(CHUNK)
        .zip(y.par_chunks(CHUNK))
        .map(|(xs, ys)| xs.iter().zip(ys).map(|(a, b)| a * b).sum::<f64>())
        .collect();

    partials.iter().sum()
}

/// Euclidean norm of a vector.
pub fn norm2(x: &[f64]) -> f64 {
    dot(x, x).sqrt()
}

/// `w = alpha * x + beta * y`, writing into a separate output vector.
///
/// # Panics
///
/// Panics if the lengths differ.
pub fn waxpby(alpha: f64, x: &[f64], beta: f64, y: &[f64], w: &mut [f64]) {
    assert_eq!(x.len(), y.len(), "waxpby length mismatch");
    assert_eq!(x.len(), w.len(), "waxpby length mismatch");

    w.par_iter_mut()
        .zip(x.par_iter().zip(y.par_iter()))
        .for_each(|(wi, (&xi, &yi))| *wi = alpha * xi + beta * yi);
}

/// `y = alpha * x + beta * y`, updating in place.
///
/// # Panics
///
/// Panics if the lengths differ.
pub fn axpby(alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) {
    assert_eq!(x.len(), y.len(), "axpby length mismatch");

    y.par_iter_mut()
        .zip(x.par_iter())
        .for_each(|(yi, &xi)| *yi = alpha * xi + beta * *yi);
}
