//! Core types for the cgmark benchmark harness.
//!
//! This crate carries no numerical code. It defines the vocabulary the rest
//! of the workspace speaks:
//!
//! - [`Geometry`] - the 3-D worker grid and per-worker problem box
//! - [`Communicator`] - the collective-operation seam between workers
//! - [`RunRecord`] / [`SolveError`] - the outcome of one solver invocation
//! - [`PhaseTimings`] / [`Stopwatch`] - named timing buckets and wall clock

pub mod comm;
pub mod geometry;
pub mod record;
pub mod timing;

pub use comm::{Communicator, SingleProcess};
pub use geometry::Geometry;
pub use record::{RunRecord, SolveError};
pub use timing::{PhaseTimings, Stopwatch};
