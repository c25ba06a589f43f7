//! Quality aggregation: from residual samples to the final verdict.

use serde::Serialize;

use cgmark_core::PhaseTimings;
use cgmark_kernels::CorrectnessTally;

use crate::calibration::CalibrationResult;
use crate::schedule::ScoredPhase;

/// Scaled-residual samples from the scored phase.
///
/// Append-only while the phase runs, read-only during aggregation; one
/// entry per scored repetition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SampleSet {
    values: Vec<f64>,
}

impl SampleSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
        }
    }
}

impl FromIterator<f64> for SampleSet {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Outcome of evaluating a sample set against the calibrated threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityReport {
    /// Threshold the samples were held to.
    pub threshold: f64,
    /// Samples that were non-finite, negative, or above the threshold.
    pub failure_tally: usize,
}

/// Hold every sample to the calibrated accuracy threshold.
///
/// A sample passes if it is finite, non-negative, and no greater than the
/// threshold; everything else counts toward the failure tally.
pub fn evaluate(samples: &SampleSet, threshold: f64) -> QualityReport {
    let failure_tally = samples
        .as_slice()
        .iter()
        .filter(|&&s| !(s.is_finite() && (0.0..=threshold).contains(&s)))
        .count();

    QualityReport {
        threshold,
        failure_tally,
    }
}

/// The terminal benchmark artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkVerdict {
    /// True if any failure channel fired: sample failures, calibration
    /// tolerance failures, or correctness-suite failures.
    pub global_failure: bool,
    /// Iterations spent across all scored runs.
    pub total_iterations: usize,
    /// Scored repetitions executed.
    pub repetition_count: usize,
    /// The scaled-residual samples, one per repetition.
    pub samples: SampleSet,
    /// Phase-by-phase timing breakdown.
    pub timings: PhaseTimings,
}

impl BenchmarkVerdict {
    /// Fold the three failure channels into the terminal verdict.
    pub fn new(
        scored: ScoredPhase,
        quality: &QualityReport,
        calibration: &CalibrationResult,
        correctness: &CorrectnessTally,
        timings: PhaseTimings,
    ) -> Self {
        let global_failure = quality.failure_tally > 0
            || calibration.tolerance_failures > 0
            || correctness.any_failed();

        Self {
            global_failure,
            total_iterations: scored.total_iterations,
            repetition_count: scored.samples.len(),
            samples: scored.samples,
            timings,
        }
    }
}
