//! The structured result document.
//!
//! Everything a reader needs to judge a run lands in one key/value record:
//! problem shape, calibration outcome, schedule, sample statistics, timing
//! breakdown, and the failure verdict. Only the reporting worker emits it.

use std::io::Write;

use serde::Serialize;

use cgmark_core::{Geometry, PhaseTimings};
use cgmark_kernels::CorrectnessTally;

use crate::calibration::CalibrationResult;
use crate::quality::{BenchmarkVerdict, QualityReport};

/// Summary statistics over the scaled-residual samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// The complete benchmark result document.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub benchmark: &'static str,
    pub version: &'static str,
    /// Local per-worker problem dimensions.
    pub dimensions: [usize; 3],
    /// Worker-grid dimensions.
    pub worker_grid: [usize; 3],
    pub workers: usize,
    pub budget_seconds: f64,
    pub calibration: CalibrationResult,
    pub correctness: CorrectnessTally,
    pub quality: QualityReport,
    pub repetition_count: usize,
    pub total_iterations: usize,
    /// Wall time of the scored phase; the score derives from this.
    pub scored_seconds: f64,
    pub samples: SampleSummary,
    pub scaled_residuals: Vec<f64>,
    pub timings: PhaseTimings,
    pub global_failure: bool,
}

impl Report {
    /// Assemble the document from the phase artifacts.
    pub fn new(
        geometry: &Geometry,
        budget_seconds: f64,
        scored_seconds: f64,
        calibration: CalibrationResult,
        correctness: CorrectnessTally,
        quality: QualityReport,
        verdict: BenchmarkVerdict,
    ) -> Self {
        let samples = SampleSummary {
            count: verdict.samples.len(),
            min: verdict.samples.min().unwrap_or(0.0),
            max: verdict.samples.max().unwrap_or(0.0),
            mean: verdict.samples.mean().unwrap_or(0.0),
        };

        Self {
            benchmark: "cgmark",
            version: env!("CARGO_PKG_VERSION"),
            dimensions: [geometry.nx, geometry.ny, geometry.nz],
            worker_grid: [geometry.npx, geometry.npy, geometry.npz],
            workers: geometry.size,
            budget_seconds,
            calibration,
            correctness,
            quality,
            repetition_count: verdict.repetition_count,
            total_iterations: verdict.total_iterations,
            scored_seconds,
            samples,
            scaled_residuals: verdict.samples.as_slice().to_vec(),
            timings: verdict.timings,
            global_failure: verdict.global_failure,
        }
    }
}

/// Write the report as pretty-printed JSON.
///
/// Non-collective: only the reporting worker calls this.
pub fn emit_report<W: Write>(report: &Report, mut writer: W) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    // Trailing newline so shell pipelines see a complete line
    let _ = writer.write_all(b"\n");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::SampleSet;
    use crate::schedule::ScoredPhase;
    use cgmark_core::PhaseTimings;

    fn sample_report() -> Report {
        let geometry = Geometry::new(1, 0, 8, 8, 8);
        let samples: SampleSet = [1e-10, 2e-10].into_iter().collect();
        let calibration = CalibrationResult {
            target_tolerance: 1e-9,
            required_iterations: 50,
            worst_case_seconds: 0.5,
            tolerance_failures: 0,
            error_count: 0,
        };
        let quality = crate::quality::evaluate(&samples, calibration.target_tolerance);
        let scored = ScoredPhase {
            total_iterations: 100,
            samples,
            error_count: 0,
            elapsed_seconds: 1.25,
        };
        let verdict = BenchmarkVerdict::new(
            scored,
            &quality,
            &calibration,
            &CorrectnessTally::default(),
            PhaseTimings::new(),
        );
        Report::new(
            &geometry,
            60.0,
            1.25,
            calibration,
            CorrectnessTally::default(),
            quality,
            verdict,
        )
    }

    #[test]
    fn report_carries_the_verdict() {
        let report = sample_report();
        assert_eq!(report.repetition_count, 2);
        assert_eq!(report.total_iterations, 100);
        assert!(!report.global_failure);
        assert_eq!(report.samples.count, 2);
        assert_eq!(report.samples.min, 1e-10);
        assert_eq!(report.samples.max, 2e-10);
    }

    #[test]
    fn emits_structured_json() {
        let report = sample_report();
        let mut out = Vec::new();
        emit_report(&report, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["benchmark"], "cgmark");
        assert_eq!(value["workers"], 1);
        assert_eq!(value["repetition_count"], 2);
        assert_eq!(value["global_failure"], false);
        assert!(value["timings"]["spmv"].is_number());
        assert!(value["calibration"]["worst_case_seconds"].is_number());
    }
}
