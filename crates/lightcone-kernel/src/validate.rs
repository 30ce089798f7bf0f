//! Kernel-versus-oracle validation report.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::LightconeResult;
use crate::kernel::KernelOutput;
use crate::matrix::{CellMismatch, RelationMatrix};
use crate::oracle::reference_relations;
use crate::points::PointSet;

/// Mismatching cells kept in a report.
pub const MAX_REPORTED_MISMATCHES: usize = 16;

/// Statistics of one relation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatrixSummary {
    pub max_value: u8,
    pub argmax: (usize, usize),
    /// Sum of |m - mᵀ|; zero for a symmetric matrix.
    pub symmetry_residual: u64,
    pub unit_diagonal: bool,
    pub related_pairs: u64,
}

impl MatrixSummary {
    pub fn of(matrix: &RelationMatrix) -> Self {
        Self {
            max_value: matrix.max_value(),
            argmax: matrix.argmax(),
            symmetry_residual: matrix.symmetry_residual(),
            unit_diagonal: matrix.has_unit_diagonal(),
            related_pairs: matrix.related_pairs(),
        }
    }

    /// Symmetric, unit diagonal, binary.
    pub fn is_well_formed(&self) -> bool {
        self.symmetry_residual == 0 && self.unit_diagonal && self.max_value <= 1
    }
}

/// Outcome of comparing a kernel result with the reference oracle.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub n: usize,
    pub tile_side: u32,
    pub grid: (u32, u32),
    #[serde(serialize_with = "serialize_secs")]
    pub kernel_elapsed: Duration,
    #[serde(serialize_with = "serialize_secs")]
    pub oracle_elapsed: Duration,
    pub kernel: MatrixSummary,
    pub reference: MatrixSummary,
    /// max |reference - kernel| over all cells.
    pub max_abs_diff: u8,
    pub mismatch_count: usize,
    /// First mismatches in row-major order; `left` is the kernel value.
    pub mismatches: Vec<CellMismatch>,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl ValidationReport {
    /// Kernel output equals the oracle and both are well formed.
    pub fn is_valid(&self) -> bool {
        self.mismatch_count == 0 && self.kernel.is_well_formed() && self.reference.is_well_formed()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Points: {}  tile: {}x{}  grid: {}x{}",
            self.n, self.tile_side, self.tile_side, self.grid.0, self.grid.1
        )?;
        writeln!(f, "Kernel time: {:.2e}s", self.kernel_elapsed.as_secs_f64())?;
        writeln!(f, "Oracle time: {:.2e}s", self.oracle_elapsed.as_secs_f64())?;
        writeln!(
            f,
            "kernel.max() = {}, kernel.argmax() = {:?}",
            self.kernel.max_value, self.kernel.argmax
        )?;
        writeln!(
            f,
            "oracle.max() = {}, oracle.argmax() = {:?}",
            self.reference.max_value, self.reference.argmax
        )?;
        writeln!(
            f,
            "Kernel symmetry residual (should be 0): {}",
            self.kernel.symmetry_residual
        )?;
        writeln!(
            f,
            "Oracle symmetry residual (should be 0): {}",
            self.reference.symmetry_residual
        )?;
        writeln!(f, "Related pairs: {}", self.kernel.related_pairs)?;
        writeln!(f, "Max |oracle - kernel| (should be 0): {}", self.max_abs_diff)?;
        for m in &self.mismatches {
            writeln!(
                f,
                "  mismatch at ({}, {}): kernel={} oracle={}",
                m.row, m.col, m.left, m.right
            )?;
        }
        if self.mismatch_count > self.mismatches.len() {
            writeln!(f, "  ... {} more", self.mismatch_count - self.mismatches.len())?;
        }
        write!(f, "Result: {}", if self.is_valid() { "PASS" } else { "FAIL" })
    }
}

/// Recompute `points` with the oracle and compare against `output`.
///
/// # Errors
///
/// `AllocationFailure` if the oracle matrix cannot be reserved, or
/// `ShapeMismatch` if `output` was computed for a different N.
#[instrument(skip_all, fields(n = points.len()))]
pub fn validate_against_reference(
    output: &KernelOutput,
    points: &PointSet,
) -> LightconeResult<ValidationReport> {
    let started = std::time::Instant::now();
    let reference = reference_relations(points)?;
    let oracle_elapsed = started.elapsed();

    let kernel = &output.matrix;
    let mismatch_count = kernel.mismatch_count(&reference)?;
    let report = ValidationReport {
        n: points.len(),
        tile_side: output.grid.tile_side,
        grid: (output.grid.grid_x, output.grid.grid_y),
        kernel_elapsed: output.elapsed,
        oracle_elapsed,
        kernel: MatrixSummary::of(kernel),
        reference: MatrixSummary::of(&reference),
        max_abs_diff: reference.max_abs_diff(kernel)?,
        mismatch_count,
        mismatches: kernel.mismatches(&reference, MAX_REPORTED_MISMATCHES)?,
    };

    if report.is_valid() {
        info!(related_pairs = report.kernel.related_pairs, "Kernel matches reference");
    } else {
        warn!(
            mismatch_count,
            kernel_residual = report.kernel.symmetry_residual,
            "Kernel output disagrees with reference"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::grid::LaunchGrid;

    fn output_for(points: &PointSet, cells: Vec<u8>) -> KernelOutput {
        let n = points.len();
        KernelOutput {
            matrix: RelationMatrix::from_cells(n, cells).unwrap(),
            elapsed: Duration::from_millis(3),
            grid: LaunchGrid::for_problem(n, &KernelConfig::default()).unwrap(),
        }
    }

    fn timelike_pair() -> PointSet {
        PointSet::from_columns(vec![0.0, 10.0], vec![0.0, 1.0], vec![0.0, 0.0], vec![0.0, 0.0])
            .unwrap()
    }

    #[test]
    fn test_matching_output_is_valid() {
        let points = timelike_pair();
        let report = validate_against_reference(&output_for(&points, vec![1, 1, 1, 1]), &points)
            .unwrap();
        assert!(report.is_valid());
        assert_eq!(report.mismatch_count, 0);
        assert_eq!(report.max_abs_diff, 0);
        assert_eq!(report.kernel.related_pairs, 1);
        assert_eq!(report.grid, (1, 1));
        let text = report.to_string();
        assert!(text.contains("kernel.max() = 1, kernel.argmax() = (0, 0)"));
        assert!(text.contains("oracle.max() = 1, oracle.argmax() = (0, 0)"));
        assert!(text.ends_with("Result: PASS"));
    }

    #[test]
    fn test_mismatch_is_reported() {
        let points = timelike_pair();
        let report = validate_against_reference(&output_for(&points, vec![1, 0, 0, 1]), &points)
            .unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.mismatch_count, 2);
        assert_eq!(report.max_abs_diff, 1);
        let first = CellMismatch {
            row: 0,
            col: 1,
            left: 0,
            right: 1,
        };
        assert_eq!(report.mismatches[0], first);
        let text = report.to_string();
        assert!(text.contains("mismatch at (0, 1): kernel=0 oracle=1"));
        assert!(text.ends_with("Result: FAIL"));
    }

    #[test]
    fn test_asymmetric_output_is_invalid() {
        let points = timelike_pair();
        let report = validate_against_reference(&output_for(&points, vec![1, 1, 0, 1]), &points)
            .unwrap();
        assert_eq!(report.kernel.symmetry_residual, 2);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_report_serializes_to_json() {
        let points = timelike_pair();
        let report = validate_against_reference(&output_for(&points, vec![1, 1, 1, 1]), &points)
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["n"], 2);
        assert_eq!(json["mismatch_count"], 0);
        assert_eq!(json["kernel"]["argmax"], serde_json::json!([0, 0]));
        assert!((json["kernel_elapsed"].as_f64().unwrap() - 0.003).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_size_output_rejected() {
        let points = timelike_pair();
        let bad = KernelOutput {
            matrix: RelationMatrix::identity(3).unwrap(),
            elapsed: Duration::ZERO,
            grid: LaunchGrid::for_problem(3, &KernelConfig::default()).unwrap(),
        };
        assert!(validate_against_reference(&bad, &points).is_err());
    }
}
