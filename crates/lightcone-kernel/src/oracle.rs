//! Sequential reference implementation of the relation matrix.
//!
//! Ground truth for validating the data-parallel kernel. O(N²) on a single
//! thread, so keep N small.

use tracing::{debug, instrument};

use crate::error::LightconeResult;
use crate::light_cone::relation_cell;
use crate::matrix::RelationMatrix;
use crate::points::PointSet;

/// Compute the relation matrix sequentially.
///
/// Starts from the identity and walks the strict upper triangle, mirroring
/// each result into `(j, i)`.
///
/// # Errors
///
/// - `EmptyPointSet` / `ShapeMismatch` on invalid columns
/// - `AllocationFailure` if the N² matrix cannot be reserved
///
/// # Example
///
/// ```
/// use lightcone_kernel::compute_relations_reference;
///
/// let m = compute_relations_reference(&[0.0, 0.0], &[0.0, 5.0], &[0.0, 0.0], &[0.0, 0.0])
///     .unwrap();
/// assert_eq!(m.to_rows(), vec![vec![1, 0], vec![0, 1]]);
/// ```
pub fn compute_relations_reference(
    t: &[f32],
    x: &[f32],
    y: &[f32],
    z: &[f32],
) -> LightconeResult<RelationMatrix> {
    let points = PointSet::from_slices(t, x, y, z)?;
    reference_relations(&points)
}

/// [`compute_relations_reference`] over an already validated point set.
#[instrument(skip_all, fields(n = points.len()))]
pub fn reference_relations(points: &PointSet) -> LightconeResult<RelationMatrix> {
    let n = points.len();
    let (t, x, y, z) = (points.t(), points.x(), points.y(), points.z());

    let mut matrix = RelationMatrix::identity(n)?;
    for i in 0..n {
        for j in (i + 1)..n {
            let cell = relation_cell(t[i] - t[j], x[i] - x[j], y[i] - y[j], z[i] - z[j]);
            matrix.set_pair(i, j, cell);
        }
    }

    debug!(n, related_pairs = matrix.related_pairs(), "Reference relations computed");
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LightconeError;

    #[test]
    fn test_single_point_is_identity() {
        let m = compute_relations_reference(&[3.0], &[1.0], &[2.0], &[-4.0]).unwrap();
        assert_eq!(m.to_rows(), vec![vec![1]]);
    }

    #[test]
    fn test_spacelike_pair() {
        let m = compute_relations_reference(&[0.0, 0.0], &[0.0, 5.0], &[0.0, 0.0], &[0.0, 0.0])
            .unwrap();
        assert_eq!(m.to_rows(), vec![vec![1, 0], vec![0, 1]]);
    }

    #[test]
    fn test_timelike_pair() {
        let m = compute_relations_reference(&[0.0, 10.0], &[0.0, 1.0], &[0.0, 0.0], &[0.0, 0.0])
            .unwrap();
        assert_eq!(m.to_rows(), vec![vec![1, 1], vec![1, 1]]);
    }

    #[test]
    fn test_lightlike_pair_is_related() {
        let m = compute_relations_reference(&[0.0, 5.0], &[0.0, 5.0], &[0.0, 0.0], &[0.0, 0.0])
            .unwrap();
        assert_eq!(m.to_rows(), vec![vec![1, 1], vec![1, 1]]);
    }

    #[test]
    fn test_three_points_mixed() {
        // 0-1 timelike, 0-2 spacelike, 1-2 timelike
        let t = [0.0, 3.0, 0.0];
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 0.0, 0.0];
        let z = [0.0, 0.0, 0.0];
        let m = compute_relations_reference(&t, &x, &y, &z).unwrap();
        assert_eq!(
            m.to_rows(),
            vec![vec![1, 1, 0], vec![1, 1, 1], vec![0, 1, 1]]
        );
    }

    #[test]
    fn test_output_invariants_on_random_points() {
        let points = PointSet::random_normal(200, 11).unwrap();
        let m = reference_relations(&points).unwrap();
        assert!(m.is_symmetric());
        assert!(m.has_unit_diagonal());
        assert!(m.is_binary());
        assert!(m.related_pairs() > 0);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = compute_relations_reference(&[0.0, 1.0], &[0.0], &[0.0, 1.0], &[0.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, LightconeError::ShapeMismatch { axis: "x", .. }));
    }
}
