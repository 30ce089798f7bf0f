//! Spacetime point sets stored as four parallel coordinate columns.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::error::{LightconeError, LightconeResult};

/// Number of coordinates per point (t, x, y, z).
pub const POINT_DIM: usize = 4;

/// Immutable set of N spacetime points, column-major.
///
/// The index of a point is its only identity. Construction guarantees all
/// four columns share length N >= 1.
///
/// # Example
///
/// ```
/// use lightcone_kernel::PointSet;
///
/// let points = PointSet::from_columns(
///     vec![0.0, 10.0],
///     vec![0.0, 1.0],
///     vec![0.0, 0.0],
///     vec![0.0, 0.0],
/// ).unwrap();
/// assert_eq!(points.len(), 2);
/// assert_eq!(points.point(1), [10.0, 1.0, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    t: Vec<f32>,
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<f32>,
}

impl PointSet {
    /// Build a point set from owned columns.
    ///
    /// # Errors
    ///
    /// - `EmptyPointSet` if the `t` column is empty
    /// - `ShapeMismatch` naming the first column whose length differs from `t`
    pub fn from_columns(
        t: Vec<f32>,
        x: Vec<f32>,
        y: Vec<f32>,
        z: Vec<f32>,
    ) -> LightconeResult<Self> {
        check_shape(&t, &x, &y, &z)?;
        Ok(Self { t, x, y, z })
    }

    /// Build a point set by copying borrowed columns.
    ///
    /// # Errors
    ///
    /// Same as [`PointSet::from_columns`]. Shape is checked before copying.
    /// `AllocationFailure` if a host column cannot be reserved.
    pub fn from_slices(t: &[f32], x: &[f32], y: &[f32], z: &[f32]) -> LightconeResult<Self> {
        check_shape(t, x, y, z)?;
        Ok(Self {
            t: copy_column(t)?,
            x: copy_column(x)?,
            y: copy_column(y)?,
            z: copy_column(z)?,
        })
    }

    /// Draw `n` points with every coordinate from a standard normal.
    ///
    /// The same `seed` always yields the same point set.
    ///
    /// # Errors
    ///
    /// - `EmptyPointSet` if `n == 0`
    /// - `AllocationFailure` if a host column of `n` values cannot be reserved
    pub fn random_normal(n: usize, seed: u64) -> LightconeResult<Self> {
        if n == 0 {
            return Err(LightconeError::EmptyPointSet);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let column = |rng: &mut ChaCha8Rng| -> LightconeResult<Vec<f32>> {
            let mut values = host_column(n)?;
            values.extend((0..n).map(|_| rng.sample::<f32, _>(StandardNormal)));
            Ok(values)
        };
        let x = column(&mut rng)?;
        let y = column(&mut rng)?;
        let z = column(&mut rng)?;
        let t = column(&mut rng)?;
        Ok(Self { t, x, y, z })
    }

    /// Number of points (N).
    #[inline]
    pub fn len(&self) -> usize {
        self.t.len()
    }

    /// Always false: construction rejects empty sets.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    #[inline]
    pub fn t(&self) -> &[f32] {
        &self.t
    }

    #[inline]
    pub fn x(&self) -> &[f32] {
        &self.x
    }

    #[inline]
    pub fn y(&self) -> &[f32] {
        &self.y
    }

    #[inline]
    pub fn z(&self) -> &[f32] {
        &self.z
    }

    /// Coordinates of point `i` as `[t, x, y, z]`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[inline]
    pub fn point(&self, i: usize) -> [f32; POINT_DIM] {
        [self.t[i], self.x[i], self.y[i], self.z[i]]
    }

    /// Host memory held by the four columns.
    pub fn size_bytes(&self) -> usize {
        POINT_DIM * self.len() * std::mem::size_of::<f32>()
    }
}

/// Empty column with room for exactly `n` values.
fn host_column(n: usize) -> LightconeResult<Vec<f32>> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(n)
        .map_err(|e| LightconeError::allocation::<f32>(n, e.to_string()))?;
    Ok(values)
}

fn copy_column(src: &[f32]) -> LightconeResult<Vec<f32>> {
    let mut values = host_column(src.len())?;
    values.extend_from_slice(src);
    Ok(values)
}

fn check_shape(t: &[f32], x: &[f32], y: &[f32], z: &[f32]) -> LightconeResult<()> {
    let n = t.len();
    if n == 0 {
        return Err(LightconeError::EmptyPointSet);
    }
    for (axis, column) in [("x", x), ("y", y), ("z", z)] {
        if column.len() != n {
            return Err(LightconeError::ShapeMismatch {
                axis,
                expected: n,
                actual: column.len(),
            });
        }
    }
    Ok(())
}
