//! Dense N×N relation matrix.

use serde::Serialize;

use crate::error::{LightconeError, LightconeResult};
use crate::light_cone::RELATED;

/// One disagreeing cell between two matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellMismatch {
    pub row: usize,
    pub col: usize,
    /// Value in `self`.
    pub left: u8,
    /// Value in the matrix compared against.
    pub right: u8,
}

/// Symmetric 0/1 matrix, row-major.
///
/// # Example
///
/// ```
/// use lightcone_kernel::RelationMatrix;
///
/// let m = RelationMatrix::identity(3).unwrap();
/// assert_eq!(m.get(1, 1), 1);
/// assert_eq!(m.get(0, 2), 0);
/// assert!(m.is_symmetric());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMatrix {
    n: usize,
    cells: Vec<u8>,
}

impl RelationMatrix {
    /// Wrap row-major cells.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if `cells.len() != n * n`.
    pub fn from_cells(n: usize, cells: Vec<u8>) -> LightconeResult<Self> {
        let expected = n.checked_mul(n).ok_or_else(|| {
            LightconeError::allocation::<u8>(usize::MAX, format!("{n}x{n} matrix overflows usize"))
        })?;
        if cells.len() != expected {
            return Err(LightconeError::ShapeMismatch {
                axis: "cells",
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self { n, cells })
    }

    /// N×N identity, with reserved host memory.
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if N² bytes cannot be reserved.
    pub fn identity(n: usize) -> LightconeResult<Self> {
        let mut cells = host_cells(n)?;
        for i in 0..n {
            cells[i * n + i] = RELATED;
        }
        Ok(Self { n, cells })
    }

    /// Side length N.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row * self.n + col]
    }

    #[inline]
    pub(crate) fn set_pair(&mut self, i: usize, j: usize, value: u8) {
        self.cells[i * self.n + j] = value;
        self.cells[j * self.n + i] = value;
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.cells[row * self.n..(row + 1) * self.n]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    /// Nested rows, for printing small matrices.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells.chunks(self.n.max(1)).map(<[u8]>::to_vec).collect()
    }

    /// Sum of |m[i][j] - m[j][i]| over all cells. Zero iff symmetric.
    pub fn symmetry_residual(&self) -> u64 {
        let mut residual = 0u64;
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                let diff = self.get(i, j).abs_diff(self.get(j, i));
                residual += 2 * u64::from(diff);
            }
        }
        residual
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetry_residual() == 0
    }

    pub fn has_unit_diagonal(&self) -> bool {
        (0..self.n).all(|i| self.get(i, i) == RELATED)
    }

    /// True iff every cell is 0 or 1.
    pub fn is_binary(&self) -> bool {
        self.cells.iter().all(|&c| c <= RELATED)
    }

    pub fn max_value(&self) -> u8 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// `(row, col)` of the first maximal cell in row-major order.
    pub fn argmax(&self) -> (usize, usize) {
        let max = self.max_value();
        let flat = self.cells.iter().position(|&c| c == max).unwrap_or(0);
        (flat / self.n.max(1), flat % self.n.max(1))
    }

    /// Related unordered pairs `{i, j}` with `i != j`, read from the upper triangle.
    pub fn related_pairs(&self) -> u64 {
        let mut count = 0u64;
        for i in 0..self.n {
            count += self.row(i)[i + 1..]
                .iter()
                .filter(|&&c| c == RELATED)
                .count() as u64;
        }
        count
    }

    /// Cells where `self` and `other` differ, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the matrices have different sides.
    pub fn mismatches(&self, other: &Self, limit: usize) -> LightconeResult<Vec<CellMismatch>> {
        self.check_same_shape(other)?;
        Ok(self
            .cells
            .iter()
            .zip(other.cells.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .take(limit)
            .map(|(flat, (&left, &right))| CellMismatch {
                row: flat / self.n,
                col: flat % self.n,
                left,
                right,
            })
            .collect())
    }

    /// Number of differing cells.
    pub fn mismatch_count(&self, other: &Self) -> LightconeResult<usize> {
        self.check_same_shape(other)?;
        Ok(self
            .cells
            .iter()
            .zip(other.cells.iter())
            .filter(|(a, b)| a != b)
            .count())
    }

    /// max |self - other| over all cells.
    pub fn max_abs_diff(&self, other: &Self) -> LightconeResult<u8> {
        self.check_same_shape(other)?;
        Ok(self
            .cells
            .iter()
            .zip(other.cells.iter())
            .map(|(a, b)| a.abs_diff(*b))
            .max()
            .unwrap_or(0))
    }

    fn check_same_shape(&self, other: &Self) -> LightconeResult<()> {
        if self.n != other.n {
            return Err(LightconeError::ShapeMismatch {
                axis: "matrix",
                expected: self.n,
                actual: other.n,
            });
        }
        Ok(())
    }
}

/// Zeroed host buffer of N² cells, failing instead of aborting on OOM.
pub(crate) fn host_cells(n: usize) -> LightconeResult<Vec<u8>> {
    let len = n.checked_mul(n).ok_or_else(|| {
        LightconeError::allocation::<u8>(usize::MAX, format!("{n}x{n} matrix overflows usize"))
    })?;
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(len)
        .map_err(|e| LightconeError::allocation::<u8>(len, e.to_string()))?;
    cells.resize(len, 0);
    Ok(cells)
}
