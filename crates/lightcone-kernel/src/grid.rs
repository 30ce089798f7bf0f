//! 2D launch grid over the N×N pair-index space.
//!
//! ```text
//!            j ->
//!         +--------+--------+--------+
//!   i     | (0,0)  | (0,1)  | (0,2)  |   each block is tile_side × tile_side lanes
//!   |     +--------+--------+--------+
//!   v     |  skip  | (1,1)  | (1,2)  |   lane (i, j) works only if i <= j < N
//!         +--------+--------+--------+
//!         |  skip  |  skip  | (2,2)  |
//!         +--------+--------+--------+
//! ```
//!
//! Block `(bx, by)` covers rows `bx*side..` and columns `by*side..`. Blocks
//! entirely below the diagonal still exist in the grid; their lanes hit the
//! triangle guard and exit.

use crate::config::KernelConfig;
use crate::error::{LightconeError, LightconeResult};

/// Index of a block in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockIdx {
    pub x: u32,
    pub y: u32,
}

/// Grid geometry for one launch.
///
/// # Example
///
/// ```
/// use lightcone_kernel::{KernelConfig, LaunchGrid};
///
/// let grid = LaunchGrid::for_problem(4500, &KernelConfig::default()).unwrap();
/// assert_eq!(grid.tile_side, 32);
/// assert_eq!((grid.grid_x, grid.grid_y), (141, 141));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchGrid {
    /// Problem size N.
    pub n: usize,
    /// Lanes per block side.
    pub tile_side: u32,
    /// Blocks along the row axis, `ceil(N / tile_side)`.
    pub grid_x: u32,
    /// Blocks along the column axis, `ceil(N / tile_side)`.
    pub grid_y: u32,
}

impl LaunchGrid {
    /// Partition an N×N problem. `config` must already be validated.
    ///
    /// # Errors
    ///
    /// - `EmptyPointSet` if `n == 0`
    /// - `InvalidConfig` if the block count per axis exceeds `u32`, or the
    ///   lane or pair counts overflow `usize`
    pub fn for_problem(n: usize, config: &KernelConfig) -> LightconeResult<Self> {
        if n == 0 {
            return Err(LightconeError::EmptyPointSet);
        }
        let tile_side = config.tile_side().max(1);
        let blocks = u32::try_from(n.div_ceil(tile_side as usize)).map_err(|_| {
            LightconeError::InvalidConfig(format!(
                "{n} points need more than {} blocks per axis with tile side {tile_side}",
                u32::MAX
            ))
        })?;
        let grid = Self {
            n,
            tile_side,
            grid_x: blocks,
            grid_y: blocks,
        };
        if grid.checked_total_lanes().is_none() || grid.checked_active_pairs().is_none() {
            return Err(LightconeError::InvalidConfig(format!(
                "{n} points overflow the lane index space"
            )));
        }
        Ok(grid)
    }

    pub fn block_count(&self) -> usize {
        (self.grid_x as usize).saturating_mul(self.grid_y as usize)
    }

    /// Lanes launched, including guarded ones.
    pub fn total_lanes(&self) -> usize {
        self.checked_total_lanes().unwrap_or(usize::MAX)
    }

    /// Lanes that pass the guard: N(N+1)/2.
    pub fn active_pairs(&self) -> usize {
        self.checked_active_pairs().unwrap_or(usize::MAX)
    }

    fn checked_total_lanes(&self) -> Option<usize> {
        let side = self.tile_side as usize;
        (self.grid_x as usize)
            .checked_mul(self.grid_y as usize)?
            .checked_mul(side.checked_mul(side)?)
    }

    fn checked_active_pairs(&self) -> Option<usize> {
        // Halve whichever of n, n + 1 is even before multiplying
        if self.n % 2 == 0 {
            (self.n / 2).checked_mul(self.n + 1)
        } else {
            (self.n / 2 + 1).checked_mul(self.n)
        }
    }

    /// Block at flat position `flat` (row-major over `grid_x × grid_y`).
    #[inline]
    pub fn block_at(&self, flat: usize) -> BlockIdx {
        BlockIdx {
            x: (flat / self.grid_y as usize) as u32,
            y: (flat % self.grid_y as usize) as u32,
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = BlockIdx> + '_ {
        (0..self.block_count()).map(move |flat| self.block_at(flat))
    }

    /// Global `(i, j)` of every lane in `block`, guarded or not.
    pub fn lanes(&self, block: BlockIdx) -> impl Iterator<Item = (usize, usize)> {
        let side = self.tile_side as usize;
        let row0 = block.x as usize * side;
        let col0 = block.y as usize * side;
        (0..side).flat_map(move |tx| (0..side).map(move |ty| (row0 + tx, col0 + ty)))
    }

    /// Triangle and bounds guard: the lane does work iff `i <= j < N`.
    #[inline(always)]
    pub fn lane_is_active(&self, i: usize, j: usize) -> bool {
        i < self.n && j < self.n && j >= i
    }

    /// True if no lane of `block` can pass the guard.
    #[inline]
    pub fn block_is_idle(&self, block: BlockIdx) -> bool {
        let side = self.tile_side as usize;
        let row0 = block.x as usize * side;
        let col_end = (block.y as usize + 1) * side;
        row0 >= self.n || col_end <= row0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize, block_size: u32) -> LaunchGrid {
        LaunchGrid::for_problem(n, &KernelConfig::with_block_size(block_size).unwrap()).unwrap()
    }

    #[test]
    fn test_grid_dimensions_ceil() {
        let g = grid(100, 1024);
        assert_eq!(g.tile_side, 32);
        assert_eq!(g.grid_x, 4);
        assert_eq!(g.grid_y, 4);
        assert_eq!(g.block_count(), 16);
        assert_eq!(g.total_lanes(), 16 * 1024);
    }

    #[test]
    fn test_grid_exact_multiple() {
        let g = grid(64, 1024);
        assert_eq!((g.grid_x, g.grid_y), (2, 2));
    }

    #[test]
    fn test_grid_single_point() {
        let g = grid(1, 1024);
        assert_eq!(g.block_count(), 1);
        assert_eq!(g.active_pairs(), 1);
        let active: Vec<_> = g
            .blocks()
            .flat_map(|b| g.lanes(b))
            .filter(|&(i, j)| g.lane_is_active(i, j))
            .collect();
        assert_eq!(active, vec![(0, 0)]);
    }

    #[test]
    fn test_lanes_cover_every_pair_exactly_once() {
        let g = grid(10, 9);
        let mut seen = vec![0u32; 100];
        for block in g.blocks() {
            for (i, j) in g.lanes(block) {
                if i < 10 && j < 10 {
                    seen[i * 10 + j] += 1;
                }
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_active_lanes_are_upper_triangle() {
        let g = grid(7, 4);
        let active: usize = g
            .blocks()
            .flat_map(|b| g.lanes(b))
            .filter(|&(i, j)| g.lane_is_active(i, j))
            .count();
        assert_eq!(active, g.active_pairs());
        assert_eq!(active, 28);
    }

    #[test]
    fn test_guard_rejects_out_of_range_and_lower_triangle() {
        let g = grid(5, 4);
        assert!(g.lane_is_active(0, 0));
        assert!(g.lane_is_active(2, 4));
        assert!(!g.lane_is_active(4, 2));
        assert!(!g.lane_is_active(5, 5));
        assert!(!g.lane_is_active(0, 5));
    }

    #[test]
    fn test_idle_blocks_have_no_active_lanes() {
        let g = grid(9, 4);
        for block in g.blocks() {
            let any_active = g.lanes(block).any(|(i, j)| g.lane_is_active(i, j));
            assert_eq!(
                g.block_is_idle(block),
                !any_active,
                "block {:?} idle flag disagrees with lanes",
                block
            );
        }
    }

    #[test]
    fn test_for_problem_rejects_empty() {
        let err = LaunchGrid::for_problem(0, &KernelConfig::default()).unwrap_err();
        assert!(matches!(err, LightconeError::EmptyPointSet));
    }

    #[test]
    fn test_for_problem_rejects_lane_overflow() {
        println!("\n=== TEST: Oversized problem ===");
        let err = LaunchGrid::for_problem(5_000_000_000, &KernelConfig::default()).unwrap_err();
        println!("AFTER: error={}", err);
        assert!(matches!(err, LightconeError::InvalidConfig(_)));
        println!("=== PASSED ===\n");
    }

    #[test]
    fn test_for_problem_rejects_block_count_overflow() {
        let config = KernelConfig::with_block_size(1).unwrap();
        let err = LaunchGrid::for_problem(u32::MAX as usize + 1, &config).unwrap_err();
        assert!(matches!(err, LightconeError::InvalidConfig(_)));
    }

    #[test]
    fn test_large_problem_counts_are_exact() {
        let n = 3_000_000_001usize;
        let g = grid(n, 1024);
        assert_eq!(g.grid_x, 93_750_001);
        assert_eq!(g.active_pairs() as u128, n as u128 * (n as u128 + 1) / 2);
        assert_eq!(g.total_lanes() as u128, 93_750_001u128 * 93_750_001 * 1024);
        let g = grid(4500, 1024);
        assert_eq!(g.active_pairs(), 10_127_250);
    }
}
