//! Kernel and device configuration.
//!
//! # Block geometry
//!
//! A block is a square tile of lanes over the 2D pair-index space. The
//! configured `block_size` is the tile AREA; the tile side is its integer
//! square root, mirroring how a 1024-thread block becomes a 32×32 tile.

use std::time::Duration;

use crate::error::{LightconeError, LightconeResult};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default block area (32×32 lanes).
pub const DEFAULT_BLOCK_SIZE: u32 = 1024;

/// Upper bound on lanes per block.
pub const MAX_BLOCK_SIZE: u32 = 1024;

// ============================================================================
// Kernel configuration
// ============================================================================

/// Launch configuration for the relation kernel.
///
/// # Example
///
/// ```
/// use lightcone_kernel::KernelConfig;
///
/// let config = KernelConfig::default();
/// assert_eq!(config.block_size, 1024);
/// assert_eq!(config.tile_side(), 32);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Block area in lanes (1..=1024).
    pub block_size: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl KernelConfig {
    /// Create config with a custom block area.
    ///
    /// # Errors
    ///
    /// Returns error if the area is zero or exceeds [`MAX_BLOCK_SIZE`].
    ///
    /// # Example
    ///
    /// ```
    /// use lightcone_kernel::KernelConfig;
    ///
    /// let config = KernelConfig::with_block_size(256).unwrap();
    /// assert_eq!(config.tile_side(), 16);
    ///
    /// assert!(KernelConfig::with_block_size(0).is_err());
    /// ```
    pub fn with_block_size(block_size: u32) -> LightconeResult<Self> {
        let config = Self { block_size };
        config.validate()?;
        Ok(config)
    }

    /// Create config from a tile side length.
    ///
    /// # Errors
    ///
    /// Returns error if `side` is zero or `side²` exceeds [`MAX_BLOCK_SIZE`].
    pub fn with_tile_side(side: u32) -> LightconeResult<Self> {
        if side == 0 {
            return Err(LightconeError::InvalidConfig(
                "Tile side must be positive".to_string(),
            ));
        }
        let area = side.checked_mul(side).ok_or_else(|| {
            LightconeError::InvalidConfig(format!("Tile side {} overflows block area", side))
        })?;
        Self::with_block_size(area)
    }

    /// Validate configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `block_size` is zero
    /// - `block_size` exceeds [`MAX_BLOCK_SIZE`]
    pub fn validate(&self) -> LightconeResult<()> {
        if self.block_size == 0 {
            return Err(LightconeError::InvalidConfig(
                "Block size must be positive".to_string(),
            ));
        }
        if self.block_size > MAX_BLOCK_SIZE {
            return Err(LightconeError::InvalidConfig(format!(
                "Block size {} exceeds maximum of {} lanes",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        Ok(())
    }

    /// Side length of the square tile, `floor(sqrt(block_size))`.
    #[inline]
    pub fn tile_side(&self) -> u32 {
        self.block_size.isqrt()
    }

    /// Lanes actually launched per block (`tile_side²`).
    #[inline]
    pub fn lanes_per_block(&self) -> u32 {
        let side = self.tile_side();
        side * side
    }
}

// ============================================================================
// Device configuration
// ============================================================================

/// Configuration for acquiring a compute device.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use lightcone_kernel::DeviceConfig;
///
/// let config = DeviceConfig::default()
///     .with_worker_threads(4)
///     .with_memory_budget(64 * 1024 * 1024)
///     .with_sync_timeout(Duration::from_secs(30));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceConfig {
    /// Worker thread count. `None` uses one per logical core.
    pub worker_threads: Option<usize>,
    /// Device memory budget in bytes. `None` is unbounded.
    pub memory_budget_bytes: Option<usize>,
    /// Default deadline for [`crate::KernelLaunch::synchronize`].
    pub sync_timeout: Option<Duration>,
}

impl DeviceConfig {
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget_bytes = Some(bytes);
        self
    }

    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = Some(timeout);
        self
    }

    /// Validate configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit worker count or timeout is zero.
    pub fn validate(&self) -> LightconeResult<()> {
        if self.worker_threads == Some(0) {
            return Err(LightconeError::InvalidConfig(
                "Worker thread count must be positive".to_string(),
            ));
        }
        if self.sync_timeout == Some(Duration::ZERO) {
            return Err(LightconeError::InvalidConfig(
                "Synchronization timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
