//! Error types for light-cone relation computation.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the device, the relation kernel and the reference oracle.
///
/// Every variant is fatal for the run that produced it. There is no
/// partial-result recovery: a failed launch never yields a matrix.
#[derive(Debug, Error)]
pub enum LightconeError {
    /// The device context (worker pool) could not be acquired.
    #[error("Failed to initialize compute device: {0}")]
    DeviceInitError(String),

    /// Device or host memory could not be reserved for a buffer.
    #[error("Memory allocation of {requested_bytes} bytes failed: {reason}")]
    AllocationFailure {
        requested_bytes: usize,
        reason: String,
    },

    /// Coordinate columns do not share the same length.
    #[error("Shape mismatch on column '{axis}': expected {expected} points, got {actual}")]
    ShapeMismatch {
        axis: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A point set must contain at least one point.
    #[error("Point set is empty, at least one point is required")]
    EmptyPointSet,

    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The kernel did not complete before the synchronization deadline.
    #[error("Kernel did not complete within {timeout:?}")]
    SynchronizationTimeout { timeout: Duration },

    /// A worker failed or the completion signal was lost.
    #[error("Kernel execution failed: {0}")]
    KernelError(String),
}

impl LightconeError {
    /// Build an allocation failure for `count` elements of `T`.
    pub fn allocation<T>(count: usize, reason: impl Into<String>) -> Self {
        Self::AllocationFailure {
            requested_bytes: count.saturating_mul(std::mem::size_of::<T>()),
            reason: reason.into(),
        }
    }
}

/// Result type for light-cone operations.
pub type LightconeResult<T> = Result<T, LightconeError>;
