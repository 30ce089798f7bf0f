//! Light-cone relation kernel.
//!
//! For N spacetime points `{t, x, y, z}` this crate computes the symmetric
//! N×N 0/1 matrix whose `(i, j)` entry is 1 iff
//! `(t_i - t_j)² >= |r_i - r_j|²`, with a unit diagonal.
//!
//! - [`launch_relations`] / [`compute_relations`]: data-parallel kernel over a
//!   2D grid of square tiles, dispatched on an explicitly acquired [`Device`]
//! - [`compute_relations_reference`]: sequential oracle over the upper triangle
//! - [`validate_against_reference`]: element-wise comparison plus statistics
//!
//! # Example
//!
//! ```
//! use lightcone_kernel::{
//!     launch_relations, validate_against_reference, Device, DeviceConfig, KernelConfig,
//!     PointSet,
//! };
//!
//! let device = Device::init(DeviceConfig::default()).unwrap();
//! let points = PointSet::random_normal(256, 42).unwrap();
//!
//! let output = launch_relations(&device, &points, &KernelConfig::default())
//!     .unwrap()
//!     .synchronize()
//!     .unwrap();
//! let report = validate_against_reference(&output, &points).unwrap();
//! assert!(report.is_valid());
//!
//! device.shutdown();
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod grid;
pub mod kernel;
pub mod light_cone;
pub mod matrix;
pub mod oracle;
pub mod points;
pub mod validate;

pub use config::{DeviceConfig, KernelConfig, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};
pub use device::{Device, DeviceBuffer};
pub use error::{LightconeError, LightconeResult};
pub use grid::{BlockIdx, LaunchGrid};
pub use kernel::{compute_relations, launch_relations, KernelLaunch, KernelOutput};
pub use matrix::{CellMismatch, RelationMatrix};
pub use oracle::{compute_relations_reference, reference_relations};
pub use points::{PointSet, POINT_DIM};
pub use validate::{validate_against_reference, MatrixSummary, ValidationReport};
