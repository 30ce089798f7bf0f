//! Data-parallel light-cone relation kernel.
//!
//! Every lane of the [`LaunchGrid`] evaluates exactly one index pair. Lanes
//! with `i >= N`, `j >= N` or `j < i` return immediately; each remaining
//! lane writes cell `(i, j)` and its mirror `(j, i)`. No two lanes touch the
//! same cell, so lanes share nothing and need no locks.
//!
//! # Launch lifecycle
//!
//! ```text
//! launch_relations() ──> KernelLaunch (in flight) ──synchronize()──> KernelOutput
//!        │                        │
//!   upload t,x,y,z           output unreadable
//!   alloc N×N output         until completion
//! ```
//!
//! Kernel time is measured on the device side and excludes the uploads and
//! the readback.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::config::KernelConfig;
use crate::device::{Device, DeviceBuffer};
use crate::error::{LightconeError, LightconeResult};
use crate::grid::LaunchGrid;
use crate::light_cone::{relation_cell, RELATED, UNRELATED};
use crate::matrix::{host_cells, RelationMatrix};
use crate::points::PointSet;

// ============================================================================
// Device-side state
// ============================================================================

/// Coordinate columns resident on the device.
struct DeviceInputs {
    t: DeviceBuffer<f32>,
    x: DeviceBuffer<f32>,
    y: DeviceBuffer<f32>,
    z: DeviceBuffer<f32>,
}

/// Output cells. Lanes store with relaxed ordering; completion of the
/// parallel loop and the completion channel order them before readback.
type OutputCells = DeviceBuffer<AtomicU8>;

struct Completion {
    output: OutputCells,
    elapsed: Duration,
}

type CompletionSignal = Result<Completion, String>;

// ============================================================================
// Lane
// ============================================================================

/// Body of one lane: evaluate pair `(i, j)` and write both mirrored cells.
#[inline(always)]
fn relation_lane(
    grid: &LaunchGrid,
    inputs: &DeviceInputs,
    out: &[AtomicU8],
    i: usize,
    j: usize,
) {
    if !grid.lane_is_active(i, j) {
        return;
    }

    let n = grid.n;
    let pos1 = i * n + j;
    let pos2 = j * n + i;

    if i == j {
        out[pos1].store(RELATED, Ordering::Relaxed);
        return;
    }

    let dt = inputs.t[i] - inputs.t[j];
    let dx = inputs.x[i] - inputs.x[j];
    let dy = inputs.y[i] - inputs.y[j];
    let dz = inputs.z[i] - inputs.z[j];

    let value = relation_cell(dt, dx, dy, dz);
    out[pos1].store(value, Ordering::Relaxed);
    out[pos2].store(value, Ordering::Relaxed);
}

/// Run every block of `grid` on the current pool.
fn run_grid(grid: &LaunchGrid, inputs: &DeviceInputs, out: &[AtomicU8]) {
    (0..grid.block_count()).into_par_iter().for_each(|flat| {
        let block = grid.block_at(flat);
        if grid.block_is_idle(block) {
            return;
        }
        for (i, j) in grid.lanes(block) {
            relation_lane(grid, inputs, out, i, j);
        }
    });
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

// ============================================================================
// Launch
// ============================================================================

/// Result of a completed kernel.
#[derive(Debug, Clone)]
pub struct KernelOutput {
    pub matrix: RelationMatrix,
    /// Wall-clock kernel time, transfers excluded.
    pub elapsed: Duration,
    pub grid: LaunchGrid,
}

/// A kernel in flight.
///
/// The output exists only on the device until [`KernelLaunch::synchronize`]
/// consumes this token. Dropping it discards the result. The token borrows
/// the device, so the device cannot be shut down while a launch is pending.
#[must_use = "a launched kernel must be synchronized to read its output"]
pub struct KernelLaunch<'d> {
    device: &'d Device,
    grid: LaunchGrid,
    completion: Receiver<CompletionSignal>,
}

impl<'d> KernelLaunch<'d> {
    pub fn grid(&self) -> &LaunchGrid {
        &self.grid
    }

    /// Block until the kernel completes, honouring the device's default
    /// deadline if one is configured.
    ///
    /// # Errors
    ///
    /// See [`KernelLaunch::synchronize_timeout`].
    pub fn synchronize(self) -> LightconeResult<KernelOutput> {
        let timeout = self.device.config().sync_timeout;
        self.wait(timeout)
    }

    /// Block until the kernel completes or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// - `SynchronizationTimeout` if the deadline passes; the output is discarded
    /// - `KernelError` if a worker panicked
    /// - `AllocationFailure` if the host readback buffer cannot be reserved
    pub fn synchronize_timeout(self, timeout: Duration) -> LightconeResult<KernelOutput> {
        self.wait(Some(timeout))
    }

    #[instrument(skip_all, fields(n = self.grid.n))]
    fn wait(self, timeout: Option<Duration>) -> LightconeResult<KernelOutput> {
        let signal = match timeout {
            Some(timeout) => self.completion.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    warn!(?timeout, "Kernel synchronization timed out");
                    LightconeError::SynchronizationTimeout { timeout }
                }
                RecvTimeoutError::Disconnected => lost_signal(),
            })?,
            None => self.completion.recv().map_err(|_| lost_signal())?,
        };
        let completion = signal.map_err(LightconeError::KernelError)?;

        let n = self.grid.n;
        let mut cells = host_cells(n)?;
        for (dst, src) in cells.iter_mut().zip(completion.output.iter()) {
            *dst = src.load(Ordering::Relaxed);
        }
        drop(completion.output);

        info!(
            n,
            elapsed_us = completion.elapsed.as_micros() as u64,
            "Relation kernel completed"
        );
        Ok(KernelOutput {
            matrix: RelationMatrix::from_cells(n, cells)?,
            elapsed: completion.elapsed,
            grid: self.grid,
        })
    }
}

fn lost_signal() -> LightconeError {
    LightconeError::KernelError("completion signal lost".to_string())
}

/// Upload `points`, allocate the output and dispatch the kernel.
///
/// Returns as soon as the work is queued on the device.
///
/// # Errors
///
/// - `InvalidConfig` if `config` fails validation
/// - `AllocationFailure` if inputs or the N×N output exceed device memory
///
/// # Example
///
/// ```
/// use lightcone_kernel::{launch_relations, Device, DeviceConfig, KernelConfig, PointSet};
///
/// let device = Device::init(DeviceConfig::default()).unwrap();
/// let points = PointSet::random_normal(100, 1).unwrap();
/// let launch = launch_relations(&device, &points, &KernelConfig::default()).unwrap();
/// let output = launch.synchronize().unwrap();
/// assert!(output.matrix.is_symmetric());
/// ```
#[instrument(skip_all, fields(n = points.len(), block_size = config.block_size))]
pub fn launch_relations<'d>(
    device: &'d Device,
    points: &PointSet,
    config: &KernelConfig,
) -> LightconeResult<KernelLaunch<'d>> {
    config.validate()?;

    let n = points.len();
    let grid = LaunchGrid::for_problem(n, config)?;
    let cell_count = n
        .checked_mul(n)
        .ok_or_else(|| LightconeError::allocation::<u8>(usize::MAX, "N² overflows usize"))?;

    let inputs = Arc::new(DeviceInputs {
        t: device.upload(points.t())?,
        x: device.upload(points.x())?,
        y: device.upload(points.y())?,
        z: device.upload(points.z())?,
    });
    let output = device.alloc_with(cell_count, || AtomicU8::new(UNRELATED))?;

    debug!(
        tile_side = grid.tile_side,
        grid_x = grid.grid_x,
        grid_y = grid.grid_y,
        total_lanes = grid.total_lanes(),
        active_pairs = grid.active_pairs(),
        device_bytes = device.memory_in_use(),
        "Dispatching relation kernel"
    );

    let (tx, rx) = mpsc::sync_channel::<CompletionSignal>(1);
    device.pool().spawn(move || {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_grid(&grid, &inputs, &output)));
        let elapsed = started.elapsed();
        drop(inputs);
        let signal = outcome
            .map(|()| Completion { output, elapsed })
            .map_err(panic_message);
        // Receiver gone means the launch was abandoned or timed out
        let _ = tx.send(signal);
    });

    Ok(KernelLaunch {
        device,
        grid,
        completion: rx,
    })
}

/// Relation matrix for four coordinate columns, computed on `device`.
///
/// Blocking form of [`launch_relations`] followed by
/// [`KernelLaunch::synchronize`].
///
/// # Errors
///
/// - `EmptyPointSet` / `ShapeMismatch` before anything is dispatched
/// - any error of [`launch_relations`] or [`KernelLaunch::synchronize`]
///
/// # Example
///
/// ```
/// use lightcone_kernel::{compute_relations, Device, DeviceConfig, KernelConfig};
///
/// let device = Device::init(DeviceConfig::default()).unwrap();
/// let m = compute_relations(
///     &device,
///     &[0.0, 10.0], &[0.0, 1.0], &[0.0, 0.0], &[0.0, 0.0],
///     &KernelConfig::default(),
/// ).unwrap();
/// assert_eq!(m.to_rows(), vec![vec![1, 1], vec![1, 1]]);
/// ```
pub fn compute_relations(
    device: &Device,
    t: &[f32],
    x: &[f32],
    y: &[f32],
    z: &[f32],
    config: &KernelConfig,
) -> LightconeResult<RelationMatrix> {
    let points = PointSet::from_slices(t, x, y, z)?;
    Ok(launch_relations(device, &points, config)?.synchronize()?.matrix)
}
