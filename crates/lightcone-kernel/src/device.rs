//! Compute device context: worker pool plus device memory accounting.
//!
//! The device is acquired explicitly with [`Device::init`] and released with
//! [`Device::shutdown`] (or on drop). Nothing is initialised as a side effect
//! of loading the crate.
//!
//! # Memory model
//!
//! Every [`DeviceBuffer`] is charged against the device budget when it is
//! allocated and credited back when it is dropped. Exceeding the budget, or
//! failing to reserve host pages, yields `AllocationFailure` before any work
//! is dispatched.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, instrument, warn};

use crate::config::DeviceConfig;
use crate::error::{LightconeError, LightconeResult};

// ============================================================================
// Memory accounting
// ============================================================================

#[derive(Debug)]
struct MemoryTracker {
    budget: Option<usize>,
    used: AtomicUsize,
}

impl MemoryTracker {
    fn reserve(&self, bytes: usize) -> LightconeResult<()> {
        let budget = self.budget;
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let next = used.checked_add(bytes)?;
                match budget {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            })
            .map(|_| ())
            .map_err(|used| LightconeError::AllocationFailure {
                requested_bytes: bytes,
                reason: format!(
                    "device budget exhausted: {} of {} bytes in use",
                    used,
                    budget.map_or_else(|| "unbounded".to_string(), |b| b.to_string())
                ),
            })
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

// ============================================================================
// Device buffers
// ============================================================================

/// Buffer resident in device memory.
///
/// Read-only after allocation from the host's point of view; kernels that
/// write use interior mutability (atomics) on disjoint cells.
pub struct DeviceBuffer<T> {
    data: Vec<T>,
    bytes: usize,
    tracker: Arc<MemoryTracker>,
}

impl<T> DeviceBuffer<T> {
    /// Bytes charged to the device for this buffer.
    pub fn size_bytes(&self) -> usize {
        self.bytes
    }
}

impl<T> Deref for DeviceBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        self.tracker.release(self.bytes);
    }
}

impl<T> fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("len", &self.data.len())
            .field("bytes", &self.bytes)
            .finish()
    }
}

// ============================================================================
// Device
// ============================================================================

/// An acquired compute device.
///
/// # Example
///
/// ```
/// use lightcone_kernel::{Device, DeviceConfig};
///
/// let device = Device::init(DeviceConfig::default().with_worker_threads(2)).unwrap();
/// assert_eq!(device.worker_threads(), 2);
/// assert_eq!(device.memory_in_use(), 0);
/// device.shutdown();
/// ```
pub struct Device {
    pool: ThreadPool,
    memory: Arc<MemoryTracker>,
    config: DeviceConfig,
    name: String,
}

impl Device {
    /// Acquire the device context.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if `config` fails validation
    /// - `DeviceInitError` if the worker pool cannot be started
    #[instrument(skip_all, fields(worker_threads = ?config.worker_threads))]
    pub fn init(config: DeviceConfig) -> LightconeResult<Self> {
        config.validate()?;

        let mut builder =
            ThreadPoolBuilder::new().thread_name(|idx| format!("lightcone-worker-{}", idx));
        if let Some(threads) = config.worker_threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| LightconeError::DeviceInitError(e.to_string()))?;

        let workers = pool.current_num_threads();
        let name = format!(
            "CPU data-parallel ({} worker{})",
            workers,
            if workers == 1 { "" } else { "s" }
        );
        info!(
            device = %name,
            memory_budget = ?config.memory_budget_bytes,
            "Device initialized"
        );

        Ok(Self {
            pool,
            memory: Arc::new(MemoryTracker {
                budget: config.memory_budget_bytes,
                used: AtomicUsize::new(0),
            }),
            config,
            name,
        })
    }

    /// Release the device context.
    ///
    /// Consumes the device, so no launch can be issued or left in flight
    /// against it afterwards.
    pub fn shutdown(self) {
        let in_use = self.memory_in_use();
        if in_use > 0 {
            warn!(bytes = in_use, "Device shut down with buffers still allocated");
        }
        info!(device = %self.name, "Device shut down");
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn memory_budget(&self) -> Option<usize> {
        self.memory.budget
    }

    /// Bytes currently held by live [`DeviceBuffer`]s.
    pub fn memory_in_use(&self) -> usize {
        self.memory.used.load(Ordering::Acquire)
    }

    pub(crate) fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// Allocate `len` elements initialised by `init`.
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if the budget or host memory is exhausted.
    pub fn alloc_with<T>(
        &self,
        len: usize,
        init: impl FnMut() -> T,
    ) -> LightconeResult<DeviceBuffer<T>> {
        let mut buffer = self.reserve::<T>(len)?;
        buffer.data.resize_with(len, init);
        Ok(buffer)
    }

    /// Host-to-device copy.
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if the budget or host memory is exhausted.
    pub fn upload<T: Copy>(&self, host: &[T]) -> LightconeResult<DeviceBuffer<T>> {
        let mut buffer = self.reserve::<T>(host.len())?;
        buffer.data.extend_from_slice(host);
        Ok(buffer)
    }

    /// Charge the budget and reserve capacity; the returned buffer is empty.
    fn reserve<T>(&self, len: usize) -> LightconeResult<DeviceBuffer<T>> {
        let bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| LightconeError::allocation::<T>(len, "size overflows usize"))?;
        self.memory.reserve(bytes)?;

        let mut data = Vec::new();
        if let Err(e) = data.try_reserve_exact(len) {
            self.memory.release(bytes);
            return Err(LightconeError::allocation::<T>(len, e.to_string()));
        }

        debug!(len, bytes, in_use = self.memory_in_use(), "Device buffer allocated");
        Ok(DeviceBuffer {
            data,
            bytes,
            tracker: Arc::clone(&self.memory),
        })
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("memory_in_use", &self.memory_in_use())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(budget: Option<usize>) -> Device {
        let mut config = DeviceConfig::default().with_worker_threads(2);
        config.memory_budget_bytes = budget;
        Device::init(config).unwrap()
    }

    #[test]
    fn test_init_and_shutdown() {
        let d = device(None);
        assert_eq!(d.worker_threads(), 2);
        assert!(d.name().contains("2 workers"));
        assert_eq!(d.memory_budget(), None);
        d.shutdown();
    }

    #[test]
    fn test_single_worker_name() {
        let d = Device::init(DeviceConfig::default().with_worker_threads(1)).unwrap();
        assert_eq!(d.name(), "CPU data-parallel (1 worker)");
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let err = Device::init(DeviceConfig::default().with_worker_threads(0)).unwrap_err();
        assert!(matches!(err, LightconeError::InvalidConfig(_)));
    }

    #[test]
    fn test_upload_copies_and_tracks_memory() {
        let d = device(None);
        let host = [1.0f32, 2.0, 3.0];
        let buf = d.upload(&host).unwrap();
        assert_eq!(&*buf, &host);
        assert_eq!(buf.size_bytes(), 12);
        assert_eq!(d.memory_in_use(), 12);
        drop(buf);
        assert_eq!(d.memory_in_use(), 0);
    }

    #[test]
    fn test_budget_enforced() {
        let d = device(Some(16));
        let a = d.alloc_with(12, || 0u8).unwrap();
        let err = d.alloc_with(8, || 0u8).unwrap_err();
        match err {
            LightconeError::AllocationFailure {
                requested_bytes, ..
            } => assert_eq!(requested_bytes, 8),
            other => panic!("expected AllocationFailure, got {other:?}"),
        }
        // Failed reservation must not leak budget
        assert_eq!(d.memory_in_use(), 12);
        drop(a);
        assert!(d.alloc_with(16, || 0u8).is_ok());
    }

    #[test]
    fn test_size_overflow_is_allocation_failure() {
        let d = device(None);
        let err = d.alloc_with(usize::MAX, || 0u64).unwrap_err();
        assert!(matches!(err, LightconeError::AllocationFailure { .. }));
        assert_eq!(d.memory_in_use(), 0);
    }

    #[test]
    fn test_host_reservation_failure_releases_budget() {
        let d = device(None);
        // Passes the unbounded budget but cannot be reserved on the host
        let err = d.alloc_with(isize::MAX as usize + 1, || 0u8).unwrap_err();
        assert!(matches!(err, LightconeError::AllocationFailure { .. }));
        assert_eq!(d.memory_in_use(), 0);
    }
}
