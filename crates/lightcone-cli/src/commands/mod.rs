//! CLI command handlers
//!
//! - `run`: kernel dispatch, oracle validation and reporting
//! - `info`: device and grid geometry

pub mod info;
pub mod run;

use std::time::Duration;

use clap::Args;
use lightcone_kernel::{DeviceConfig, KernelConfig, LightconeResult, DEFAULT_BLOCK_SIZE};

/// Device and kernel options shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Block area in lanes; the tile side is its integer square root
    #[arg(long, env = "LIGHTCONE_BLOCK_SIZE", default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: u32,

    /// Worker threads (default: one per logical core)
    #[arg(long, env = "LIGHTCONE_THREADS")]
    pub threads: Option<usize>,

    /// Device memory budget in bytes (default: unbounded)
    #[arg(long, env = "LIGHTCONE_MEMORY_BUDGET")]
    pub memory_budget: Option<usize>,

    /// Synchronization deadline in seconds (default: wait forever)
    #[arg(long, env = "LIGHTCONE_TIMEOUT_SECS")]
    pub timeout_secs: Option<f64>,
}

impl DeviceArgs {
    pub fn kernel_config(&self) -> LightconeResult<KernelConfig> {
        KernelConfig::with_block_size(self.block_size)
    }

    pub fn device_config(&self) -> LightconeResult<DeviceConfig> {
        let mut config = DeviceConfig::default();
        if let Some(threads) = self.threads {
            config = config.with_worker_threads(threads);
        }
        if let Some(bytes) = self.memory_budget {
            config = config.with_memory_budget(bytes);
        }
        if let Some(secs) = self.timeout_secs {
            let timeout = Duration::try_from_secs_f64(secs).map_err(|e| {
                lightcone_kernel::LightconeError::InvalidConfig(format!(
                    "timeout {} is not a valid duration: {}",
                    secs, e
                ))
            })?;
            config = config.with_sync_timeout(timeout);
        }
        config.validate()?;
        Ok(config)
    }
}
