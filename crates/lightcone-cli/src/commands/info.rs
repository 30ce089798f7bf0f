//! `lightcone info`: device and launch-grid geometry for a problem size.

use clap::Args;
use tracing::error;

use lightcone_kernel::{Device, LaunchGrid, LightconeResult};

use super::DeviceArgs;
use crate::error::CliExitCode;

/// Arguments for `info`
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Problem size to lay out
    #[arg(short = 'n', long, env = "LIGHTCONE_POINTS", default_value_t = 4500)]
    pub points: usize,

    #[command(flatten)]
    pub device: DeviceArgs,
}

/// Execute the info command
pub fn info_command(args: InfoArgs) -> i32 {
    match execute(&args) {
        Ok(()) => CliExitCode::Success.into(),
        Err(e) => {
            error!(error = %e, "info failed");
            eprintln!("Error: {}", e);
            CliExitCode::from(&e).into()
        }
    }
}

fn execute(args: &InfoArgs) -> LightconeResult<()> {
    let kernel_config = args.device.kernel_config()?;
    let grid = LaunchGrid::for_problem(args.points, &kernel_config)?;
    let device = Device::init(args.device.device_config()?)?;

    let n = args.points as u128;
    let device_bytes = 4 * n * 4 + n * n;

    println!("Device: {}", device.name());
    println!(
        "Memory budget: {}",
        device
            .memory_budget()
            .map_or_else(|| "unbounded".to_string(), |b| format!("{} bytes", b))
    );
    println!("Points: {}", grid.n);
    println!(
        "Block: {} lanes requested, {}x{} tile",
        kernel_config.block_size, grid.tile_side, grid.tile_side
    );
    println!("Grid: {}x{} blocks", grid.grid_x, grid.grid_y);
    println!(
        "Lanes: {} launched, {} active",
        grid.total_lanes(),
        grid.active_pairs()
    );
    println!("Device memory per launch: {} bytes", device_bytes);

    device.shutdown();
    Ok(())
}
