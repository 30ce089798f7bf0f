//! `lightcone run`: generate, dispatch, validate, report.
//!
//! # Output
//! - Text report on stdout (or JSON with `--json`)
//! - Logs on stderr
//!
//! # Exit Codes
//! - 0: kernel matches the oracle
//! - 1: run failed
//! - 2: kernel output disagrees with the oracle

use clap::Args;
use serde_json::json;
use tracing::{debug, error, info};

use lightcone_kernel::{
    launch_relations, reference_relations, validate_against_reference, Device, KernelOutput,
    LightconeResult, MatrixSummary, PointSet, RelationMatrix,
};

use super::DeviceArgs;
use crate::error::CliExitCode;

/// Largest N whose matrices `--print-matrix` will print.
const MAX_PRINTED_N: usize = 32;

/// Arguments for `run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Number of points (N)
    #[arg(short = 'n', long, env = "LIGHTCONE_POINTS", default_value_t = 4500)]
    pub points: usize,

    /// Seed for the standard-normal point generator
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    #[command(flatten)]
    pub device: DeviceArgs,

    /// Skip the sequential oracle and report kernel statistics only
    #[arg(long)]
    pub skip_oracle: bool,

    /// Print the relation matrix (N <= 32 only)
    #[arg(long)]
    pub print_matrix: bool,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the run command
pub fn run_command(args: RunArgs) -> i32 {
    debug!("run_command: args={:?}", args);
    match execute(&args) {
        Ok(code) => code.into(),
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("Error: {}", e);
            CliExitCode::from(&e).into()
        }
    }
}

fn execute(args: &RunArgs) -> LightconeResult<CliExitCode> {
    let kernel_config = args.device.kernel_config()?;
    let device = Device::init(args.device.device_config()?)?;
    info!(device = device.name(), n = args.points, seed = args.seed, "Starting run");

    let points = PointSet::random_normal(args.points, args.seed)?;
    let output = launch_relations(&device, &points, &kernel_config)?.synchronize()?;

    if args.print_matrix {
        print_matrix("kernel", &output.matrix);
        if !args.skip_oracle && points.len() <= MAX_PRINTED_N {
            let reference = reference_relations(&points)?;
            print_matrix("oracle", &reference);
            print_difference(&reference, &output.matrix);
        }
    }

    let code = if args.skip_oracle {
        let summary = report_kernel_only(&output, args.json);
        if summary.is_well_formed() {
            CliExitCode::Success
        } else {
            CliExitCode::Mismatch
        }
    } else {
        let report = validate_against_reference(&output, &points)?;
        if args.json {
            println!("{}", to_json(&report));
        } else {
            println!("{}", report);
        }
        if report.is_valid() {
            CliExitCode::Success
        } else {
            CliExitCode::Mismatch
        }
    };

    device.shutdown();
    Ok(code)
}

fn report_kernel_only(output: &KernelOutput, as_json: bool) -> MatrixSummary {
    let summary = MatrixSummary::of(&output.matrix);
    if as_json {
        let value = json!({
            "n": output.matrix.n(),
            "tile_side": output.grid.tile_side,
            "grid": [output.grid.grid_x, output.grid.grid_y],
            "kernel_elapsed": output.elapsed.as_secs_f64(),
            "kernel": summary,
        });
        println!("{}", to_json(&value));
    } else {
        println!("Points: {}", output.matrix.n());
        println!("Kernel time: {:.2e}s", output.elapsed.as_secs_f64());
        println!(
            "kernel.max() = {}, kernel.argmax() = {:?}",
            summary.max_value, summary.argmax
        );
        println!(
            "Kernel symmetry residual (should be 0): {}",
            summary.symmetry_residual
        );
        println!("Related pairs: {}", summary.related_pairs);
    }
    summary
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

fn print_matrix(label: &str, matrix: &RelationMatrix) {
    if matrix.n() > MAX_PRINTED_N {
        info!(n = matrix.n(), "Matrix too large to print, skipping");
        return;
    }
    println!("{} =", label);
    for i in 0..matrix.n() {
        let row: Vec<String> = matrix.row(i).iter().map(u8::to_string).collect();
        println!("  [{}]", row.join(" "));
    }
}

/// Cell-wise `oracle - kernel`; all zeros when the two agree.
fn print_difference(reference: &RelationMatrix, kernel: &RelationMatrix) {
    println!("oracle - kernel =");
    for i in 0..reference.n() {
        let row: Vec<String> = reference
            .row(i)
            .iter()
            .zip(kernel.row(i))
            .map(|(&r, &k)| (i16::from(r) - i16::from(k)).to_string())
            .collect();
        println!("  [{}]", row.join(" "));
    }
}
