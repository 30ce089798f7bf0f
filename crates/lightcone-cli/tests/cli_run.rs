//! End-to-end tests for the `lightcone` binary.
//!
//! Spawns the real executable; no mocks.

use std::process::{Command, Output};

fn lightcone(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lightcone"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("LIGHTCONE_POINTS")
        .env_remove("LIGHTCONE_BLOCK_SIZE")
        .env_remove("LIGHTCONE_THREADS")
        .env_remove("LIGHTCONE_MEMORY_BUDGET")
        .env_remove("LIGHTCONE_TIMEOUT_SECS")
        .output()
        .expect("failed to spawn lightcone")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_run_small_problem_passes() {
    println!("\n=== TEST: run -n 300 ===");
    let output = lightcone(&["run", "-n", "300", "--seed", "5"]);
    let text = stdout(&output);
    println!("STDOUT:\n{}", text);

    assert_eq!(output.status.code(), Some(0));
    assert!(text.contains("Points: 300"));
    assert!(text.contains("Kernel symmetry residual (should be 0): 0"));
    assert!(text.contains("Max |oracle - kernel| (should be 0): 0"));
    assert!(text.trim_end().ends_with("Result: PASS"));
    println!("=== PASSED ===\n");
}

#[test]
fn test_run_json_report() {
    let output = lightcone(&["run", "-n", "64", "--block-size", "256", "--json"]);
    assert_eq!(output.status.code(), Some(0));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(report["n"], 64);
    assert_eq!(report["tile_side"], 16);
    assert_eq!(report["grid"], serde_json::json!([4, 4]));
    assert_eq!(report["mismatch_count"], 0);
    assert_eq!(report["kernel"]["symmetry_residual"], 0);
    assert_eq!(report["kernel"]["unit_diagonal"], true);
}

#[test]
fn test_run_skip_oracle_json() {
    let output = lightcone(&["run", "-n", "10", "--skip-oracle", "--json"]);
    assert_eq!(output.status.code(), Some(0));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(report["n"], 10);
    assert!(report.get("mismatch_count").is_none());
    assert_eq!(report["kernel"]["max_value"], 1);
}

#[test]
fn test_run_print_matrix_single_point() {
    let output = lightcone(&["run", "-n", "1", "--print-matrix"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("kernel =\n  [1]\n"));
}

#[test]
fn test_run_print_matrix_shows_oracle_and_difference() {
    let output = lightcone(&["run", "-n", "3", "--seed", "9", "--print-matrix"]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(0));
    assert!(text.contains("kernel =\n"));
    assert!(text.contains("oracle =\n"));
    assert!(text.contains("oracle - kernel =\n  [0 0 0]\n  [0 0 0]\n  [0 0 0]\n"));
    assert!(text.contains("oracle.max() = 1"));
}

#[test]
fn test_run_unreservable_point_count_fails_cleanly() {
    println!("\n=== TEST: run with an impossible N ===");
    let n = (usize::MAX / 4).to_string();
    let output = lightcone(&["run", "-n", &n]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    println!("STDERR:\n{}", stderr);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("allocation"));
    println!("=== PASSED ===\n");
}

#[test]
fn test_run_zero_points_fails() {
    let output = lightcone(&["run", "-n", "0"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("empty"));
}

#[test]
fn test_run_invalid_block_size_fails() {
    let output = lightcone(&["run", "-n", "10", "--block-size", "4096"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid configuration"));
}

#[test]
fn test_run_memory_budget_exceeded_fails() {
    let output = lightcone(&["run", "-n", "1000", "--memory-budget", "4096"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("allocation"));
}

#[test]
fn test_info_reports_grid() {
    let output = lightcone(&["info", "-n", "4500", "--threads", "2"]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(0));
    assert!(text.contains("Device: CPU data-parallel (2 workers)"));
    assert!(text.contains("Block: 1024 lanes requested, 32x32 tile"));
    assert!(text.contains("Grid: 141x141 blocks"));
    assert!(text.contains("Device memory per launch: 20322000 bytes"));
}

#[test]
fn test_info_zero_points_fails() {
    let output = lightcone(&["info", "-n", "0"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("empty"));
}

#[test]
fn test_info_oversized_problem_fails() {
    let output = lightcone(&["info", "-n", "5000000000"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid configuration"));
}
