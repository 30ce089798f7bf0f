//! CLI exit code handling.
//!
//! Exit codes:
//! - 0: Success
//! - 1: The run could not complete (stderr explains why)
//! - 2: The run completed but the kernel output is wrong

use lightcone_kernel::LightconeError;

/// Exit codes for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CliExitCode {
    /// Success
    Success = 0,
    /// Configuration, allocation, timeout or kernel failure
    Failure = 1,
    /// Kernel disagrees with the reference oracle or breaks an invariant
    Mismatch = 2,
}

impl From<CliExitCode> for i32 {
    fn from(code: CliExitCode) -> Self {
        code as i32
    }
}

impl From<&LightconeError> for CliExitCode {
    fn from(err: &LightconeError) -> Self {
        match err {
            LightconeError::DeviceInitError(_)
            | LightconeError::AllocationFailure { .. }
            | LightconeError::ShapeMismatch { .. }
            | LightconeError::EmptyPointSet
            | LightconeError::InvalidConfig(_)
            | LightconeError::SynchronizationTimeout { .. }
            | LightconeError::KernelError(_) => CliExitCode::Failure,
        }
    }
}
