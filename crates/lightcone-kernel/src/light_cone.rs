//! The light-cone predicate shared by the kernel and the reference oracle.
//!
//! # Boundary convention
//!
//! ```text
//! related(i, j)  <=>  dt² >= dx² + dy² + dz²
//! ```
//!
//! Equality (a separation exactly on the cone) counts as RELATED. The kernel
//! and the oracle call the same function so the two can be compared bit for
//! bit. All arithmetic is single precision, evaluated left to right; any
//! comparison involving NaN is false, so a NaN coordinate makes the pair
//! unrelated.

/// Cell value for a related pair.
pub const RELATED: u8 = 1;

/// Cell value for an unrelated pair.
pub const UNRELATED: u8 = 0;

/// Light-cone condition on coordinate differences.
///
/// # Example
///
/// ```
/// use lightcone_kernel::light_cone::is_related;
///
/// assert!(is_related(10.0, 1.0, 0.0, 0.0));
/// assert!(!is_related(0.0, 5.0, 0.0, 0.0));
/// // On the cone itself
/// assert!(is_related(5.0, 5.0, 0.0, 0.0));
/// ```
#[inline(always)]
pub fn is_related(dt: f32, dx: f32, dy: f32, dz: f32) -> bool {
    dt * dt >= dx * dx + dy * dy + dz * dz
}

/// Cell value written for a pair with the given coordinate differences.
#[inline(always)]
pub fn relation_cell(dt: f32, dx: f32, dy: f32, dz: f32) -> u8 {
    if is_related(dt, dx, dy, dz) {
        RELATED
    } else {
        UNRELATED
    }
}
