// Pointer resolver
//
// The wheel is drawn with segment i spanning [i * seg, (i + 1) * seg) in its
// own frame and is then rotated clockwise (screen coordinates, y down) by the
// current angle. The pointer is fixed at the top of the screen, i.e. at
// -PI/2. A wheel-local angle phi appears on screen at phi + angle, so the
// segment under the pointer is the one containing -PI/2 - angle.
//
// This intentionally differs from the browser picker's
// `(2PI - angle + PI/2) mod 2PI`, which reads the segment at the bottom of the
// wheel rather than the one under the drawn pointer. With four students at
// angle 0 that formula names Bob; this one names Dave. At angle PI it gives 3
// where this gives 1.

use std::f64::consts::{FRAC_PI_2, TAU};

/// Screen angle of the fixed pointer (top of the wheel)
pub const POINTER_SCREEN_ANGLE: f64 = -FRAC_PI_2;

/// Reduce any angle to its representative in [0, 2PI)
pub fn normalize_angle(angle: f64) -> f64 {
    angle.rem_euclid(TAU)
}

/// Wheel-local angle currently sitting under the pointer
pub fn pointer_local_angle(current_angle: f64) -> f64 {
    (POINTER_SCREEN_ANGLE - normalize_angle(current_angle)).rem_euclid(TAU)
}

/// Roster index under the pointer for a wheel of `roster_size` equal segments.
///
/// Always returns an index in `[0, roster_size - 1]`; floating-point results
/// that land on (or past) the 2PI boundary are clamped to the last segment.
/// A zero-sized roster has no segments and maps to index 0.
pub fn resolve_winner_index(current_angle: f64, roster_size: usize) -> usize {
    if roster_size == 0 {
        return 0;
    }
    let pointer = pointer_local_angle(current_angle);
    let segment = TAU / roster_size as f64;
    let raw = (pointer / segment).floor();
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    (raw as usize).min(roster_size - 1)
}
