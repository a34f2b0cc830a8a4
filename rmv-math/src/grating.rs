//! Per-frame phase and orientation updates shared by the grating and plaid
//! variants.

use crate::vector::Vec2;

/// When "orient-adjust" is set, the grating's orientation tracks the motion
/// direction (offset from the definition's drift axis), and the phase shift
/// is the signed projection of the motion vector onto the wavenumber
/// direction.
pub fn orient_adjusted_phase_shift_deg(
    motion: Vec2,
    drift_axis_offset_deg: f64,
    spatial_freq_cyc_per_deg: f64,
) -> (f64, f64) {
    let orientation_deg = motion.angle_deg() + drift_axis_offset_deg;
    let projection_deg = motion.projected_onto_deg(orientation_deg);
    let phase_shift_deg = projection_deg * spatial_freq_cyc_per_deg * 360.0;
    (orientation_deg, phase_shift_deg)
}

/// Fixed-orientation phase advance: the signed projection of `velocity` (in
/// degrees per frame) onto the grating's fixed orientation, scaled to
/// degrees of phase by its spatial frequency.
pub fn fixed_orientation_phase_shift_deg(
    velocity: Vec2,
    orientation_deg: f64,
    spatial_freq_cyc_per_deg: f64,
) -> f64 {
    velocity.projected_onto_deg(orientation_deg) * spatial_freq_cyc_per_deg * 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_orientation_along_motion_yields_full_projection() {
        let shift = fixed_orientation_phase_shift_deg(Vec2::new(1.0, 0.0), 0.0, 2.0);
        assert!((shift - 720.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_orientation_perpendicular_to_motion_yields_zero() {
        let shift = fixed_orientation_phase_shift_deg(Vec2::new(1.0, 0.0), 90.0, 2.0);
        assert!(shift.abs() < 1e-9);
    }

    #[test]
    fn orient_adjusted_orientation_follows_motion_direction() {
        let (orientation, _) = orient_adjusted_phase_shift_deg(Vec2::new(0.0, 1.0), 10.0, 1.0);
        assert!((orientation - 100.0).abs() < 1e-9);
    }
}
