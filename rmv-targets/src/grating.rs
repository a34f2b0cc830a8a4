//! Grating and Plaid: one or two superimposed sinusoidal or square-wave
//! patterns, phase-driven per frame.

use linktalk_proto::{MotionVector, TargetDefinition, TargetVariant};
use rmv_gfx::{GratingUniform, Special, Uniforms};
use rmv_math::grating::{fixed_orientation_phase_shift_deg, orient_adjusted_phase_shift_deg};
use rmv_math::{DisplayGeometry, Vec2};

use crate::common::{model_to_clip, FlickerState};
use crate::Target;

struct GratingChannel {
    spatial_freq_cyc_per_deg: f64,
    drift_axis_offset_deg: f64,
    orientation_deg: f64,
    phase_deg: f64,
    square_wave: bool,
}

pub struct GratingTarget {
    flicker: FlickerState,
    width_deg: f64,
    height_deg: f64,
    mean_rgb: [u8; 3],
    contrast_rgb: [f32; 3],
    orient_adjust: bool,
    unified_plaid: bool,
    channels: Vec<GratingChannel>,
    visible: bool,
}

impl GratingTarget {
    pub fn new(definition: &TargetDefinition) -> Self {
        let (spatial_freq_cyc_per_deg, orientation_deg, orient_adjust, unified_plaid, square_wave) =
            match &definition.variant {
                TargetVariant::Grating { spatial_freq_cyc_per_deg, orientation_deg, orient_adjust, unified_plaid, square_wave }
                | TargetVariant::Plaid { spatial_freq_cyc_per_deg, orientation_deg, orient_adjust, unified_plaid, square_wave } => {
                    (*spatial_freq_cyc_per_deg, *orientation_deg, *orient_adjust, *unified_plaid, *square_wave)
                }
                _ => unreachable!("GratingTarget built from a non-grating definition"),
            };
        let n = if matches!(definition.variant, TargetVariant::Plaid { .. }) { 2 } else { 1 };
        let channels = (0..n)
            .map(|i| GratingChannel {
                spatial_freq_cyc_per_deg: spatial_freq_cyc_per_deg[i] as f64,
                drift_axis_offset_deg: orientation_deg[i] as f64,
                orientation_deg: orientation_deg[i] as f64,
                phase_deg: 0.0,
                square_wave,
            })
            .collect();
        GratingTarget {
            flicker: FlickerState::new(definition.flicker),
            width_deg: definition.outer_width_deg as f64,
            height_deg: definition.outer_height_deg as f64,
            mean_rgb: definition.mean_rgb,
            contrast_rgb: definition.contrast_rgb,
            orient_adjust,
            unified_plaid,
            channels,
            visible: true,
        }
    }
}

impl Target for GratingTarget {
    fn update_motion(&mut self, _frame_interval_ms: f64, vector: MotionVector) {
        self.visible = self.flicker.advance() && vector.on;
        let motion = Vec2::new(vector.pattern_dx_deg as f64, vector.pattern_dy_deg as f64);

        if self.orient_adjust {
            for ch in &mut self.channels {
                let (orientation, shift) =
                    orient_adjusted_phase_shift_deg(motion, ch.drift_axis_offset_deg, ch.spatial_freq_cyc_per_deg);
                ch.orientation_deg = orientation;
                ch.phase_deg += shift;
            }
        } else if self.unified_plaid {
            for ch in &mut self.channels {
                ch.phase_deg += fixed_orientation_phase_shift_deg(motion, ch.orientation_deg, ch.spatial_freq_cyc_per_deg);
            }
        } else {
            // Independent-gratings mode: each channel advances from its own
            // scalar velocity along its own orientation.
            for ch in &mut self.channels {
                let velocity = Vec2::new(motion.magnitude(), 0.0).rotated_deg(ch.orientation_deg);
                ch.phase_deg += fixed_orientation_phase_shift_deg(velocity, ch.orientation_deg, ch.spatial_freq_cyc_per_deg);
            }
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn uniforms(&self, geometry: &DisplayGeometry, _eye_offset_factor: f32) -> Uniforms {
        let center_px = geometry.deg_to_px(0.0, 0.0);
        let size_px = (self.width_deg * geometry.px_per_deg_x(), self.height_deg * geometry.px_per_deg_y());
        let mut gratings = [GratingUniform::default(); 2];
        for (i, ch) in self.channels.iter().enumerate().take(2) {
            let period_px_x = 1.0 / (ch.spatial_freq_cyc_per_deg * geometry.deg_per_px_x());
            let period_px_y = 1.0 / (ch.spatial_freq_cyc_per_deg * geometry.deg_per_px_y());
            gratings[i] = GratingUniform {
                center_px: [center_px.0 as f32, center_px.1 as f32],
                period_px: [period_px_x as f32, period_px_y as f32],
                phase_deg: ch.phase_deg as f32,
                mean: [self.mean_rgb[0] as f32 / 255.0, self.mean_rgb[1] as f32 / 255.0, self.mean_rgb[2] as f32 / 255.0],
                contrast: self.contrast_rgb,
                square_wave: ch.square_wave,
            };
        }
        Uniforms {
            model_to_clip: model_to_clip(center_px, size_px, 0.0, (geometry.width_px, geometry.height_px)),
            color: [self.mean_rgb[0] as f32 / 255.0, self.mean_rgb[1] as f32 / 255.0, self.mean_rgb[2] as f32 / 255.0],
            special: Special::Default,
            gratings,
            n_gratings: self.channels.len() as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linktalk_proto::{ApertureKind, Flicker};

    fn grating_def(orient_adjust: bool, unified_plaid: bool) -> TargetDefinition {
        TargetDefinition {
            aperture: ApertureKind::Rect,
            outer_width_deg: 8.0,
            outer_height_deg: 8.0,
            inner_width_deg: 0.0,
            inner_height_deg: 0.0,
            blur_sigma_x_deg: 0.0,
            blur_sigma_y_deg: 0.0,
            mean_rgb: [128, 128, 128],
            contrast_rgb: [1.0, 1.0, 1.0],
            flicker: Flicker { on_frames: 0, off_frames: 0, initial_delay_frames: 0 },
            variant: linktalk_proto::TargetVariant::Grating {
                spatial_freq_cyc_per_deg: [1.0, 1.0],
                orientation_deg: [0.0, 90.0],
                orient_adjust,
                unified_plaid,
                square_wave: false,
            },
        }
    }

    #[test]
    fn fixed_orientation_grating_advances_phase_from_motion() {
        let mut t = GratingTarget::new(&grating_def(false, true));
        t.update_motion(16.0, MotionVector { pattern_dx_deg: 1.0, on: true, ..Default::default() });
        assert!(t.channels[0].phase_deg.abs() > 0.0);
    }

    #[test]
    fn orient_adjust_tracks_motion_direction() {
        let mut t = GratingTarget::new(&grating_def(true, false));
        t.update_motion(16.0, MotionVector { pattern_dy_deg: 1.0, on: true, ..Default::default() });
        assert!((t.channels[0].orientation_deg - 90.0).abs() < 1e-9);
    }
}
