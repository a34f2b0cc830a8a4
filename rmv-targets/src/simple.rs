//! Point, Spot, and Bar: targets whose per-frame update is only a center
//! translation, with no per-frame geometry or texture regeneration
//!.

use linktalk_proto::{MotionVector, TargetDefinition};
use rmv_gfx::{Special, Uniforms};
use rmv_math::Vec2;

use crate::common::{model_to_clip, FlickerState};
use crate::Target;

pub struct SimpleTarget {
    flicker: FlickerState,
    center_deg: Vec2,
    width_deg: f64,
    height_deg: f64,
    rotation_deg: f64,
    mean_rgb: [u8; 3],
    visible: bool,
}

impl SimpleTarget {
    pub fn new(definition: &TargetDefinition, rotation_deg: f64) -> Self {
        SimpleTarget {
            flicker: FlickerState::new(definition.flicker),
            center_deg: Vec2::new(0.0, 0.0),
            width_deg: definition.outer_width_deg as f64,
            height_deg: definition.outer_height_deg as f64,
            rotation_deg,
            mean_rgb: definition.mean_rgb,
            visible: true,
        }
    }
}

impl Target for SimpleTarget {
    fn update_motion(&mut self, _frame_interval_ms: f64, vector: MotionVector) {
        self.visible = self.flicker.advance() && vector.on;
        self.center_deg = self
            .center_deg
            .added(Vec2::new(vector.window_dx_deg as f64, vector.window_dy_deg as f64));
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn uniforms(&self, geometry: &rmv_math::DisplayGeometry, _eye_offset_factor: f32) -> Uniforms {
        let center_px = geometry.deg_to_px(self.center_deg.x, self.center_deg.y);
        let size_px = (self.width_deg * geometry.px_per_deg_x(), self.height_deg * geometry.px_per_deg_y());
        Uniforms {
            model_to_clip: model_to_clip(center_px, size_px, self.rotation_deg, (geometry.width_px, geometry.height_px)),
            color: [
                self.mean_rgb[0] as f32 / 255.0,
                self.mean_rgb[1] as f32 / 255.0,
                self.mean_rgb[2] as f32 / 255.0,
            ],
            special: Special::Default,
            gratings: Default::default(),
            n_gratings: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linktalk_proto::{ApertureKind, Flicker};

    fn def() -> TargetDefinition {
        TargetDefinition {
            aperture: ApertureKind::Oval,
            outer_width_deg: 2.0,
            outer_height_deg: 2.0,
            inner_width_deg: 0.0,
            inner_height_deg: 0.0,
            blur_sigma_x_deg: 0.0,
            blur_sigma_y_deg: 0.0,
            mean_rgb: [200, 200, 200],
            contrast_rgb: [0.0, 0.0, 0.0],
            flicker: Flicker { on_frames: 0, off_frames: 0, initial_delay_frames: 0 },
            variant: linktalk_proto::TargetVariant::Spot,
        }
    }

    #[test]
    fn center_accumulates_window_motion() {
        let mut t = SimpleTarget::new(&def(), 0.0);
        t.update_motion(16.0, MotionVector { window_dx_deg: 1.0, window_dy_deg: -0.5, on: true, ..Default::default() });
        t.update_motion(16.0, MotionVector { window_dx_deg: 1.0, window_dy_deg: -0.5, on: true, ..Default::default() });
        assert!((t.center_deg.x - 2.0).abs() < 1e-9);
        assert!((t.center_deg.y - -1.0).abs() < 1e-9);
    }

    #[test]
    fn off_vector_hides_the_target() {
        let mut t = SimpleTarget::new(&def(), 0.0);
        t.update_motion(16.0, MotionVector { on: false, ..Default::default() });
        assert!(!t.is_visible());
    }
}
