//! Optical flow field: dots in polar coordinates within an annulus, radial
//! motion driven by the `B` constant derived from the requested mid-radius
//! displacement.

use linktalk_proto::{MotionVector, TargetDefinition, TargetVariant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rmv_gfx::{Special, Uniforms};
use rmv_math::flow_field::{advance_radius, b_constant, recycle_probability, recycle_ring_width};
use rmv_math::{DisplayGeometry, Vec2};

use crate::common::{model_to_clip, FlickerState};
use crate::Target;

struct Dot {
    radius_deg: f64,
    angle_deg: f64,
}

pub struct FlowFieldTarget {
    flicker: FlickerState,
    rng: StdRng,
    inner_radius_deg: f64,
    outer_radius_deg: f64,
    dot_disparity_deg: f64,
    mean_rgb: [u8; 3],
    dots: Vec<Dot>,
    visible: bool,
}

impl FlowFieldTarget {
    pub fn new(definition: &TargetDefinition, seed: u64) -> Self {
        let TargetVariant::OpticalFlowField { dot_count, inner_radius_deg, outer_radius_deg, dot_disparity_deg } =
            definition.variant
        else {
            unreachable!("FlowFieldTarget built from a non-flow-field definition");
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let inner = inner_radius_deg as f64;
        let outer = outer_radius_deg as f64;
        let dots = (0..dot_count)
            .map(|_| Dot { radius_deg: rng.gen_range(inner..=outer), angle_deg: rng.gen_range(0.0..360.0) })
            .collect();

        FlowFieldTarget {
            flicker: FlickerState::new(definition.flicker),
            rng,
            inner_radius_deg: inner,
            outer_radius_deg: outer,
            dot_disparity_deg: dot_disparity_deg as f64,
            mean_rgb: definition.mean_rgb,
            dots,
            visible: true,
        }
    }
}

impl Target for FlowFieldTarget {
    fn update_motion(&mut self, _frame_interval_ms: f64, vector: MotionVector) {
        self.visible = self.flicker.advance() && vector.on;

        let delta_r_at_half_outer = vector.pattern_dx_deg as f64;
        let b = b_constant(delta_r_at_half_outer, self.outer_radius_deg);
        let ring_width = recycle_ring_width(b, self.outer_radius_deg);
        let recycle_prob = recycle_probability(b);

        for dot in &mut self.dots {
            let new_radius = advance_radius(dot.radius_deg, b);

            if b > 0.0 {
                if new_radius > self.outer_radius_deg {
                    dot.radius_deg = self.rng.gen_range(self.inner_radius_deg..=self.outer_radius_deg);
                    dot.angle_deg = self.rng.gen_range(0.0..360.0);
                } else {
                    dot.radius_deg = new_radius;
                }
            } else if b < 0.0 {
                let recycle_threshold = self.rng.gen_range(self.inner_radius_deg..=self.outer_radius_deg);
                if new_radius < recycle_threshold && self.rng.gen_bool(recycle_prob) {
                    dot.radius_deg = self.outer_radius_deg - ring_width.abs() * self.rng.gen::<f64>();
                    dot.angle_deg = self.rng.gen_range(0.0..360.0);
                } else {
                    dot.radius_deg = new_radius;
                }
            } else {
                dot.radius_deg = new_radius;
            }
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn uniforms(&self, geometry: &DisplayGeometry, eye_offset_factor: f32) -> Uniforms {
        let disparity_deg = self.dot_disparity_deg * eye_offset_factor as f64;
        let center_px = geometry.deg_to_px(disparity_deg, 0.0);
        let size_px = (
            2.0 * self.outer_radius_deg * geometry.px_per_deg_x(),
            2.0 * self.outer_radius_deg * geometry.px_per_deg_y(),
        );
        Uniforms {
            model_to_clip: model_to_clip(center_px, size_px, 0.0, (geometry.width_px, geometry.height_px)),
            color: [self.mean_rgb[0] as f32 / 255.0, self.mean_rgb[1] as f32 / 255.0, self.mean_rgb[2] as f32 / 255.0],
            special: Special::DotPatch,
            gratings: Default::default(),
            n_gratings: 0,
        }
    }
}

/// Number of dots in the field, for callers rasterizing a per-frame coverage
/// texture from [`dot_position_deg`].
pub fn dot_count(target: &FlowFieldTarget) -> usize {
    target.dots.len()
}

/// One dot's position in visual degrees (polar state converted to
/// Cartesian), relative to the field center.
pub fn dot_position_deg(target: &FlowFieldTarget, dot: usize) -> Vec2 {
    let d = &target.dots[dot];
    let angle = d.angle_deg.to_radians();
    Vec2::new(d.radius_deg * angle.cos(), d.radius_deg * angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linktalk_proto::{ApertureKind, Flicker};

    fn def() -> TargetDefinition {
        TargetDefinition {
            aperture: ApertureKind::OvalAnnulus,
            outer_width_deg: 40.0,
            outer_height_deg: 40.0,
            inner_width_deg: 4.0,
            inner_height_deg: 4.0,
            blur_sigma_x_deg: 0.0,
            blur_sigma_y_deg: 0.0,
            mean_rgb: [255, 255, 255],
            contrast_rgb: [0.0, 0.0, 0.0],
            flicker: Flicker { on_frames: 0, off_frames: 0, initial_delay_frames: 0 },
            variant: TargetVariant::OpticalFlowField {
                dot_count: 40,
                inner_radius_deg: 2.0,
                outer_radius_deg: 20.0,
                dot_disparity_deg: 0.3,
            },
        }
    }

    #[test]
    fn zero_motion_leaves_dots_in_place() {
        let mut t = FlowFieldTarget::new(&def(), 11);
        let before: Vec<f64> = t.dots.iter().map(|d| d.radius_deg).collect();
        t.update_motion(16.0, MotionVector { on: true, ..Default::default() });
        let after: Vec<f64> = t.dots.iter().map(|d| d.radius_deg).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn accelerating_flow_eventually_recycles_a_dot_past_the_outer_radius() {
        let mut t = FlowFieldTarget::new(&def(), 11);
        t.dots[0].radius_deg = 19.9;
        for _ in 0..20 {
            t.update_motion(16.0, MotionVector { pattern_dx_deg: 5.0, on: true, ..Default::default() });
        }
        assert!(t.dots[0].radius_deg <= t.outer_radius_deg);
    }
}
