//! Random-dot patch: seeded dot positions with per-dot direction/speed
//! noise, finite lifetime, coherence, and wraparound.

use linktalk_proto::{ApertureKind, MotionVector, TargetDefinition, TargetVariant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rmv_gfx::{Special, Uniforms};
use rmv_math::{DisplayGeometry, Vec2};

use crate::common::{model_to_clip, FlickerState};
use crate::Target;

struct Dot {
    pos_deg: Vec2,
    noise_direction_deg: f64,
    noise_speed_log2: f64,
    lifetime_remaining_ms: f64,
}

pub struct DotPatchTarget {
    flicker: FlickerState,
    rng: StdRng,
    aperture: ApertureKind,
    outer_w_deg: f64,
    outer_h_deg: f64,
    inner_w_deg: f64,
    inner_h_deg: f64,
    mean_rgb: [u8; 3],
    contrast_rgb: [f32; 3],
    dot_size_pixels: u8,
    dots: Vec<Dot>,
    noise_interval_ms: f64,
    direction_noise_limit_deg: f64,
    speed_noise_log2_limit: f64,
    percent_coherent: u8,
    finite_lifetime_ms: Option<f64>,
    two_color_contrast: bool,
    dot_disparity_deg: f64,
    ms_since_noise_refresh: f64,
    visible: bool,
}

impl DotPatchTarget {
    pub fn new(definition: &TargetDefinition, seed: u64) -> Self {
        let TargetVariant::RandomDotPatch {
            dot_count,
            dot_size_pixels,
            percent_coherent,
            noise_interval_ms,
            direction_noise_limit_deg,
            speed_noise_log2_limit,
            finite_lifetime_ms,
            two_color_contrast,
            dot_disparity_deg,
            ..
        } = definition.variant
        else {
            unreachable!("DotPatchTarget built from a non-dot-patch definition");
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let half_w = definition.outer_width_deg as f64 / 2.0;
        let half_h = definition.outer_height_deg as f64 / 2.0;
        let dots = (0..dot_count)
            .map(|_| Dot {
                pos_deg: Vec2::new(rng.gen_range(-half_w..=half_w), rng.gen_range(-half_h..=half_h)),
                noise_direction_deg: 0.0,
                noise_speed_log2: 0.0,
                lifetime_remaining_ms: finite_lifetime_ms.unwrap_or(0) as f64,
            })
            .collect();

        DotPatchTarget {
            flicker: FlickerState::new(definition.flicker),
            rng,
            aperture: definition.aperture,
            outer_w_deg: definition.outer_width_deg as f64,
            outer_h_deg: definition.outer_height_deg as f64,
            inner_w_deg: definition.inner_width_deg as f64,
            inner_h_deg: definition.inner_height_deg as f64,
            mean_rgb: definition.mean_rgb,
            contrast_rgb: definition.contrast_rgb,
            dot_size_pixels,
            dots,
            noise_interval_ms: noise_interval_ms as f64,
            direction_noise_limit_deg: direction_noise_limit_deg as f64,
            speed_noise_log2_limit: speed_noise_log2_limit as f64,
            percent_coherent,
            finite_lifetime_ms: finite_lifetime_ms.map(|v| v as f64),
            two_color_contrast,
            dot_disparity_deg: dot_disparity_deg as f64,
            ms_since_noise_refresh: 0.0,
            visible: true,
        }
    }

    fn is_inside_aperture(&self, p: Vec2) -> bool {
        let in_rect = |hw: f64, hh: f64| p.x.abs() <= hw && p.y.abs() <= hh;
        let in_oval = |hw: f64, hh: f64| {
            hw > 0.0 && hh > 0.0 && (p.x / hw).powi(2) + (p.y / hh).powi(2) <= 1.0
        };
        let (ow, oh, iw, ih) = (self.outer_w_deg / 2.0, self.outer_h_deg / 2.0, self.inner_w_deg / 2.0, self.inner_h_deg / 2.0);
        match self.aperture {
            ApertureKind::Rect => in_rect(ow, oh),
            ApertureKind::Oval => in_oval(ow, oh),
            ApertureKind::RectAnnulus => in_rect(ow, oh) && !in_rect(iw, ih),
            ApertureKind::OvalAnnulus => in_oval(ow, oh) && !in_oval(iw, ih),
        }
    }

    fn reposition_randomly(&mut self, index: usize) {
        let half_w = self.outer_w_deg / 2.0;
        let half_h = self.outer_h_deg / 2.0;
        let pos = Vec2::new(self.rng.gen_range(-half_w..=half_w), self.rng.gen_range(-half_h..=half_h));
        self.dots[index].pos_deg = pos;
        if let Some(lifetime) = self.finite_lifetime_ms {
            self.dots[index].lifetime_remaining_ms = lifetime;
        }
    }
}

impl Target for DotPatchTarget {
    fn update_motion(&mut self, frame_interval_ms: f64, vector: MotionVector) {
        self.visible = self.flicker.advance() && vector.on;

        self.ms_since_noise_refresh += frame_interval_ms;
        let refresh_noise = self.ms_since_noise_refresh >= self.noise_interval_ms;
        if refresh_noise {
            self.ms_since_noise_refresh = 0.0;
        }

        let pattern = Vec2::new(vector.pattern_dx_deg as f64, vector.pattern_dy_deg as f64);
        let displacement_mag = pattern.magnitude();
        let n = self.dots.len();
        let n_repositioned = (n as f64 * (1.0 - self.percent_coherent as f64 / 100.0)).round() as usize;

        // Pick which dots get the "incoherent reposition" this frame; a
        // fixed prefix after shuffling would bias the edges of the dot
        // array, so sample without replacement instead.
        let mut indices: Vec<usize> = (0..n).collect();
        for i in (1..indices.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            indices.swap(i, j);
        }
        let repositioned: std::collections::HashSet<usize> = indices.into_iter().take(n_repositioned).collect();

        for i in 0..n {
            if refresh_noise {
                self.dots[i].noise_direction_deg =
                    self.rng.gen_range(-self.direction_noise_limit_deg..=self.direction_noise_limit_deg);
                self.dots[i].noise_speed_log2 =
                    self.rng.gen_range(-self.speed_noise_log2_limit..=self.speed_noise_log2_limit);
            }

            if let Some(lifetime_ms) = self.finite_lifetime_ms {
                let decrement = if displacement_mag > 0.0 { displacement_mag } else { frame_interval_ms };
                self.dots[i].lifetime_remaining_ms -= decrement;
                if self.dots[i].lifetime_remaining_ms <= 0.0 {
                    self.reposition_randomly(i);
                    self.dots[i].lifetime_remaining_ms = lifetime_ms;
                    continue;
                }
            }

            if repositioned.contains(&i) {
                self.reposition_randomly(i);
                continue;
            }

            let speed_scale = 2f64.powf(self.dots[i].noise_speed_log2);
            let dot_vector = pattern.rotated_deg(self.dots[i].noise_direction_deg).scaled(speed_scale);
            let mut pos = self.dots[i].pos_deg.added(dot_vector);
            pos.x = Vec2::wrap_1d(pos.x, self.outer_w_deg / 2.0);
            pos.y = Vec2::wrap_1d(pos.y, self.outer_h_deg / 2.0);
            self.dots[i].pos_deg = pos;
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn uniforms(&self, geometry: &DisplayGeometry, eye_offset_factor: f32) -> Uniforms {
        let disparity_deg = self.dot_disparity_deg * eye_offset_factor as f64;
        let center_px = geometry.deg_to_px(disparity_deg, 0.0);
        let size_px = (self.outer_w_deg * geometry.px_per_deg_x(), self.outer_h_deg * geometry.px_per_deg_y());
        Uniforms {
            model_to_clip: model_to_clip(center_px, size_px, 0.0, (geometry.width_px, geometry.height_px)),
            color: [self.mean_rgb[0] as f32 / 255.0, self.mean_rgb[1] as f32 / 255.0, self.mean_rgb[2] as f32 / 255.0],
            special: Special::DotPatch,
            gratings: Default::default(),
            n_gratings: 0,
        }
    }
}

/// Per-dot alpha for the vertex Tx attribute: 0 outside the aperture, 1
/// inside. Exposed separately since it's written into the shared vertex
/// buffer by the caller, not returned via `Uniforms`.
pub fn dot_alpha(target: &DotPatchTarget, dot: usize) -> f32 {
    if target.is_inside_aperture(target.dots[dot].pos_deg) {
        1.0
    } else {
        0.0
    }
}

/// Number of dots in the patch, for callers rasterizing a per-frame coverage
/// texture from [`dot_position_deg`]/[`dot_alpha`].
pub fn dot_count(target: &DotPatchTarget) -> usize {
    target.dots.len()
}

/// One dot's position in visual degrees, relative to the patch center.
pub fn dot_position_deg(target: &DotPatchTarget, dot: usize) -> Vec2 {
    target.dots[dot].pos_deg
}

/// The configured dot diameter, for sizing the rasterized coverage texture's
/// dot sprites.
pub fn dot_size_pixels(target: &DotPatchTarget) -> u8 {
    target.dot_size_pixels
}

/// Splits the mean/contrast pair into the two-color-contrast halves,
/// `M*(1+C)` and `M*(1-C)` per channel.
pub fn two_color_halves(mean_rgb: [u8; 3], contrast_rgb: [f32; 3]) -> ([f32; 3], [f32; 3]) {
    let mut a = [0.0; 3];
    let mut b = [0.0; 3];
    for c in 0..3 {
        let m = mean_rgb[c] as f32 / 255.0;
        a[c] = (m * (1.0 + contrast_rgb[c])).clamp(0.0, 1.0);
        b[c] = (m * (1.0 - contrast_rgb[c])).clamp(0.0, 1.0);
    }
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use linktalk_proto::Flicker;

    fn def(percent_coherent: u8, finite_lifetime_ms: Option<u16>) -> TargetDefinition {
        TargetDefinition {
            aperture: ApertureKind::Rect,
            outer_width_deg: 20.0,
            outer_height_deg: 20.0,
            inner_width_deg: 0.0,
            inner_height_deg: 0.0,
            blur_sigma_x_deg: 0.0,
            blur_sigma_y_deg: 0.0,
            mean_rgb: [128, 128, 128],
            contrast_rgb: [0.5, 0.5, 0.5],
            flicker: Flicker { on_frames: 0, off_frames: 0, initial_delay_frames: 0 },
            variant: TargetVariant::RandomDotPatch {
                dot_count: 50,
                dot_size_pixels: 2,
                percent_coherent,
                noise_interval_ms: 1000,
                direction_noise_limit_deg: 0.0,
                speed_noise_log2_limit: 0.0,
                finite_lifetime_ms,
                two_color_contrast: false,
                dot_disparity_deg: 0.5,
            },
        }
    }

    #[test]
    fn full_coherence_moves_every_dot_by_the_pattern_vector() {
        let mut t = DotPatchTarget::new(&def(100, None), 42);
        let before: Vec<Vec2> = t.dots.iter().map(|d| d.pos_deg).collect();
        t.update_motion(16.0, MotionVector { pattern_dx_deg: 1.0, on: true, ..Default::default() });
        for (d, b) in t.dots.iter().zip(before.iter()) {
            assert!((d.pos_deg.x - (b.x + 1.0)).abs() < 1e-6 || (d.pos_deg.x - (b.x + 1.0 - 20.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn dots_wrap_at_the_bounding_rectangle_edge() {
        let mut t = DotPatchTarget::new(&def(100, None), 7);
        t.dots[0].pos_deg = Vec2::new(9.9, 0.0);
        t.update_motion(16.0, MotionVector { pattern_dx_deg: 1.0, on: true, ..Default::default() });
        assert!(t.dots[0].pos_deg.x < 0.0);
    }

    #[test]
    fn finite_lifetime_resets_on_expiry() {
        let mut t = DotPatchTarget::new(&def(100, Some(10)), 3);
        t.update_motion(20.0, MotionVector { on: true, ..Default::default() });
        assert_eq!(t.dots[0].lifetime_remaining_ms, 10.0);
    }

    #[test]
    fn two_color_halves_split_around_the_mean() {
        let (a, b) = two_color_halves([128, 128, 128], [0.5, 0.5, 0.5]);
        assert!(a[0] > b[0]);
    }
}
