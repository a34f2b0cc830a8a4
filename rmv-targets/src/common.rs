//! State shared by every target variant: flicker on/off/delay-frame
//! counting and the model-to-clip transform every variant feeds to the
//! shared shader.

use linktalk_proto::Flicker;

/// Builds the column-major 4x4 model-to-clip transform that places a unit
/// quad (model space `[-0.5, 0.5]^2`) at `center_px` (top-left pixel origin)
/// with footprint `size_px` and an optional in-plane rotation, for a window
/// of `screen_px` pixels.
pub fn model_to_clip(center_px: (f64, f64), size_px: (f64, f64), rotation_deg: f64, screen_px: (u32, u32)) -> [f32; 16] {
    let (cx, cy) = center_px;
    let ndc_x = (cx / screen_px.0 as f64) * 2.0 - 1.0;
    let ndc_y = 1.0 - (cy / screen_px.1 as f64) * 2.0;
    let sx = size_px.0 / screen_px.0 as f64 * 2.0;
    let sy = size_px.1 / screen_px.1 as f64 * 2.0;
    let r = rotation_deg.to_radians();
    let (s, c) = r.sin_cos();

    // Column-major: columns are the transformed basis vectors, then
    // translation. Rotation composed with non-uniform scale.
    [
        (sx * c) as f32,
        (sx * s) as f32,
        0.0,
        0.0,
        (-sy * s) as f32,
        (sy * c) as f32,
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
        0.0,
        ndc_x as f32,
        ndc_y as f32,
        0.0,
        1.0,
    ]
}

/// Tracks the flicker duty cycle: `initial_delay_frames` frames off, then
/// alternating `on_frames` visible / `off_frames` hidden. A zero on/off
/// count means "always visible" (no flicker requested).
#[derive(Debug, Clone, Copy)]
pub struct FlickerState {
    on_frames: u16,
    off_frames: u16,
    frames_remaining_in_delay: u16,
    in_on_phase: bool,
    phase_frames_remaining: u16,
}

impl FlickerState {
    pub fn new(flicker: Flicker) -> Self {
        let flickers = flicker.on_frames > 0 || flicker.off_frames > 0;
        FlickerState {
            on_frames: flicker.on_frames,
            off_frames: flicker.off_frames,
            frames_remaining_in_delay: flicker.initial_delay_frames,
            in_on_phase: true,
            phase_frames_remaining: if flickers { flicker.on_frames.max(1) } else { 0 },
        }
    }

    /// Advances one frame and returns whether the target is visible on it.
    pub fn advance(&mut self) -> bool {
        if self.frames_remaining_in_delay > 0 {
            self.frames_remaining_in_delay -= 1;
            return false;
        }
        if self.on_frames == 0 && self.off_frames == 0 {
            return true;
        }
        let visible = self.in_on_phase;
        if self.phase_frames_remaining > 0 {
            self.phase_frames_remaining -= 1;
        }
        if self.phase_frames_remaining == 0 {
            self.in_on_phase = !self.in_on_phase;
            self.phase_frames_remaining = if self.in_on_phase { self.on_frames } else { self.off_frames }.max(1);
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flicker_is_always_visible() {
        let mut f = FlickerState::new(Flicker { on_frames: 0, off_frames: 0, initial_delay_frames: 0 });
        for _ in 0..5 {
            assert!(f.advance());
        }
    }

    #[test]
    fn initial_delay_holds_the_target_hidden() {
        let mut f = FlickerState::new(Flicker { on_frames: 2, off_frames: 2, initial_delay_frames: 3 });
        assert!(!f.advance());
        assert!(!f.advance());
        assert!(!f.advance());
        assert!(f.advance());
    }

    #[test]
    fn centered_unrotated_quad_maps_origin_to_ndc_center() {
        let m = model_to_clip((960.0, 540.0), (100.0, 100.0), 0.0, (1920, 1080));
        assert!(m[12].abs() < 1e-6);
        assert!(m[13].abs() < 1e-6);
    }

    #[test]
    fn on_off_frames_alternate() {
        let mut f = FlickerState::new(Flicker { on_frames: 2, off_frames: 1, initial_delay_frames: 0 });
        let visible: Vec<bool> = (0..6).map(|_| f.advance()).collect();
        assert_eq!(visible, vec![true, true, false, true, true, false]);
    }
}
