//! The sync-flash quad:
//! a small corner square that flips to white for a configured number of
//! frames at the start of each animation, for photodiode timing checks.

use rmv_gfx::{Special, Uniforms};
use rmv_math::DisplayGeometry;
use rmv_targets::common::model_to_clip;

pub struct SyncFlash {
    size_mm: f32,
    duration_frames: u32,
    frames_remaining: u32,
}

impl SyncFlash {
    pub fn new(size_mm: f32, duration_frames: u32) -> Self {
        SyncFlash { size_mm, duration_frames, frames_remaining: 0 }
    }

    pub fn set_config(&mut self, size_mm: f32, duration_frames: u32) {
        self.size_mm = size_mm;
        self.duration_frames = duration_frames;
    }

    /// Arms the flash for the next animation start.
    pub fn arm(&mut self) {
        self.frames_remaining = self.duration_frames;
    }

    /// Extinguishes the flash immediately, e.g. on `stop-animate`.
    pub fn extinguish(&mut self) {
        self.frames_remaining = 0;
    }

    /// Advances one frame and reports whether the flash is lit on it.
    pub fn advance(&mut self) -> bool {
        if self.frames_remaining == 0 {
            return false;
        }
        self.frames_remaining -= 1;
        true
    }

    pub fn is_active(&self) -> bool {
        self.size_mm > 0.0 && self.duration_frames > 0
    }

    pub fn uniforms(&self, geometry: &DisplayGeometry, lit: bool) -> Uniforms {
        let size_deg = geometry.mm_to_deg(self.size_mm as f64);
        let size_px = size_deg * geometry.px_per_deg_x();
        let half = size_px / 2.0;
        let color = if lit { [1.0, 1.0, 1.0] } else { [0.0, 0.0, 0.0] };
        Uniforms {
            model_to_clip: model_to_clip(
                (half, geometry.height_px as f64 - half),
                (size_px, size_px),
                0.0,
                (geometry.width_px, geometry.height_px),
            ),
            color,
            special: Special::Default,
            gratings: Default::default(),
            n_gratings: 0,
        }
    }
}
