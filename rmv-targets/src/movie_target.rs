//! Video (movie) target: streamed through the video-buffer thread's ring,
//! with at-display-rate or native-interval pacing, pause-when-off, and
//! repeat-at-EOF.

use std::sync::{Arc, Mutex};

use linktalk_proto::{MotionVector, TargetDefinition, TargetVariant};
use rmv_gfx::{Special, Uniforms};
use rmv_math::{DisplayGeometry, Vec2};
use rmv_video::{DecodedFrame, VideoStream};

use crate::common::{model_to_clip, FlickerState};
use crate::Target;

pub struct MovieTarget {
    flicker: FlickerState,
    center_deg: Vec2,
    width_deg: f64,
    height_deg: f64,
    pub folder: String,
    pub file: String,
    pub at_display_rate: bool,
    stream: Option<Arc<Mutex<VideoStream>>>,
    current_frame: Option<DecodedFrame>,
    elapsed_ms_since_last_frame: f64,
    visible: bool,
}

impl MovieTarget {
    pub fn new(definition: &TargetDefinition) -> Self {
        let TargetVariant::Movie { folder, file, at_display_rate, .. } = &definition.variant else {
            unreachable!("MovieTarget built from a non-movie definition");
        };
        MovieTarget {
            flicker: FlickerState::new(definition.flicker),
            center_deg: Vec2::new(0.0, 0.0),
            width_deg: definition.outer_width_deg as f64,
            height_deg: definition.outer_height_deg as f64,
            folder: folder.clone(),
            file: file.clone(),
            at_display_rate: *at_display_rate,
            stream: None,
            current_frame: None,
            elapsed_ms_since_last_frame: 0.0,
            visible: true,
        }
    }

    /// Attaches the ring-backed stream opened on the video-buffer thread.
    pub fn attach_stream(&mut self, stream: Arc<Mutex<VideoStream>>) {
        self.stream = Some(stream);
    }

    pub fn current_frame(&self) -> Option<&DecodedFrame> {
        self.current_frame.as_ref()
    }

    fn advance_frame_if_due(&mut self, frame_interval_ms: f64) {
        let Some(stream) = &self.stream else { return };
        let stream = stream.lock().unwrap();

        if self.at_display_rate {
            self.current_frame = stream.take_next_frame().or_else(|| self.current_frame.clone());
            return;
        }

        self.elapsed_ms_since_last_frame += frame_interval_ms;
        // Native-rate pacing: only pull the next ring frame once its
        // presentation timestamp has actually elapsed relative to the one
        // on screen.
        let due = match (&self.current_frame, stream.take_next_frame()) {
            (Some(current), Some(next)) => {
                let interval_ms = (next.pts_s - current.pts_s).max(0.0) * 1000.0;
                if self.elapsed_ms_since_last_frame >= interval_ms {
                    Some(next)
                } else {
                    None
                }
            }
            (None, next) => next,
            _ => None,
        };
        if let Some(frame) = due {
            self.current_frame = Some(frame);
            self.elapsed_ms_since_last_frame = 0.0;
        }
    }
}

impl Target for MovieTarget {
    fn update_motion(&mut self, frame_interval_ms: f64, vector: MotionVector) {
        self.visible = self.flicker.advance() && vector.on;
        self.center_deg = self
            .center_deg
            .added(Vec2::new(vector.window_dx_deg as f64, vector.window_dy_deg as f64));

        if let Some(stream) = &self.stream {
            let stream = stream.lock().unwrap();
            stream.set_active(vector.on);
            if !stream.is_active() {
                return;
            }
        }
        self.advance_frame_if_due(frame_interval_ms);
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn uniforms(&self, geometry: &DisplayGeometry, _eye_offset_factor: f32) -> Uniforms {
        let center_px = geometry.deg_to_px(self.center_deg.x, self.center_deg.y);
        let size_px = (self.width_deg * geometry.px_per_deg_x(), self.height_deg * geometry.px_per_deg_y());
        Uniforms {
            model_to_clip: model_to_clip(center_px, size_px, 0.0, (geometry.width_px, geometry.height_px)),
            color: [1.0, 1.0, 1.0],
            special: Special::ImageOrVideo,
            gratings: Default::default(),
            n_gratings: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linktalk_proto::{ApertureKind, Flicker};
    use rmv_video::NullDecoder;

    fn def(at_display_rate: bool) -> TargetDefinition {
        TargetDefinition {
            aperture: ApertureKind::Rect,
            outer_width_deg: 10.0,
            outer_height_deg: 10.0,
            inner_width_deg: 0.0,
            inner_height_deg: 0.0,
            blur_sigma_x_deg: 0.0,
            blur_sigma_y_deg: 0.0,
            mean_rgb: [0, 0, 0],
            contrast_rgb: [0.0, 0.0, 0.0],
            flicker: Flicker { on_frames: 0, off_frames: 0, initial_delay_frames: 0 },
            variant: TargetVariant::Movie {
                folder: "clips".into(),
                file: "a.mp4".into(),
                at_display_rate,
                pause_when_off: false,
                repeat: false,
                stop_on_eof: true,
            },
        }
    }

    #[test]
    fn at_display_rate_pulls_one_frame_per_update() {
        let mut t = MovieTarget::new(&def(true));
        let mut stream = VideoStream::new(Box::new(NullDecoder::new(4, 4, 5)), false, false, true);
        stream.pump_one_frame();
        t.attach_stream(Arc::new(Mutex::new(stream)));
        t.update_motion(16.0, MotionVector { on: true, ..Default::default() });
        assert!(t.current_frame().is_some());
    }
}
