//! Still image target: loaded once at initialization, then only
//! translated/flickered per frame like Point/Spot/Bar.

use linktalk_proto::{MotionVector, TargetDefinition, TargetVariant};
use rmv_gfx::{Special, Uniforms};
use rmv_math::{DisplayGeometry, Vec2};
use rmv_video::DecodedImage;

use crate::common::{model_to_clip, FlickerState};
use crate::Target;

pub struct ImageTarget {
    flicker: FlickerState,
    center_deg: Vec2,
    width_deg: f64,
    height_deg: f64,
    pub folder: String,
    pub file: String,
    image: Option<DecodedImage>,
    visible: bool,
}

impl ImageTarget {
    pub fn new(definition: &TargetDefinition) -> Self {
        let TargetVariant::Image { folder, file } = &definition.variant else {
            unreachable!("ImageTarget built from a non-image definition");
        };
        ImageTarget {
            flicker: FlickerState::new(definition.flicker),
            center_deg: Vec2::new(0.0, 0.0),
            width_deg: definition.outer_width_deg as f64,
            height_deg: definition.outer_height_deg as f64,
            folder: folder.clone(),
            file: file.clone(),
            image: None,
            visible: true,
        }
    }

    /// Loads the backing pixels. Called once by the renderer after
    /// resolving `folder`/`file` against the media store.
    pub fn load(&mut self, path: &std::path::Path) -> rmv_video::Result<()> {
        self.image = Some(rmv_video::load_image(path)?);
        Ok(())
    }

    pub fn image(&self) -> Option<&DecodedImage> {
        self.image.as_ref()
    }
}

impl Target for ImageTarget {
    fn update_motion(&mut self, _frame_interval_ms: f64, vector: MotionVector) {
        self.visible = self.flicker.advance() && vector.on;
        self.center_deg = self
            .center_deg
            .added(Vec2::new(vector.window_dx_deg as f64, vector.window_dy_deg as f64));
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
