//! The `Target` trait and its ~10 variants. Each variant owns
//! its own motion state and produces the [`rmv_gfx::Uniforms`] and optional
//! texture/vertex-slice updates the renderer core needs each frame; no GL
//! calls happen in this crate, mirroring how `rmv-gfx`'s pool and buffer
//! types stay GL-free so they can be unit-tested.

pub mod common;
pub mod dot_patch;
pub mod error;
pub mod flow_field;
pub mod grating;
pub mod image_target;
pub mod movie_target;
pub mod simple;

pub use error::{Result, TargetError};

use linktalk_proto::{MotionVector, TargetDefinition, TargetVariant};
use rmv_gfx::Uniforms;
use rmv_math::DisplayGeometry;

/// Common interface every target variant implements.
pub trait Target: Send {
    /// Advances the target's motion state by one frame.
    fn update_motion(&mut self, frame_interval_ms: f64, vector: MotionVector);

    /// Whether the target should be drawn this frame (flicker- and
    /// on/off-gated).
    fn is_visible(&self) -> bool;

    /// The uniform set for this frame's draw call. `eye_offset_factor` is 0
    /// in mono mode and ±0.5 in stereo mode; dot-based variants multiply it
    /// into their dot-disparity field.
    fn uniforms(&self, geometry: &DisplayGeometry, eye_offset_factor: f32) -> Uniforms;
}

/// Builds the concrete target implementation for one definition. `seed`
/// drives the pseudo-random dot placement for the two dot-based variants;
/// callers typically derive it from the target's index within a load-targets
/// batch so sibling targets don't share identical dot layouts.
pub fn create_target(definition: &TargetDefinition, seed: u64) -> Box<dyn Target> {
    match &definition.variant {
        TargetVariant::Point => Box::new(simple::SimpleTarget::new(definition, 0.0)),
        TargetVariant::Spot => Box::new(simple::SimpleTarget::new(definition, 0.0)),
        TargetVariant::Bar { drift_axis_deg, .. } => {
            Box::new(simple::SimpleTarget::new(definition, *drift_axis_deg as f64))
        }
        TargetVariant::Grating { .. } | TargetVariant::Plaid { .. } => {
            Box::new(grating::GratingTarget::new(definition))
        }
        TargetVariant::RandomDotPatch { .. } => Box::new(dot_patch::DotPatchTarget::new(definition, seed)),
        TargetVariant::OpticalFlowField { .. } => Box::new(flow_field::FlowFieldTarget::new(definition, seed)),
        TargetVariant::Image { .. } => Box::new(image_target::ImageTarget::new(definition)),
        TargetVariant::Movie { .. } => Box::new(movie_target::MovieTarget::new(definition)),
    }
}
