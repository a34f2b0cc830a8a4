use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("vertex buffer error: {0}")]
    VertexBuffer(#[from] rmv_gfx::GfxError),

    #[error("video stream error: {0}")]
    Video(#[from] rmv_video::VideoError),

    #[error("target variant {0} has no dot-based geometry to recycle")]
    NotDotBased(&'static str),
}

pub type Result<T> = std::result::Result<T, TargetError>;
