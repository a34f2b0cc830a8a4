use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoder error: {0}")]
    Decode(String),

    #[error("unsupported image format for {0:?}")]
    UnsupportedImage(std::path::PathBuf),

    #[error("media name {0:?} is empty, too long, or uses a disallowed character")]
    InvalidMediaName(String),

    #[error("stream is disabled after an unrecoverable decode error")]
    StreamDisabled,
}

pub type Result<T> = std::result::Result<T, VideoError>;
