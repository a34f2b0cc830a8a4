use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("link closed mid-frame")]
    Truncated,

    #[error("unknown command/signal tag {0:#x}")]
    UnknownTag(u32),

    #[error("payload word count {0} exceeds the maximum of {1}")]
    PayloadTooLarge(u32, u32),

    #[error("payload contained invalid UTF-8 text")]
    InvalidText,

    #[error("{0} is not valid outside an animation sequence")]
    InvalidOutsideAnimation(&'static str),

    #[error("{0} is not valid during an animation sequence")]
    InvalidDuringAnimation(&'static str),
}

pub type Result<T> = std::result::Result<T, ProtoError>;
