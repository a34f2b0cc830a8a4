use thiserror::Error;

#[derive(Debug, Error)]
pub enum GfxError {
    #[error("the shared vertex buffer has no contiguous free run of {0} vertices")]
    VertexBufferFull(usize),

    #[error("freed a vertex slot that was not outstanding")]
    DoubleFree,

    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    #[error("shader program link failed: {0}")]
    ShaderLink(String),

    #[error("texture pool cap of {0} bytes is smaller than the requested allocation of {1} bytes")]
    TextureTooLarge(usize, usize),
}

pub type Result<T> = std::result::Result<T, GfxError>;
