//! Shared OpenGL-adjacent rendering resources for the stimulus renderer:
//! the vertex buffer, texture pool, shader program, and CPU-side alpha-mask
//! rasterizer.

pub mod alpha_mask;
pub mod error;
pub mod shader;
pub mod texture_pool;
pub mod vertex_buffer;

pub use alpha_mask::{mask_dimension, rasterize_alpha_mask};
pub use error::{GfxError, Result};
pub use shader::{GratingUniform, ShaderProgram, Special, Uniforms};
pub use texture_pool::{TextureBackend, TextureKind, TexturePool};
pub use vertex_buffer::{Vertex, VertexBuffer, VertexSlot, PRELOAD_COUNT, VERTEX_CAPACITY};
