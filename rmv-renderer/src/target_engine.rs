//! Owns every loaded target, the GL texture pool, and the single shader
//! program they all draw through.
//!
//! Every variant's [`Uniforms::special`] names which texture unit 0 must
//! hold: `Default` samples a static alpha-coverage mask rasterized once at
//! load time via [`rmv_gfx::alpha_mask`]; `ImageOrVideo` samples the decoded
//! image or the latest video frame; `DotPatch` samples a per-frame dot
//! coverage texture this module rasterizes from the dot positions the two
//! dot-based targets expose (`rmv_targets::dot_patch`/`flow_field` otherwise
//! keep their dot state private, so those two variants are the only ones
//! this engine keeps as their concrete struct rather than behind `dyn
//! Target`). Every variant still shares the one preloaded unit quad (or
//! video quad) in `rmv_gfx::vertex_buffer`.

use std::sync::{Arc, Mutex};

use linktalk_proto::{MotionVector, TargetDefinition, TargetVariant};
use rmv_gfx::alpha_mask;
use rmv_gfx::texture_pool::{TextureBackend, TextureKind, TexturePool};
use rmv_gfx::vertex_buffer::{Vertex, VertexBuffer, UNIT_QUAD, VIDEO_QUAD};
use rmv_gfx::{ShaderProgram, Special};
use rmv_math::DisplayGeometry;
use rmv_targets::dot_patch::{self, DotPatchTarget};
use rmv_targets::flow_field::{self, FlowFieldTarget};
use rmv_targets::image_target::ImageTarget;
use rmv_targets::movie_target::MovieTarget;
use rmv_targets::{create_target, Target};
use rmv_video::{FfmpegDecoder, FrameDecoder, MediaStore, VideoBufferThread, VideoStream};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetEngineError {
    #[error(transparent)]
    Video(#[from] rmv_video::VideoError),
    #[error(transparent)]
    Gfx(#[from] rmv_gfx::GfxError),
    #[error("the video-buffer thread has no free stream slot for this movie target")]
    NoStreamSlot,
}

pub type Result<T> = std::result::Result<T, TargetEngineError>;

/// Real GL-backed texture allocator for [`TexturePool`].
pub struct GlTextureBackend;

impl TextureBackend for GlTextureBackend {
    fn create(&mut self, kind: TextureKind, width: u32, height: u32) -> u32 {
        unsafe {
            let mut handle = 0u32;
            gl::GenTextures(1, &mut handle);
            gl::BindTexture(gl::TEXTURE_2D, handle);
            let internal_format = match kind {
                TextureKind::AlphaMask => gl::R8,
                TextureKind::RgbaImage => gl::RGBA8,
                TextureKind::RgbFrame => gl::RGB8,
            };
            let format = gl_format(kind);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                internal_format as i32,
                width as i32,
                height as i32,
                0,
                format,
                gl::UNSIGNED_BYTE,
                std::ptr::null(),
            );
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as i32);
            handle
        }
    }

    fn destroy(&mut self, handle: u32) {
        unsafe { gl::DeleteTextures(1, &handle) }
    }
}

fn gl_format(kind: TextureKind) -> gl::types::GLenum {
    match kind {
        TextureKind::AlphaMask => gl::RED,
        TextureKind::RgbaImage => gl::RGBA,
        TextureKind::RgbFrame => gl::RGB,
    }
}

fn upload(handle: u32, kind: TextureKind, width: u32, height: u32, pixels: &[u8]) {
    unsafe {
        gl::BindTexture(gl::TEXTURE_2D, handle);
        gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
        gl::TexSubImage2D(
            gl::TEXTURE_2D,
            0,
            0,
            0,
            width as i32,
            height as i32,
            gl_format(kind),
            gl::UNSIGNED_BYTE,
            pixels.as_ptr().cast(),
        );
    }
}

/// A dot-based target's concrete state, kept unboxed so this module can
/// reach its dot positions every frame to rasterize the coverage texture
/// `Special::DotPatch` samples. `dot_size_px` is the sprite radius used
/// when filling the texture; the flow-field variant has no configurable
/// dot size, so it uses [`DEFAULT_FLOW_DOT_RADIUS_PX`].
enum DotKind {
    Patch(DotPatchTarget),
    Flow(FlowFieldTarget),
}

const DEFAULT_FLOW_DOT_RADIUS_PX: f32 = 1.5;

impl DotKind {
    fn as_target(&self) -> &dyn Target {
        match self {
            DotKind::Patch(t) => t,
            DotKind::Flow(t) => t,
        }
    }

    fn as_target_mut(&mut self) -> &mut dyn Target {
        match self {
            DotKind::Patch(t) => t,
            DotKind::Flow(t) => t,
        }
    }

    fn dot_radius_px(&self) -> f32 {
        match self {
            DotKind::Patch(t) => dot_patch::dot_size_pixels(t) as f32 / 2.0,
            DotKind::Flow(_) => DEFAULT_FLOW_DOT_RADIUS_PX,
        }
    }

    /// Each dot's center in visual degrees (patch-local for
    /// [`DotKind::Patch`], field-local for [`DotKind::Flow`]) and whether
    /// it's currently inside the aperture and should be drawn.
    fn dot_positions_deg(&self) -> Vec<(rmv_math::Vec2, bool)> {
        match self {
            DotKind::Patch(t) => (0..dot_patch::dot_count(t))
                .map(|i| (dot_patch::dot_position_deg(t, i), dot_patch::dot_alpha(t, i) > 0.0))
                .collect(),
            DotKind::Flow(t) => (0..flow_field::dot_count(t)).map(|i| (flow_field::dot_position_deg(t, i), true)).collect(),
        }
    }
}

/// Fills a `dim x dim` luminance texture with filled circles at each dot's
/// projected pixel position, skipping dots outside the aperture. Mirrors
/// [`rmv_gfx::alpha_mask::rasterize_alpha_mask`]'s per-texel approach but
/// draws sprites directly instead of evaluating an aperture predicate, since
/// dot positions change every frame and a full per-texel scan would be
/// wasted work for a sparse pattern.
fn rasterize_dot_coverage(dots: &[(rmv_math::Vec2, bool)], dot_radius_px: f32, dim: u32, half_w_deg: f64, half_h_deg: f64) -> Vec<u8> {
    let dim_usize = dim as usize;
    let mut buf = vec![0u8; dim_usize * dim_usize];
    let px_per_deg_x = dim as f64 / (2.0 * half_w_deg);
    let px_per_deg_y = dim as f64 / (2.0 * half_h_deg);
    let r = dot_radius_px.max(1.0) as f64;

    for (pos, visible) in dots {
        if !visible {
            continue;
        }
        let cx = (pos.x + half_w_deg) * px_per_deg_x;
        let cy = (half_h_deg - pos.y) * px_per_deg_y;
        let x0 = (cx - r).floor().max(0.0) as usize;
        let x1 = ((cx + r).ceil() as usize).min(dim_usize);
        let y0 = (cy - r).floor().max(0.0) as usize;
        let y1 = ((cy + r).ceil() as usize).min(dim_usize);
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    buf[y * dim_usize + x] = 255;
                }
            }
        }
    }
    buf
}

enum TargetState {
    /// Point/Spot/Bar/Grating/Plaid: static alpha-mask texture, no per-frame
    /// texture work.
    Generic(Box<dyn Target>),
    Dot { kind: DotKind, half_w_deg: f64, half_h_deg: f64 },
    Image(ImageTarget),
    Movie { target: MovieTarget, stream: Arc<Mutex<VideoStream>> },
}

impl TargetState {
    fn as_target(&self) -> &dyn Target {
        match self {
            TargetState::Generic(t) => t.as_ref(),
            TargetState::Dot { kind, .. } => kind.as_target(),
            TargetState::Image(t) => t,
            TargetState::Movie { target, .. } => target,
        }
    }

    fn as_target_mut(&mut self) -> &mut dyn Target {
        match self {
            TargetState::Generic(t) => t.as_mut(),
            TargetState::Dot { kind, .. } => kind.as_target_mut(),
            TargetState::Image(t) => t,
            TargetState::Movie { target, .. } => target,
        }
    }
}

struct LoadedTarget {
    state: TargetState,
    texture: u32,
    texture_kind: TextureKind,
    texture_w: u32,
    texture_h: u32,
}

pub struct TargetEngine {
    shader: ShaderProgram,
    pool: TexturePool<GlTextureBackend>,
    vao: u32,
    vbo: u32,
    /// A 1x1 fully-opaque alpha mask, bound whenever a quad needs to draw
    /// at full coverage regardless of aperture (the sync-flash quad has no
    /// aperture of its own).
    white_texture: u32,
    targets: Vec<LoadedTarget>,
    video_buffer: VideoBufferThread,
}

impl TargetEngine {
    pub fn new() -> Result<Self> {
        let shader = ShaderProgram::compile()?;
        let (vao, vbo) = unsafe { create_quad_geometry() };
        let mut pool = TexturePool::new(GlTextureBackend);
        let white_texture = pool.acquire(TextureKind::AlphaMask, 1, 1)?;
        upload(white_texture, TextureKind::AlphaMask, 1, 1, &[0xffu8]);
        Ok(TargetEngine {
            shader,
            pool,
            vao,
            vbo,
            white_texture,
            targets: Vec::new(),
            video_buffer: VideoBufferThread::start(),
        })
    }

    /// Loads a `load-targets` batch, replacing whatever was previously
    /// loaded: one load-targets call defines the whole scene.
    pub fn load(&mut self, definitions: &[TargetDefinition], media: &MediaStore) -> Result<()> {
        self.unload_targets();
        for (index, def) in definitions.iter().enumerate() {
            let loaded = self.load_one(def, index as u64, media)?;
            self.targets.push(loaded);
        }
        Ok(())
    }

    fn load_one(&mut self, def: &TargetDefinition, seed: u64, media: &MediaStore) -> Result<LoadedTarget> {
        match &def.variant {
            TargetVariant::Image { folder, file } => {
                let path = media.file_path(folder, file)?;
                let mut target = ImageTarget::new(def);
                target.load(&path)?;
                let image = target.image().expect("just loaded");
                let (w, h) = (image.width, image.height);
                let texture = self.pool.acquire(TextureKind::RgbaImage, w, h)?;
                upload(texture, TextureKind::RgbaImage, w, h, &image.rgba8);
                Ok(LoadedTarget {
                    state: TargetState::Image(target),
                    texture,
                    texture_kind: TextureKind::RgbaImage,
                    texture_w: w,
                    texture_h: h,
                })
            }
            TargetVariant::Movie { folder, file, pause_when_off, repeat, stop_on_eof, .. } => {
                let path = media.file_path(folder, file)?;
                let decoder = FfmpegDecoder::open(&path)?;
                let (w, h) = (decoder.frame_width(), decoder.frame_height());
                let stream = VideoStream::new(Box::new(decoder), *pause_when_off, *repeat, *stop_on_eof);
                let handle = self.video_buffer.open_stream(stream).ok_or(TargetEngineError::NoStreamSlot)?;
                let mut target = MovieTarget::new(def);
                target.attach_stream(handle.clone());
                let texture = self.pool.acquire(TextureKind::RgbFrame, w, h)?;
                Ok(LoadedTarget {
                    state: TargetState::Movie { target, stream: handle },
                    texture,
                    texture_kind: TextureKind::RgbFrame,
                    texture_w: w,
                    texture_h: h,
                })
            }
            TargetVariant::RandomDotPatch { .. } | TargetVariant::OpticalFlowField { .. } => {
                let dim = alpha_mask::mask_dimension(def.outer_width_deg.max(def.outer_height_deg) as u32);
                let texture = self.pool.acquire(TextureKind::AlphaMask, dim, dim)?;
                let kind = if matches!(def.variant, TargetVariant::RandomDotPatch { .. }) {
                    DotKind::Patch(DotPatchTarget::new(def, seed))
                } else {
                    DotKind::Flow(FlowFieldTarget::new(def, seed))
                };
                Ok(LoadedTarget {
                    state: TargetState::Dot {
                        kind,
                        half_w_deg: def.outer_width_deg as f64 / 2.0,
                        half_h_deg: def.outer_height_deg as f64 / 2.0,
                    },
                    texture,
                    texture_kind: TextureKind::AlphaMask,
                    texture_w: dim,
                    texture_h: dim,
                })
            }
            _ => {
                let dim = alpha_mask::mask_dimension(def.outer_width_deg.max(def.outer_height_deg) as u32);
                let deg_per_px = def.outer_width_deg.max(def.outer_height_deg) as f64 / dim as f64;
                let mask = alpha_mask::rasterize_alpha_mask(
                    def.aperture,
                    def.outer_width_deg as f64,
                    def.outer_height_deg as f64,
                    def.inner_width_deg as f64,
                    def.inner_height_deg as f64,
                    def.blur_sigma_x_deg as f64,
                    def.blur_sigma_y_deg as f64,
                    dim,
                    deg_per_px,
                );
                let texture = self.pool.acquire(TextureKind::AlphaMask, dim, dim)?;
                upload(texture, TextureKind::AlphaMask, dim, dim, &mask);
                Ok(LoadedTarget {
                    state: TargetState::Generic(create_target(def, seed)),
                    texture,
                    texture_kind: TextureKind::AlphaMask,
                    texture_w: dim,
                    texture_h: dim,
                })
            }
        }
    }

    pub fn update_motion(&mut self, frame_interval_ms: f64, vectors: &[MotionVector]) {
        for (loaded, vector) in self.targets.iter_mut().zip(vectors) {
            loaded.state.as_target_mut().update_motion(frame_interval_ms, *vector);
            match &loaded.state {
                TargetState::Dot { kind, half_w_deg, half_h_deg } => {
                    let dots = kind.dot_positions_deg();
                    let mask = rasterize_dot_coverage(&dots, kind.dot_radius_px(), loaded.texture_w, *half_w_deg, *half_h_deg);
                    upload(loaded.texture, loaded.texture_kind, loaded.texture_w, loaded.texture_h, &mask);
                }
                TargetState::Movie { stream, .. } => {
                    if let Some(frame) = stream.lock().unwrap().take_next_frame() {
                        upload(loaded.texture, loaded.texture_kind, loaded.texture_w, loaded.texture_h, &frame.rgb24);
                    }
                }
                _ => {}
            }
        }
    }

    /// Draws every visible target for one eye (`eye_offset_factor` is 0 in
    /// mono mode, ±0.5 in stereo), leaving the sync-flash quad to the caller,
    /// which always draws it last, above all targets.
    pub fn draw(&self, geometry: &DisplayGeometry, eye_offset_factor: f32) {
        self.shader.use_program();
        unsafe {
            gl::BindVertexArray(self.vao);
        }
        for loaded in &self.targets {
            let target = loaded.state.as_target();
            if !target.is_visible() {
                continue;
            }
            let uniforms = target.uniforms(geometry, eye_offset_factor);
            self.shader.apply(&uniforms);
            unsafe {
                gl::ActiveTexture(gl::TEXTURE0);
                gl::BindTexture(gl::TEXTURE_2D, loaded.texture);
            }
            let first = if uniforms.special == Special::ImageOrVideo && loaded.texture_kind == TextureKind::RgbFrame {
                VIDEO_QUAD
            } else {
                UNIT_QUAD
            };
            unsafe {
                gl::DrawArrays(gl::TRIANGLES, first as i32, 6);
            }
        }
    }

    /// Draws the sync-flash quad, which has no aperture of its own and so
    /// samples the always-opaque [`Self::white_texture`] instead of a
    /// rasterized mask. Always drawn last, above all targets.
    pub fn draw_sync_flash(&self, geometry: &DisplayGeometry, sync_flash: &crate::sync_flash::SyncFlash, lit: bool) {
        if !sync_flash.is_active() {
            return;
        }
        self.shader.use_program();
        let uniforms = sync_flash.uniforms(geometry, lit);
        self.shader.apply(&uniforms);
        unsafe {
            gl::BindVertexArray(self.vao);
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.white_texture);
            gl::DrawArrays(gl::TRIANGLES, UNIT_QUAD as i32, 6);
        }
    }

    fn unload_targets(&mut self) {
        for loaded in self.targets.drain(..) {
            self.pool.release(loaded.texture);
            if let TargetState::Movie { stream, .. } = loaded.state {
                self.video_buffer.close_stream(&stream);
            }
        }
    }

    /// Tears down every loaded target and its video streams, called once at
    /// animation stop.
    pub fn unload_all(&mut self) {
        self.unload_targets();
    }
}

impl Drop for TargetEngine {
    fn drop(&mut self) {
        unsafe {
            gl::DeleteVertexArrays(1, &self.vao);
            gl::DeleteBuffers(1, &self.vbo);
        }
    }
}

unsafe fn create_quad_geometry() -> (u32, u32) {
    let vb = VertexBuffer::new();
    let mut vao = 0u32;
    let mut vbo = 0u32;
    gl::GenVertexArrays(1, &mut vao);
    gl::GenBuffers(1, &mut vbo);
    gl::BindVertexArray(vao);
    gl::BindBuffer(gl::ARRAY_BUFFER, vbo);
    gl::BufferData(
        gl::ARRAY_BUFFER,
        (vb.data().len() * std::mem::size_of::<Vertex>()) as isize,
        vb.data().as_ptr().cast(),
        gl::STATIC_DRAW,
    );
    let stride = std::mem::size_of::<Vertex>() as i32;
    gl::VertexAttribPointer(0, 2, gl::FLOAT, gl::FALSE, stride, std::ptr::null());
    gl::EnableVertexAttribArray(0);
    gl::VertexAttribPointer(1, 2, gl::FLOAT, gl::FALSE, stride, (2 * std::mem::size_of::<f32>()) as *const _);
    gl::EnableVertexAttribArray(1);
    (vao, vbo)
}
