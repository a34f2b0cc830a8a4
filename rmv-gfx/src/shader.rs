//! The single GLSL 3.3 program handling every target variant (,
//! §9 "Shader uniforms as a typed union").

use std::ffi::CString;

use crate::error::{GfxError, Result};

pub const VERTEX_SRC: &str = r#"#version 330 core
layout(location = 0) in vec2 aPos;
layout(location = 1) in vec2 aTexCoord;
uniform mat4 uModelToClip;
out vec2 vTexCoord;
void main() {
    vTexCoord = aTexCoord;
    gl_Position = uModelToClip * vec4(aPos, 0.0, 1.0);
}
"#;

pub const FRAGMENT_SRC: &str = r#"#version 330 core
in vec2 vTexCoord;
out vec4 FragColor;

uniform sampler2D uTex;
uniform vec3 uColor;
uniform int uSpecial;
uniform int uNGratings;

uniform vec2 uGratingCenterPx[2];
uniform vec2 uGratingPeriodPx[2];
uniform float uGratingPhaseDeg[2];
uniform vec3 uGratingMean[2];
uniform vec3 uGratingContrast[2];
uniform int uGratingSquare[2];

float gratingWave(float t, int square) {
    float s = sin(radians(t));
    return square != 0 ? sign(s) : s;
}

void main() {
    vec4 texel = texture(uTex, vTexCoord);
    if (uSpecial == 1) {
        FragColor = texel;
        return;
    }
    if (uSpecial == 2) {
        FragColor = vec4(uColor, texel.r);
        return;
    }
    vec3 rgb = uColor;
    for (int i = 0; i < uNGratings; i++) {
        vec2 delta = gl_FragCoord.xy - uGratingCenterPx[i];
        float proj = dot(delta, vec2(1.0, 0.0)) / uGratingPeriodPx[i].x
                   + dot(delta, vec2(0.0, 1.0)) / uGratingPeriodPx[i].y;
        float wave = gratingWave(proj * 360.0 + uGratingPhaseDeg[i], uGratingSquare[i]);
        rgb = uGratingMean[i] + uGratingContrast[i] * wave * rgb;
    }
    FragColor = vec4(rgb, texel.r);
}
"#;

/// Per-grating uniform block; up to two are active at once (plaid mode).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GratingUniform {
    pub center_px: [f32; 2],
    pub period_px: [f32; 2],
    pub phase_deg: f32,
    pub mean: [f32; 3],
    pub contrast: [f32; 3],
    pub square_wave: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    Default = 0,
    ImageOrVideo = 1,
    DotPatch = 2,
}

/// The full uniform set for one draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniforms {
    pub model_to_clip: [f32; 16],
    pub color: [f32; 3],
    pub special: Special,
    pub gratings: [GratingUniform; 2],
    pub n_gratings: u8,
}

struct UniformLocations {
    model_to_clip: i32,
    color: i32,
    special: i32,
    n_gratings: i32,
    grating_center_px: i32,
    grating_period_px: i32,
    grating_phase_deg: i32,
    grating_mean: i32,
    grating_contrast: i32,
    grating_square: i32,
}

pub struct ShaderProgram {
    program: gl::types::GLuint,
    locations: UniformLocations,
}

fn compile_stage(kind: gl::types::GLenum, src: &str) -> Result<gl::types::GLuint> {
    unsafe {
        let shader = gl::CreateShader(kind);
        let c_src = CString::new(src).expect("shader source has no interior nul");
        gl::ShaderSource(shader, 1, &c_src.as_ptr(), std::ptr::null());
        gl::CompileShader(shader);
        let mut ok = gl::FALSE as gl::types::GLint;
        gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut ok);
        if ok != gl::TRUE as gl::types::GLint {
            let mut len = 0;
            gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len);
            let mut buf = vec![0u8; len.max(1) as usize];
            gl::GetShaderInfoLog(shader, len, std::ptr::null_mut(), buf.as_mut_ptr() as *mut _);
            gl::DeleteShader(shader);
            return Err(GfxError::ShaderCompile(String::from_utf8_lossy(&buf).into_owned()));
        }
        Ok(shader)
    }
}

fn uniform_location(program: gl::types::GLuint, name: &str) -> i32 {
    let c_name = CString::new(name).unwrap();
    unsafe { gl::GetUniformLocation(program, c_name.as_ptr()) }
}

impl ShaderProgram {
    pub fn compile() -> Result<Self> {
        unsafe {
            let vertex = compile_stage(gl::VERTEX_SHADER, VERTEX_SRC)?;
            let fragment = compile_stage(gl::FRAGMENT_SHADER, FRAGMENT_SRC)?;
            let program = gl::CreateProgram();
            gl::AttachShader(program, vertex);
            gl::AttachShader(program, fragment);
            gl::LinkProgram(program);
            gl::DeleteShader(vertex);
            gl::DeleteShader(fragment);

            let mut ok = gl::FALSE as gl::types::GLint;
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut ok);
            if ok != gl::TRUE as gl::types::GLint {
                let mut len = 0;
                gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len);
                let mut buf = vec![0u8; len.max(1) as usize];
                gl::GetProgramInfoLog(program, len, std::ptr::null_mut(), buf.as_mut_ptr() as *mut _);
                return Err(GfxError::ShaderLink(String::from_utf8_lossy(&buf).into_owned()));
            }

            let locations = UniformLocations {
                model_to_clip: uniform_location(program, "uModelToClip"),
                color: uniform_location(program, "uColor"),
                special: uniform_location(program, "uSpecial"),
                n_gratings: uniform_location(program, "uNGratings"),
                grating_center_px: uniform_location(program, "uGratingCenterPx"),
                grating_period_px: uniform_location(program, "uGratingPeriodPx"),
                grating_phase_deg: uniform_location(program, "uGratingPhaseDeg"),
                grating_mean: uniform_location(program, "uGratingMean"),
                grating_contrast: uniform_location(program, "uGratingContrast"),
                grating_square: uniform_location(program, "uGratingSquare"),
            };

            Ok(ShaderProgram { program, locations })
        }
    }

    pub fn use_program(&self) {
        unsafe { gl::UseProgram(self.program) }
    }

    pub fn apply(&self, u: &Uniforms) {
        unsafe {
            gl::UniformMatrix4fv(self.locations.model_to_clip, 1, gl::FALSE, u.model_to_clip.as_ptr());
            gl::Uniform3fv(self.locations.color, 1, u.color.as_ptr());
            gl::Uniform1i(self.locations.special, u.special as i32);
            gl::Uniform1i(self.locations.n_gratings, u.n_gratings as i32);

            let centers: Vec<f32> = u.gratings.iter().flat_map(|g| g.center_px).collect();
            let periods: Vec<f32> = u.gratings.iter().flat_map(|g| g.period_px).collect();
            let phases: Vec<f32> = u.gratings.iter().map(|g| g.phase_deg).collect();
            let means: Vec<f32> = u.gratings.iter().flat_map(|g| g.mean).collect();
            let contrasts: Vec<f32> = u.gratings.iter().flat_map(|g| g.contrast).collect();
            let squares: Vec<i32> = u.gratings.iter().map(|g| g.square_wave as i32).collect();

            gl::Uniform2fv(self.locations.grating_center_px, 2, centers.as_ptr());
            gl::Uniform2fv(self.locations.grating_period_px, 2, periods.as_ptr());
            gl::Uniform1fv(self.locations.grating_phase_deg, 2, phases.as_ptr());
            gl::Uniform3fv(self.locations.grating_mean, 2, means.as_ptr());
            gl::Uniform3fv(self.locations.grating_contrast, 2, contrasts.as_ptr());
            gl::Uniform1iv(self.locations.grating_square, 2, squares.as_ptr());
        }
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        unsafe { gl::DeleteProgram(self.program) }
    }
}
