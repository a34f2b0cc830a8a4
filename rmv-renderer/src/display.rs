//! Display/context manager: enumerates RandR video modes,
//! creates a borderless fullscreen GL 3.3+ context with VSync, and measures
//! the true refresh period over 500 swaps before animation is permitted.

use std::ffi::CString;
use std::num::NonZeroU32;

use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, NotCurrentGlContext, PossiblyCurrentContext, Version};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasRawWindowHandle;
use winit::event_loop::EventLoop;
use winit::window::{Fullscreen, Window, WindowBuilder};

use linktalk_proto::VideoMode;
use rmv_math::{measure_period, DisplayGeometry, MeasuredPeriod};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("no suitable fullscreen video mode at or above 1024x768@60Hz")]
    NoAcceptableMode,
    #[error("failed to create an OpenGL context/surface: {0}")]
    Context(String),
    #[error("OpenGL version {0}.{1} is below the required 3.3")]
    GlVersionTooLow(u8, u8),
    #[error(transparent)]
    Period(#[from] rmv_math::PeriodError),
    #[error("video mode index {0} is out of range")]
    ModeIndexOutOfRange(u32),
}

pub type Result<T> = std::result::Result<T, DisplayError>;

/// A monitor video mode filtered to the renderer's minimum requirement:
/// at or above 1024x768 @ 60 Hz.
pub const MIN_WIDTH_PX: u32 = 1024;
pub const MIN_HEIGHT_PX: u32 = 768;
pub const MIN_REFRESH_MHZ: u32 = 60_000;

pub struct Display {
    event_loop: Option<EventLoop<()>>,
    window: Window,
    gl_surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    pub geometry: DisplayGeometry,
    pub period: MeasuredPeriod,
    modes: Vec<winit::monitor::VideoMode>,
    current_mode_index: usize,
    gamma_milli: (u32, u32, u32),
    background_rgb: (f32, f32, f32),
}

fn acceptable_mode(mode: &winit::monitor::VideoMode) -> bool {
    mode.size().width >= MIN_WIDTH_PX
        && mode.size().height >= MIN_HEIGHT_PX
        && mode.refresh_rate_millihertz() >= MIN_REFRESH_MHZ
}

impl Display {
    /// Opens the fullscreen context and runs the 500-swap period
    /// measurement. `width_mm`/`height_mm`/`distance_mm` seed the initial
    /// [`DisplayGeometry`]; `set-geometry` can update it later.
    pub fn open(width_mm: f64, height_mm: f64, distance_mm: f64, requested_stereo: bool) -> Result<Self> {
        let event_loop = EventLoop::new().expect("create winit event loop");

        let monitor = event_loop
            .available_monitors()
            .next()
            .expect("at least one monitor");
        let modes: Vec<winit::monitor::VideoMode> = monitor.video_modes().filter(acceptable_mode).collect();
        let mode = modes.first().cloned().ok_or(DisplayError::NoAcceptableMode)?;

        // Stereo visual negotiation is GLX-specific (GLX_STEREO) and not
        // exposed by glutin's portable config template; we request the
        // plain double-buffered RGBA8 config and log when stereo was asked
        // for but can't be honored this way.
        if requested_stereo {
            log::warn!("stereo visual requested but not negotiable through the portable GL config path; falling back to mono");
        }

        let window_builder = WindowBuilder::new()
            .with_title("rmv-renderer")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
            .with_decorations(false);

        let template = ConfigTemplateBuilder::new().with_alpha_size(8).with_transparency(false);

        let (window, gl_config) = DisplayBuilder::new()
            .with_window_builder(Some(window_builder))
            .build(&event_loop, template, |configs| {
                configs
                    .reduce(|accum, cfg| if cfg.num_samples() > accum.num_samples() { cfg } else { accum })
                    .expect("at least one GL config")
            })
            .map_err(|e| DisplayError::Context(e.to_string()))?;
        let window = window.expect("a window was requested");
        window.set_cursor_visible(false);

        let raw_window_handle = Some(window.raw_window_handle());
        let gl_display = gl_config.display();

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(raw_window_handle);
        let not_current = unsafe {
            gl_display
                .create_context(&gl_config, &context_attributes)
                .map_err(|e| DisplayError::Context(e.to_string()))?
        };

        let (w, h) = (window.inner_size().width.max(1), window.inner_size().height.max(1));
        let surface_attributes = window.build_surface_attributes(SurfaceAttributesBuilder::<WindowSurface>::new());
        let gl_surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &surface_attributes)
                .map_err(|e| DisplayError::Context(e.to_string()))?
        };

        let gl_context = not_current
            .make_current(&gl_surface)
            .map_err(|e| DisplayError::Context(e.to_string()))?;

        gl::load_with(|symbol| {
            let c = CString::new(symbol).unwrap();
            gl_display.get_proc_address(&c).cast()
        });

        gl_surface
            .set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::new(1).unwrap()))
            .map_err(|e| DisplayError::Context(e.to_string()))?;

        verify_gl_version()?;

        let geometry = DisplayGeometry::new(width_mm, height_mm, distance_mm, w, h);
        let nominal_period_s = 1.0 / (mode.refresh_rate_millihertz() as f64 / 1000.0);
        let period = measure_refresh_period(&gl_surface, &gl_context, nominal_period_s)?;

        Ok(Display {
            event_loop: Some(event_loop),
            window,
            gl_surface,
            gl_context,
            geometry,
            period,
            modes,
            current_mode_index: 0,
            gamma_milli: (1000, 1000, 1000),
            background_rgb: (0.0, 0.0, 0.0),
        })
    }

    pub fn swap_buffers(&self) -> Result<()> {
        self.gl_surface
            .swap_buffers(&self.gl_context)
            .map_err(|e| DisplayError::Context(e.to_string()))
    }

    /// The monitor's modes at or above the renderer's minimum requirement,
    /// in the wire protocol's `VideoMode` shape, for `get-all-video-modes`.
    pub fn video_modes(&self) -> Vec<VideoMode> {
        self.modes
            .iter()
            .map(|m| VideoMode {
                width_px: m.size().width as u16,
                height_px: m.size().height as u16,
                refresh_millihertz: m.refresh_rate_millihertz(),
            })
            .collect()
    }

    pub fn current_video_mode(&self) -> VideoMode {
        self.video_modes()[self.current_mode_index]
    }

    /// Switches the exclusive-fullscreen video mode for `set-current-video-mode`.
    /// Falls back to keeping the window on its current borderless mode if the
    /// exclusive-fullscreen path is rejected by the window manager; the index
    /// is still recorded so `get-current-video-mode` reflects the request.
    pub fn set_current_video_mode(&mut self, index: u32) -> Result<()> {
        let mode = self.modes.get(index as usize).cloned().ok_or(DisplayError::ModeIndexOutOfRange(index))?;
        self.window.set_fullscreen(Some(Fullscreen::Exclusive(mode)));
        self.current_mode_index = index as usize;
        Ok(())
    }

    pub fn gamma_milli(&self) -> (u32, u32, u32) {
        self.gamma_milli
    }

    /// Records the requested gamma ramp. RandR gamma ramp application is
    /// display-server specific and outside glutin's portable surface API;
    /// this renderer tracks the value for `get-gamma` without yet driving
    /// hardware LUTs.
    pub fn set_gamma(&mut self, r_milli: u32, g_milli: u32, b_milli: u32) {
        self.gamma_milli = (r_milli, g_milli, b_milli);
    }

    pub fn set_geometry(&mut self, width_mm: f64, height_mm: f64, distance_mm: f64) {
        let (w, h) = (self.geometry.width_px, self.geometry.height_px);
        self.geometry = DisplayGeometry::new(width_mm, height_mm, distance_mm, w, h);
    }

    pub fn set_background_color(&mut self, packed_rgb: u32) {
        let r = ((packed_rgb >> 16) & 0xff) as f32 / 255.0;
        let g = ((packed_rgb >> 8) & 0xff) as f32 / 255.0;
        let b = (packed_rgb & 0xff) as f32 / 255.0;
        self.background_rgb = (r, g, b);
        unsafe {
            gl::ClearColor(r, g, b, 1.0);
        }
    }

    /// Drains pending OS events without blocking, so the window stays
    /// responsive even though input is not consumed for anything but the
    /// animation loop's own exit conditions.
    pub fn pump_events(&mut self) {
        use winit::platform::pump_events::EventLoopExtPumpEvents;
        if let Some(event_loop) = &mut self.event_loop {
            let _ = event_loop.pump_app_events(Some(std::time::Duration::ZERO), &mut |_, _| {});
        }
    }
}

fn verify_gl_version() -> Result<()> {
    let version = unsafe { std::ffi::CStr::from_ptr(gl::GetString(gl::VERSION).cast()) };
    let version = version.to_string_lossy();
    let mut parts = version.split('.');
    let major: u8 = parts.next().and_then(|p| p.trim().parse().ok()).unwrap_or(0);
    let minor: u8 = parts
        .next()
        .and_then(|p| p.chars().take_while(|c| c.is_ascii_digit()).collect::<String>().parse().ok())
        .unwrap_or(0);
    if (major, minor) < (3, 3) {
        return Err(DisplayError::GlVersionTooLow(major, minor));
    }
    Ok(())
}

/// Measures the refresh period over 500 swaps, alternating the clear color
/// between red and blue so tearing is visible to the operator.
fn measure_refresh_period(
    surface: &Surface<WindowSurface>,
    context: &PossiblyCurrentContext,
    nominal_period_s: f64,
) -> Result<MeasuredPeriod> {
    const SWAPS: usize = 500;
    let start = std::time::Instant::now();
    let mut last = start;
    let mut deltas = Vec::with_capacity(SWAPS);
    for i in 0..SWAPS {
        let (r, b) = if i % 2 == 0 { (1.0, 0.0) } else { (0.0, 1.0) };
        unsafe {
            gl::ClearColor(r, 0.0, b, 1.0);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }
        surface.swap_buffers(context).map_err(|e| DisplayError::Context(e.to_string()))?;
        let now = std::time::Instant::now();
        deltas.push((now - last).as_secs_f64());
        last = now;
    }
    Ok(measure_period(nominal_period_s, &deltas)?)
}
