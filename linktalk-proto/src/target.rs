//! Target definitions and per-frame motion vectors carried by `load-targets`,
//! `start-animate`, and `update-frame`.

use crate::error::{ProtoError, Result};
use crate::wire::{WordReader, WordWriter};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ApertureKind {
    Rect = 0,
    Oval = 1,
    RectAnnulus = 2,
    OvalAnnulus = 3,
}

impl ApertureKind {
    fn from_u32(v: u32) -> Result<Self> {
        Ok(match v {
            0 => ApertureKind::Rect,
            1 => ApertureKind::Oval,
            2 => ApertureKind::RectAnnulus,
            3 => ApertureKind::OvalAnnulus,
            other => return Err(ProtoError::UnknownTag(other)),
        })
    }
}

/// Flicker timing shared by every variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flicker {
    pub on_frames: u16,
    pub off_frames: u16,
    pub initial_delay_frames: u16,
}

/// Fields specific to one target variant. Dot-based and grating-family
/// fields are grouped so a definition can carry only what its variant uses;
/// the encoding still writes a fixed-size record per variant so decoding
/// never has to guess a length.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetVariant {
    Point,
    Bar { width_deg: f32, height_deg: f32, drift_axis_deg: f32 },
    Spot,
    Grating {
        spatial_freq_cyc_per_deg: [f32; 2],
        orientation_deg: [f32; 2],
        orient_adjust: bool,
        unified_plaid: bool,
        square_wave: bool,
    },
    Plaid {
        spatial_freq_cyc_per_deg: [f32; 2],
        orientation_deg: [f32; 2],
        orient_adjust: bool,
        unified_plaid: bool,
        square_wave: bool,
    },
    RandomDotPatch {
        dot_count: u16,
        dot_size_pixels: u8,
        percent_coherent: u8,
        noise_interval_ms: u16,
        direction_noise_limit_deg: f32,
        speed_noise_log2_limit: f32,
        finite_lifetime_ms: Option<u16>,
        two_color_contrast: bool,
        dot_disparity_deg: f32,
    },
    OpticalFlowField {
        dot_count: u16,
        inner_radius_deg: f32,
        outer_radius_deg: f32,
        dot_disparity_deg: f32,
    },
    Image { folder: String, file: String },
    Movie {
        folder: String,
        file: String,
        at_display_rate: bool,
        pause_when_off: bool,
        repeat: bool,
        stop_on_eof: bool,
    },
}

impl TargetVariant {
    fn tag(&self) -> u32 {
        match self {
            TargetVariant::Point => 0,
            TargetVariant::Bar { .. } => 1,
            TargetVariant::Spot => 2,
            TargetVariant::Grating { .. } => 3,
            TargetVariant::Plaid { .. } => 4,
            TargetVariant::RandomDotPatch { .. } => 5,
            TargetVariant::OpticalFlowField { .. } => 6,
            TargetVariant::Image { .. } => 7,
            TargetVariant::Movie { .. } => 8,
        }
    }

    fn encode<W: Write>(&self, w: &mut WordWriter<W>) -> Result<()> {
        w.write_u32(self.tag())?;
        match self {
            TargetVariant::Point | TargetVariant::Spot => {}
            TargetVariant::Bar { width_deg, height_deg, drift_axis_deg } => {
                w.write_f32(*width_deg)?;
                w.write_f32(*height_deg)?;
                w.write_f32(*drift_axis_deg)?;
            }
            TargetVariant::Grating {
                spatial_freq_cyc_per_deg,
                orientation_deg,
                orient_adjust,
                unified_plaid,
                square_wave,
            }
            | TargetVariant::Plaid {
                spatial_freq_cyc_per_deg,
                orientation_deg,
                orient_adjust,
                unified_plaid,
                square_wave,
            } => {
                w.write_f32(spatial_freq_cyc_per_deg[0])?;
                w.write_f32(spatial_freq_cyc_per_deg[1])?;
                w.write_f32(orientation_deg[0])?;
                w.write_f32(orientation_deg[1])?;
                w.write_u32(*orient_adjust as u32)?;
                w.write_u32(*unified_plaid as u32)?;
                w.write_u32(*square_wave as u32)?;
            }
            TargetVariant::RandomDotPatch {
                dot_count,
                dot_size_pixels,
                percent_coherent,
                noise_interval_ms,
                direction_noise_limit_deg,
                speed_noise_log2_limit,
                finite_lifetime_ms,
                two_color_contrast,
                dot_disparity_deg,
            } => {
                w.write_u32(*dot_count as u32)?;
                w.write_u32(*dot_size_pixels as u32)?;
                w.write_u32(*percent_coherent as u32)?;
                w.write_u32(*noise_interval_ms as u32)?;
                w.write_f32(*direction_noise_limit_deg)?;
                w.write_f32(*speed_noise_log2_limit)?;
                w.write_u32(finite_lifetime_ms.unwrap_or(0) as u32)?;
                w.write_u32(*two_color_contrast as u32)?;
                w.write_f32(*dot_disparity_deg)?;
            }
            TargetVariant::OpticalFlowField {
                dot_count,
                inner_radius_deg,
                outer_radius_deg,
                dot_disparity_deg,
            } => {
                w.write_u32(*dot_count as u32)?;
                w.write_f32(*inner_radius_deg)?;
                w.write_f32(*outer_radius_deg)?;
                w.write_f32(*dot_disparity_deg)?;
            }
            TargetVariant::Image { folder, file } => {
                w.write_string(folder)?;
                w.write_string(file)?;
            }
            TargetVariant::Movie {
                folder,
                file,
                at_display_rate,
                pause_when_off,
                repeat,
                stop_on_eof,
            } => {
                w.write_string(folder)?;
                w.write_string(file)?;
                w.write_u32(*at_display_rate as u32)?;
                w.write_u32(*pause_when_off as u32)?;
                w.write_u32(*repeat as u32)?;
                w.write_u32(*stop_on_eof as u32)?;
            }
        }
        Ok(())
    }

    fn decode<R: Read>(r: &mut WordReader<R>) -> Result<Self> {
        let tag = r.read_u32()?;
        Ok(match tag {
            0 => TargetVariant::Point,
            1 => TargetVariant::Bar {
                width_deg: r.read_f32()?,
                height_deg: r.read_f32()?,
                drift_axis_deg: r.read_f32()?,
            },
            2 => TargetVariant::Spot,
            3 | 4 => {
                let spatial_freq_cyc_per_deg = [r.read_f32()?, r.read_f32()?];
                let orientation_deg = [r.read_f32()?, r.read_f32()?];
                let orient_adjust = r.read_u32()? != 0;
                let unified_plaid = r.read_u32()? != 0;
                let square_wave = r.read_u32()? != 0;
                let fields = (spatial_freq_cyc_per_deg, orientation_deg, orient_adjust, unified_plaid, square_wave);
                if tag == 3 {
                    TargetVariant::Grating {
                        spatial_freq_cyc_per_deg: fields.0,
                        orientation_deg: fields.1,
                        orient_adjust: fields.2,
                        unified_plaid: fields.3,
                        square_wave: fields.4,
                    }
                } else {
                    TargetVariant::Plaid {
                        spatial_freq_cyc_per_deg: fields.0,
                        orientation_deg: fields.1,
                        orient_adjust: fields.2,
                        unified_plaid: fields.3,
                        square_wave: fields.4,
                    }
                }
            }
            5 => {
                let dot_count = r.read_u32()? as u16;
                let dot_size_pixels = r.read_u32()? as u8;
                let percent_coherent = r.read_u32()? as u8;
                let noise_interval_ms = r.read_u32()? as u16;
                let direction_noise_limit_deg = r.read_f32()?;
                let speed_noise_log2_limit = r.read_f32()?;
                let finite_lifetime_raw = r.read_u32()? as u16;
                let two_color_contrast = r.read_u32()? != 0;
                let dot_disparity_deg = r.read_f32()?;
                TargetVariant::RandomDotPatch {
                    dot_count,
                    dot_size_pixels,
                    percent_coherent,
                    noise_interval_ms,
                    direction_noise_limit_deg,
                    speed_noise_log2_limit,
                    finite_lifetime_ms: if finite_lifetime_raw == 0 { None } else { Some(finite_lifetime_raw) },
                    two_color_contrast,
                    dot_disparity_deg,
                }
            }
            6 => TargetVariant::OpticalFlowField {
                dot_count: r.read_u32()? as u16,
                inner_radius_deg: r.read_f32()?,
                outer_radius_deg: r.read_f32()?,
                dot_disparity_deg: r.read_f32()?,
            },
            7 => TargetVariant::Image {
                folder: r.read_string()?,
                file: r.read_string()?,
            },
            8 => TargetVariant::Movie {
                folder: r.read_string()?,
                file: r.read_string()?,
                at_display_rate: r.read_u32()? != 0,
                pause_when_off: r.read_u32()? != 0,
                repeat: r.read_u32()? != 0,
                stop_on_eof: r.read_u32()? != 0,
            },
            other => return Err(ProtoError::UnknownTag(other)),
        })
    }
}

/// A target definition: aperture geometry, color/contrast, flicker
/// timing, and the variant-specific payload above.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDefinition {
    pub aperture: ApertureKind,
    pub outer_width_deg: f32,
    pub outer_height_deg: f32,
    pub inner_width_deg: f32,
    pub inner_height_deg: f32,
    pub blur_sigma_x_deg: f32,
    pub blur_sigma_y_deg: f32,
    pub mean_rgb: [u8; 3],
    pub contrast_rgb: [f32; 3],
    pub flicker: Flicker,
    pub variant: TargetVariant,
}

impl TargetDefinition {
    pub fn encode<W: Write>(&self, w: &mut WordWriter<W>) -> Result<()> {
        w.write_u32(self.aperture as u32)?;
        w.write_f32(self.outer_width_deg)?;
        w.write_f32(self.outer_height_deg)?;
        w.write_f32(self.inner_width_deg)?;
        w.write_f32(self.inner_height_deg)?;
        w.write_f32(self.blur_sigma_x_deg)?;
        w.write_f32(self.blur_sigma_y_deg)?;
        for c in self.mean_rgb {
            w.write_u32(c as u32)?;
        }
        for c in self.contrast_rgb {
            w.write_f32(c)?;
        }
        w.write_u32(self.flicker.on_frames as u32)?;
        w.write_u32(self.flicker.off_frames as u32)?;
        w.write_u32(self.flicker.initial_delay_frames as u32)?;
        self.variant.encode(w)
    }

    pub fn decode<R: Read>(r: &mut WordReader<R>) -> Result<Self> {
        let aperture = ApertureKind::from_u32(r.read_u32()?)?;
        let outer_width_deg = r.read_f32()?;
        let outer_height_deg = r.read_f32()?;
        let inner_width_deg = r.read_f32()?;
        let inner_height_deg = r.read_f32()?;
        let blur_sigma_x_deg = r.read_f32()?;
        let blur_sigma_y_deg = r.read_f32()?;
        let mean_rgb = [r.read_u32()? as u8, r.read_u32()? as u8, r.read_u32()? as u8];
        let contrast_rgb = [r.read_f32()?, r.read_f32()?, r.read_f32()?];
        let flicker = Flicker {
            on_frames: r.read_u32()? as u16,
            off_frames: r.read_u32()? as u16,
            initial_delay_frames: r.read_u32()? as u16,
        };
        let variant = TargetVariant::decode(r)?;
        Ok(TargetDefinition {
            aperture,
            outer_width_deg,
            outer_height_deg,
            inner_width_deg,
            inner_height_deg,
            blur_sigma_x_deg,
            blur_sigma_y_deg,
            mean_rgb,
            contrast_rgb,
            flicker,
            variant,
        })
    }
}

/// One frame's worth of motion for a single target: a 2-D displacement in
/// visual degrees (pattern motion) plus, for dot-based and grating/plaid
/// variants, an independent window-motion component.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionVector {
    pub pattern_dx_deg: f32,
    pub pattern_dy_deg: f32,
    pub window_dx_deg: f32,
    pub window_dy_deg: f32,
    /// Set for targets on this frame (flicker on-state gating applies on
    /// top of this).
    pub on: bool,
}

impl MotionVector {
    pub fn encode<W: Write>(&self, w: &mut WordWriter<W>) -> Result<()> {
        w.write_f32(self.pattern_dx_deg)?;
        w.write_f32(self.pattern_dy_deg)?;
        w.write_f32(self.window_dx_deg)?;
        w.write_f32(self.window_dy_deg)?;
        w.write_u32(self.on as u32)
    }

    pub fn decode<R: Read>(r: &mut WordReader<R>) -> Result<Self> {
        Ok(MotionVector {
            pattern_dx_deg: r.read_f32()?,
            pattern_dy_deg: r.read_f32()?,
            window_dx_deg: r.read_f32()?,
            window_dy_deg: r.read_f32()?,
            on: r.read_u32()? != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(def: &TargetDefinition) -> TargetDefinition {
        let mut buf = Vec::new();
        def.encode(&mut WordWriter::new(&mut buf)).unwrap();
        TargetDefinition::decode(&mut WordReader::new(buf.as_slice())).unwrap()
    }

    #[test]
    fn point_target_round_trips() {
        let def = TargetDefinition {
            aperture: ApertureKind::Oval,
            outer_width_deg: 4.0,
            outer_height_deg: 4.0,
            inner_width_deg: 0.0,
            inner_height_deg: 0.0,
            blur_sigma_x_deg: 0.1,
            blur_sigma_y_deg: 0.1,
            mean_rgb: [128, 64, 200],
            contrast_rgb: [1.0, 1.0, 1.0],
            flicker: Flicker { on_frames: 3, off_frames: 5, initial_delay_frames: 10 },
            variant: TargetVariant::Point,
        };
        assert_eq!(round_trip(&def), def);
    }

    #[test]
    fn movie_target_round_trips_with_strings() {
        let def = TargetDefinition {
            aperture: ApertureKind::Rect,
            outer_width_deg: 10.0,
            outer_height_deg: 8.0,
            inner_width_deg: 0.0,
            inner_height_deg: 0.0,
            blur_sigma_x_deg: 0.0,
            blur_sigma_y_deg: 0.0,
            mean_rgb: [0, 0, 0],
            contrast_rgb: [0.0, 0.0, 0.0],
            flicker: Flicker { on_frames: 0, off_frames: 0, initial_delay_frames: 0 },
            variant: TargetVariant::Movie {
                folder: "clips".into(),
                file: "chamber.mp4".into(),
                at_display_rate: false,
                pause_when_off: true,
                repeat: true,
                stop_on_eof: false,
            },
        };
        assert_eq!(round_trip(&def), def);
    }

    #[test]
    fn motion_vector_round_trips() {
        let v = MotionVector {
            pattern_dx_deg: 1.5,
            pattern_dy_deg: -2.25,
            window_dx_deg: 0.0,
            window_dy_deg: 0.0,
            on: true,
        };
        let mut buf = Vec::new();
        v.encode(&mut WordWriter::new(&mut buf)).unwrap();
        let decoded = MotionVector::decode(&mut WordReader::new(buf.as_slice())).unwrap();
        assert_eq!(decoded, v);
    }
}
