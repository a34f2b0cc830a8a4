//! A single RandR video mode, as reported by `get-all-video-modes` and
//! `get-current-video-mode`.

use crate::error::Result;
use crate::wire::{WordReader, WordWriter};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMode {
    pub width_px: u16,
    pub height_px: u16,
    pub refresh_millihertz: u32,
}

impl VideoMode {
    pub fn encode<W: Write>(&self, w: &mut WordWriter<W>) -> Result<()> {
        w.write_u32(self.width_px as u32)?;
        w.write_u32(self.height_px as u32)?;
        w.write_u32(self.refresh_millihertz)
    }

    pub fn decode<R: Read>(r: &mut WordReader<R>) -> Result<Self> {
        Ok(VideoMode {
            width_px: r.read_u32()? as u16,
            height_px: r.read_u32()? as u16,
            refresh_millihertz: r.read_u32()?,
        })
    }
}
