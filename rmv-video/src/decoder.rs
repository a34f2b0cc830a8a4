//! Decoder abstraction: [`FrameDecoder`] is implemented once for real video
//! files (`ffmpeg_decoder`) and once as a null double for tests, the same
//! capability-trait shape [`daq_hal`] uses for hardware presence.

use std::path::Path;

use crate::error::Result;
use crate::ring::DecodedFrame;

pub trait FrameDecoder: Send {
    /// Decodes and returns the next frame, or `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>>;

    /// Seeks back to the first frame, for `repeat` playback.
    fn rewind(&mut self) -> Result<()>;

    fn frame_width(&self) -> u32;
    fn frame_height(&self) -> u32;
}

/// A decoder double that yields a fixed count of blank frames, then EOF.
/// Used by buffer-thread and ring tests that don't want a real codec.
pub struct NullDecoder {
    width: u32,
    height: u32,
    total_frames: u32,
    next_index: u32,
}

impl NullDecoder {
    pub fn new(width: u32, height: u32, total_frames: u32) -> Self {
        NullDecoder { width, height, total_frames, next_index: 0 }
    }
}

impl FrameDecoder for NullDecoder {
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>> {
        if self.next_index >= self.total_frames {
            return Ok(None);
        }
        let pts_s = self.next_index as f64 / 60.0;
        self.next_index += 1;
        Ok(Some(DecodedFrame {
            pts_s,
            rgb24: vec![0u8; (self.width * self.height * 3) as usize],
        }))
    }

    fn rewind(&mut self) -> Result<()> {
        self.next_index = 0;
        Ok(())
    }

    fn frame_width(&self) -> u32 {
        self.width
    }

    fn frame_height(&self) -> u32 {
        self.height
    }
}

pub fn is_video_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("mp4" | "mov" | "avi" | "mkv" | "webm")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_decoder_yields_requested_frame_count_then_eof() {
        let mut dec = NullDecoder::new(4, 4, 3);
        assert!(dec.next_frame().unwrap().is_some());
        assert!(dec.next_frame().unwrap().is_some());
        assert!(dec.next_frame().unwrap().is_some());
        assert!(dec.next_frame().unwrap().is_none());
    }

    #[test]
    fn rewind_restarts_frame_sequence() {
        let mut dec = NullDecoder::new(2, 2, 1);
        assert!(dec.next_frame().unwrap().is_some());
        assert!(dec.next_frame().unwrap().is_none());
        dec.rewind().unwrap();
        assert!(dec.next_frame().unwrap().is_some());
    }

    #[test]
    fn extension_sniffing_recognizes_common_containers() {
        assert!(is_video_extension(Path::new("clip.mp4")));
        assert!(is_video_extension(Path::new("clip.MOV")));
        assert!(!is_video_extension(Path::new("frame.png")));
    }
}
