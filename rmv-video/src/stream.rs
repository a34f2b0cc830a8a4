//! A single open video/image stream: the decoder, its frame ring, and the
//! playback flags the buffer thread and the target engine coordinate
//! through.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::decoder::FrameDecoder;
use crate::error::Result;
use crate::ring::{DecodedFrame, FrameRing};

pub struct VideoStream {
    decoder: Box<dyn FrameDecoder>,
    ring: Arc<FrameRing>,
    pub pause_when_off: bool,
    pub repeat: bool,
    pub stop_on_eof: bool,
    active: AtomicBool,
    eof_observed: AtomicBool,
    disabled_on_error: AtomicBool,
    frames_decoded: AtomicU32,
}

impl VideoStream {
    pub fn new(
        decoder: Box<dyn FrameDecoder>,
        pause_when_off: bool,
        repeat: bool,
        stop_on_eof: bool,
    ) -> Self {
        VideoStream {
            decoder,
            ring: Arc::new(FrameRing::new()),
            pause_when_off,
            repeat,
            stop_on_eof,
            active: AtomicBool::new(true),
            eof_observed: AtomicBool::new(false),
            disabled_on_error: AtomicBool::new(false),
            frames_decoded: AtomicU32::new(0),
        }
    }

    pub fn ring(&self) -> Arc<FrameRing> {
        self.ring.clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed) && !self.disabled_on_error.load(Ordering::Relaxed)
    }

    /// Target-visible off/on toggle (spec: "pause when off" target flag).
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    pub fn eof_observed(&self) -> bool {
        self.eof_observed.load(Ordering::Relaxed)
    }

    pub fn frames_decoded(&self) -> u32 {
        self.frames_decoded.load(Ordering::Relaxed)
    }

    pub fn disabled_on_error(&self) -> bool {
        self.disabled_on_error.load(Ordering::Relaxed)
    }

    /// Called from the buffer thread: decodes and pushes one frame if there
    /// is ring space and the stream isn't paused, eof'd, or disabled.
    pub fn pump_one_frame(&mut self) {
        if self.disabled_on_error.load(Ordering::Relaxed) {
            return;
        }
        if self.pause_when_off && !self.active.load(Ordering::Relaxed) {
            return;
        }
        if !self.ring.has_free_slot() {
            return;
        }
        match self.decoder.next_frame() {
            Ok(Some(frame)) => {
                self.frames_decoded.fetch_add(1, Ordering::Relaxed);
                self.ring.push(frame);
            }
            Ok(None) => {
                self.eof_observed.store(true, Ordering::Relaxed);
                if self.repeat && !self.stop_on_eof {
                    if self.decoder.rewind().is_err() {
                        self.disabled_on_error.store(true, Ordering::Relaxed);
                    }
                } else if self.stop_on_eof {
                    self.active.store(false, Ordering::Relaxed);
                }
            }
            Err(_) => {
                self.disabled_on_error.store(true, Ordering::Relaxed);
            }
        }
    }

    pub fn take_next_frame(&self) -> Option<DecodedFrame> {
        let frame = self.ring.peek();
        if frame.is_some() {
            self.ring.advance_to_next();
        }
        frame
    }

    pub fn frame_width(&self) -> u32 {
        self.decoder.frame_width()
    }

    pub fn frame_height(&self) -> u32 {
        self.decoder.frame_height()
    }
}

pub type OpenResult = Result<VideoStream>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::NullDecoder;

    #[test]
    fn pump_stops_at_eof_without_repeat() {
        let mut stream = VideoStream::new(Box::new(NullDecoder::new(2, 2, 2)), false, false, true);
        stream.pump_one_frame();
        stream.pump_one_frame();
        stream.pump_one_frame();
        assert!(stream.eof_observed());
        assert!(!stream.is_active());
    }

    #[test]
    fn repeat_rewinds_after_eof() {
        let mut stream = VideoStream::new(Box::new(NullDecoder::new(2, 2, 1)), false, true, false);
        stream.pump_one_frame();
        stream.pump_one_frame();
        assert!(stream.eof_observed());
        assert!(stream.is_active());
        stream.pump_one_frame();
        assert_eq!(stream.frames_decoded(), 2);
    }

    #[test]
    fn paused_stream_when_pause_when_off_does_not_pump() {
        let mut stream = VideoStream::new(Box::new(NullDecoder::new(2, 2, 5)), true, false, false);
        stream.set_active(false);
        stream.pump_one_frame();
        assert_eq!(stream.frames_decoded(), 0);
    }
}
