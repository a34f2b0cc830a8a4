//! `ffmpeg-next`-backed [`FrameDecoder`] for real movie files.

use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{context::Context as ScalingContext, flag::Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;

use crate::decoder::FrameDecoder;
use crate::error::{Result, VideoError};
use crate::ring::DecodedFrame;

pub struct FfmpegDecoder {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::decoder::Video,
    scaler: ScalingContext,
    width: u32,
    height: u32,
    time_base: f64,
}

impl FfmpegDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        ffmpeg::init().map_err(|e| VideoError::Decode(e.to_string()))?;

        let input = ffmpeg::format::input(&path).map_err(|e| VideoError::Decode(e.to_string()))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| VideoError::Decode("no video stream".to_string()))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let time_base = time_base.numerator() as f64 / time_base.denominator() as f64;

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| VideoError::Decode(e.to_string()))?;
        let decoder = context.decoder().video().map_err(|e| VideoError::Decode(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            Flags::BILINEAR,
        )
        .map_err(|e| VideoError::Decode(e.to_string()))?;

        Ok(FfmpegDecoder { input, stream_index, decoder, scaler, width, height, time_base })
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>> {
        loop {
            let packet = match self.input.packets().find(|(s, _)| s.index() == self.stream_index) {
                Some((_, packet)) => packet,
                None => return Ok(None),
            };

            self.decoder
                .send_packet(&packet)
                .map_err(|e| VideoError::Decode(e.to_string()))?;

            let mut decoded = VideoFrame::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb = VideoFrame::empty();
                self.scaler
                    .run(&decoded, &mut rgb)
                    .map_err(|e| VideoError::Decode(e.to_string()))?;

                let pts_s = decoded.pts().unwrap_or(0) as f64 * self.time_base;
                let stride = rgb.stride(0);
                let row_bytes = (self.width * 3) as usize;
                let mut rgb24 = Vec::with_capacity(row_bytes * self.height as usize);
                let data = rgb.data(0);
                for row in 0..self.height as usize {
                    let start = row * stride;
                    rgb24.extend_from_slice(&data[start..start + row_bytes]);
                }
                return Ok(Some(DecodedFrame { pts_s, rgb24 }));
            }
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.input
            .seek(0, ..0)
            .map_err(|e| VideoError::Decode(e.to_string()))?;
        self.decoder.flush();
        Ok(())
    }

    fn frame_width(&self) -> u32 {
        self.width
    }

    fn frame_height(&self) -> u32 {
        self.height
    }
}
