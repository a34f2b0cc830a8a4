//! Signals the renderer may return: `idle`, `cmd-ack` (carrying
//! a reply payload for the `get-*` commands), `cmd-error`, `bye`,
//! `animate-message`, and `quitting`.

use std::io::{Read, Write};

use crate::error::{ProtoError, Result};
use crate::video_mode::VideoMode;
use crate::wire::{WordReader, WordWriter};

#[derive(Debug, Clone, PartialEq)]
pub enum AckPayload {
    None,
    Version { major: u32, minor: u32 },
    VideoModes(Vec<VideoMode>),
    CurrentVideoMode(VideoMode),
    Gamma { r_milli: u32, g_milli: u32, b_milli: u32 },
    MediaDirs(Vec<String>),
    MediaFiles(Vec<String>),
    MediaInfo { width_px: u32, height_px: u32, is_video: bool, frame_count: Option<u32> },
}

mod ack_tag {
    pub const NONE: u32 = 0;
    pub const VERSION: u32 = 1;
    pub const VIDEO_MODES: u32 = 2;
    pub const CURRENT_VIDEO_MODE: u32 = 3;
    pub const GAMMA: u32 = 4;
    pub const MEDIA_DIRS: u32 = 5;
    pub const MEDIA_FILES: u32 = 6;
    pub const MEDIA_INFO: u32 = 7;
}

impl AckPayload {
    fn encode<W: Write>(&self, w: &mut WordWriter<W>) -> Result<()> {
        match self {
            AckPayload::None => w.write_u32(ack_tag::NONE),
            AckPayload::Version { major, minor } => {
                w.write_u32(ack_tag::VERSION)?;
                w.write_u32(*major)?;
                w.write_u32(*minor)
            }
            AckPayload::VideoModes(modes) => {
                w.write_u32(ack_tag::VIDEO_MODES)?;
                w.write_u32(modes.len() as u32)?;
                for m in modes {
                    m.encode(w)?;
                }
                Ok(())
            }
            AckPayload::CurrentVideoMode(mode) => {
                w.write_u32(ack_tag::CURRENT_VIDEO_MODE)?;
                mode.encode(w)
            }
            AckPayload::Gamma { r_milli, g_milli, b_milli } => {
                w.write_u32(ack_tag::GAMMA)?;
                w.write_u32(*r_milli)?;
                w.write_u32(*g_milli)?;
                w.write_u32(*b_milli)
            }
            AckPayload::MediaDirs(dirs) => {
                w.write_u32(ack_tag::MEDIA_DIRS)?;
                w.write_u32(dirs.len() as u32)?;
                for d in dirs {
                    w.write_string(d)?;
                }
                Ok(())
            }
            AckPayload::MediaFiles(files) => {
                w.write_u32(ack_tag::MEDIA_FILES)?;
                w.write_u32(files.len() as u32)?;
                for f in files {
                    w.write_string(f)?;
                }
                Ok(())
            }
            AckPayload::MediaInfo { width_px, height_px, is_video, frame_count } => {
                w.write_u32(ack_tag::MEDIA_INFO)?;
                w.write_u32(*width_px)?;
                w.write_u32(*height_px)?;
                w.write_u32(*is_video as u32)?;
                w.write_u32(frame_count.unwrap_or(0))
            }
        }
    }

    fn decode<R: Read>(r: &mut WordReader<R>) -> Result<Self> {
        let t = r.read_u32()?;
        Ok(match t {
            ack_tag::NONE => AckPayload::None,
            ack_tag::VERSION => AckPayload::Version { major: r.read_u32()?, minor: r.read_u32()? },
            ack_tag::VIDEO_MODES => {
                let n = r.read_u32()?;
                let modes = (0..n).map(|_| VideoMode::decode(r)).collect::<Result<_>>()?;
                AckPayload::VideoModes(modes)
            }
            ack_tag::CURRENT_VIDEO_MODE => AckPayload::CurrentVideoMode(VideoMode::decode(r)?),
            ack_tag::GAMMA => AckPayload::Gamma {
                r_milli: r.read_u32()?,
                g_milli: r.read_u32()?,
                b_milli: r.read_u32()?,
            },
            ack_tag::MEDIA_DIRS => {
                let n = r.read_u32()?;
                let dirs = (0..n).map(|_| r.read_string()).collect::<Result<_>>()?;
                AckPayload::MediaDirs(dirs)
            }
            ack_tag::MEDIA_FILES => {
                let n = r.read_u32()?;
                let files = (0..n).map(|_| r.read_string()).collect::<Result<_>>()?;
                AckPayload::MediaFiles(files)
            }
            ack_tag::MEDIA_INFO => {
                let width_px = r.read_u32()?;
                let height_px = r.read_u32()?;
                let is_video = r.read_u32()? != 0;
                let frame_count_raw = r.read_u32()?;
                AckPayload::MediaInfo {
                    width_px,
                    height_px,
                    is_video,
                    frame_count: if frame_count_raw == 0 { None } else { Some(frame_count_raw) },
                }
            }
            other => return Err(ProtoError::UnknownTag(other)),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Idle,
    CmdAck(AckPayload),
    CmdError(String),
    Bye,
    /// `{frameIndex[,skipCount]}`: present `skip_count` reports a detected
    /// stall of that many periods; absent it is the once-per-second
    /// heartbeat or the end-of-iteration duplicate-frame report with a
    /// skip count of zero.
    AnimateMessage { frame_index: u32, skip_count: Option<u32> },
    Quitting,
}

mod tag {
    pub const IDLE: u32 = 0;
    pub const CMD_ACK: u32 = 1;
    pub const CMD_ERROR: u32 = 2;
    pub const BYE: u32 = 3;
    pub const ANIMATE_MESSAGE: u32 = 4;
    pub const QUITTING: u32 = 5;
}

impl Signal {
    pub fn encode<W: Write>(&self, w: &mut WordWriter<W>) -> Result<()> {
        match self {
            Signal::Idle => w.write_u32(tag::IDLE),
            Signal::CmdAck(payload) => {
                w.write_u32(tag::CMD_ACK)?;
                payload.encode(w)
            }
            Signal::CmdError(message) => {
                w.write_u32(tag::CMD_ERROR)?;
                w.write_string(message)
            }
            Signal::Bye => w.write_u32(tag::BYE),
            Signal::AnimateMessage { frame_index, skip_count } => {
                w.write_u32(tag::ANIMATE_MESSAGE)?;
                w.write_u32(*frame_index)?;
                w.write_u32(skip_count.is_some() as u32)?;
                if let Some(skip_count) = skip_count {
                    w.write_u32(*skip_count)?;
                }
                Ok(())
            }
            Signal::Quitting => w.write_u32(tag::QUITTING),
        }
    }

    pub fn decode<R: Read>(r: &mut WordReader<R>) -> Result<Self> {
        let t = r.read_u32()?;
        Ok(match t {
            tag::IDLE => Signal::Idle,
            tag::CMD_ACK => Signal::CmdAck(AckPayload::decode(r)?),
            tag::CMD_ERROR => Signal::CmdError(r.read_string()?),
            tag::BYE => Signal::Bye,
            tag::ANIMATE_MESSAGE => {
                let frame_index = r.read_u32()?;
                let has_skip = r.read_u32()? != 0;
                let skip_count = if has_skip { Some(r.read_u32()?) } else { None };
                Signal::AnimateMessage { frame_index, skip_count }
            }
            tag::QUITTING => Signal::Quitting,
            other => return Err(ProtoError::UnknownTag(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(sig: &Signal) -> Signal {
        let mut buf = Vec::new();
        sig.encode(&mut WordWriter::new(&mut buf)).unwrap();
        Signal::decode(&mut WordReader::new(buf.as_slice())).unwrap()
    }

    #[test]
    fn duplicate_frame_signal_round_trips() {
        let sig = Signal::AnimateMessage { frame_index: 103, skip_count: Some(3) };
        assert_eq!(round_trip(&sig), sig);
    }

    #[test]
    fn heartbeat_without_skip_count_round_trips() {
        let sig = Signal::AnimateMessage { frame_index: 42, skip_count: None };
        assert_eq!(round_trip(&sig), sig);
    }

    #[test]
    fn media_files_ack_round_trips() {
        let sig = Signal::CmdAck(AckPayload::MediaFiles(vec!["a.png".into(), "b.mp4".into()]));
        assert_eq!(round_trip(&sig), sig);
    }

    #[test]
    fn cmd_error_carries_message() {
        let sig = Signal::CmdError("unknown media file".into());
        assert_eq!(round_trip(&sig), sig);
    }
}
