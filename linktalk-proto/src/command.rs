//! Commands the renderer accepts over the link. Tag values are this
//! crate's own wire convention, stable within this crate and documented
//! here rather than scattered across call sites.

use std::io::{Read, Write};

use crate::error::{ProtoError, Result};
use crate::target::{MotionVector, TargetDefinition};
use crate::wire::{WordReader, WordWriter};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GetVersion,
    ShuttingDown,
    GetAllVideoModes,
    GetCurrentVideoMode,
    SetCurrentVideoMode { index: u32 },
    GetGamma,
    /// Gamma channels as milli-units (value × 1000), per .
    SetGamma { r_milli: u32, g_milli: u32, b_milli: u32 },
    SetSyncFlash { size_mm: f32, duration_frames: u32 },
    SetBackgroundColor { packed_rgb: u32 },
    SetGeometry { width_mm: f32, height_mm: f32, distance_mm: f32 },
    GetMediaDirs,
    GetMediaFiles { folder: String },
    GetMediaInfo { folder: String, file: String },
    DeleteMedia { folder: String, file: Option<String> },
    PutFile { folder: String, file: String, size_bytes: u32 },
    PutFileChunk { data: Vec<u8> },
    PutFileDone,
    LoadTargets { definitions: Vec<TargetDefinition> },
    StartAnimate { frame0: Vec<MotionVector>, frame1: Vec<MotionVector> },
    UpdateFrame { vectors: Vec<MotionVector> },
    StopAnimate,
    Restart,
    Exit,
}

mod tag {
    pub const GET_VERSION: u32 = 0;
    pub const SHUTTING_DOWN: u32 = 1;
    pub const GET_ALL_VIDEO_MODES: u32 = 2;
    pub const GET_CURRENT_VIDEO_MODE: u32 = 3;
    pub const SET_CURRENT_VIDEO_MODE: u32 = 4;
    pub const GET_GAMMA: u32 = 5;
    pub const SET_GAMMA: u32 = 6;
    pub const SET_SYNC_FLASH: u32 = 7;
    pub const SET_BACKGROUND_COLOR: u32 = 8;
    pub const SET_GEOMETRY: u32 = 9;
    pub const GET_MEDIA_DIRS: u32 = 10;
    pub const GET_MEDIA_FILES: u32 = 11;
    pub const GET_MEDIA_INFO: u32 = 12;
    pub const DELETE_MEDIA: u32 = 13;
    pub const PUT_FILE: u32 = 14;
    pub const PUT_FILE_CHUNK: u32 = 15;
    pub const PUT_FILE_DONE: u32 = 16;
    pub const LOAD_TARGETS: u32 = 17;
    pub const START_ANIMATE: u32 = 18;
    pub const UPDATE_FRAME: u32 = 19;
    pub const STOP_ANIMATE: u32 = 20;
    pub const RESTART: u32 = 21;
    pub const EXIT: u32 = 22;
}

impl Command {
    /// The name used in state-gating error messages, matching the wire
    /// protocol's own command names.
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetVersion => "get-version",
            Command::ShuttingDown => "shutting-down",
            Command::GetAllVideoModes => "get-all-video-modes",
            Command::GetCurrentVideoMode => "get-current-video-mode",
            Command::SetCurrentVideoMode { .. } => "set-current-video-mode",
            Command::GetGamma => "get-gamma",
            Command::SetGamma { .. } => "set-gamma",
            Command::SetSyncFlash { .. } => "set-sync-flash",
            Command::SetBackgroundColor { .. } => "set-background-color",
            Command::SetGeometry { .. } => "set-geometry",
            Command::GetMediaDirs => "get-media-dirs",
            Command::GetMediaFiles { .. } => "get-media-files",
            Command::GetMediaInfo { .. } => "get-media-info",
            Command::DeleteMedia { .. } => "delete-media",
            Command::PutFile { .. } => "put-file",
            Command::PutFileChunk { .. } => "put-file-chunk",
            Command::PutFileDone => "put-file-done",
            Command::LoadTargets { .. } => "load-targets",
            Command::StartAnimate { .. } => "start-animate",
            Command::UpdateFrame { .. } => "update-frame",
            Command::StopAnimate => "stop-animate",
            Command::Restart => "restart",
            Command::Exit => "exit",
        }
    }

    /// Whether this command is accepted outside an animation sequence.
    pub fn valid_outside_animation(&self) -> bool {
        !matches!(
            self,
            Command::UpdateFrame { .. } | Command::StopAnimate
        )
    }

    /// Whether this command is accepted while an animation sequence is
    /// running.
    pub fn valid_during_animation(&self) -> bool {
        matches!(
            self,
            Command::UpdateFrame { .. }
                | Command::StopAnimate
                | Command::ShuttingDown
                | Command::Exit
        )
    }

    pub fn encode<W: Write>(&self, w: &mut WordWriter<W>) -> Result<()> {
        match self {
            Command::GetVersion => w.write_u32(tag::GET_VERSION),
            Command::ShuttingDown => w.write_u32(tag::SHUTTING_DOWN),
            Command::GetAllVideoModes => w.write_u32(tag::GET_ALL_VIDEO_MODES),
            Command::GetCurrentVideoMode => w.write_u32(tag::GET_CURRENT_VIDEO_MODE),
            Command::SetCurrentVideoMode { index } => {
                w.write_u32(tag::SET_CURRENT_VIDEO_MODE)?;
                w.write_u32(*index)
            }
            Command::GetGamma => w.write_u32(tag::GET_GAMMA),
            Command::SetGamma { r_milli, g_milli, b_milli } => {
                w.write_u32(tag::SET_GAMMA)?;
                w.write_u32(*r_milli)?;
                w.write_u32(*g_milli)?;
                w.write_u32(*b_milli)
            }
            Command::SetSyncFlash { size_mm, duration_frames } => {
                w.write_u32(tag::SET_SYNC_FLASH)?;
                w.write_f32(*size_mm)?;
                w.write_u32(*duration_frames)
            }
            Command::SetBackgroundColor { packed_rgb } => {
                w.write_u32(tag::SET_BACKGROUND_COLOR)?;
                w.write_u32(*packed_rgb)
            }
            Command::SetGeometry { width_mm, height_mm, distance_mm } => {
                w.write_u32(tag::SET_GEOMETRY)?;
                w.write_f32(*width_mm)?;
                w.write_f32(*height_mm)?;
                w.write_f32(*distance_mm)
            }
            Command::GetMediaDirs => w.write_u32(tag::GET_MEDIA_DIRS),
            Command::GetMediaFiles { folder } => {
                w.write_u32(tag::GET_MEDIA_FILES)?;
                w.write_string(folder)
            }
            Command::GetMediaInfo { folder, file } => {
                w.write_u32(tag::GET_MEDIA_INFO)?;
                w.write_string(folder)?;
                w.write_string(file)
            }
            Command::DeleteMedia { folder, file } => {
                w.write_u32(tag::DELETE_MEDIA)?;
                w.write_string(folder)?;
                w.write_u32(file.is_some() as u32)?;
                if let Some(file) = file {
                    w.write_string(file)?;
                }
                Ok(())
            }
            Command::PutFile { folder, file, size_bytes } => {
                w.write_u32(tag::PUT_FILE)?;
                w.write_string(folder)?;
                w.write_string(file)?;
                w.write_u32(*size_bytes)
            }
            Command::PutFileChunk { data } => {
                w.write_u32(tag::PUT_FILE_CHUNK)?;
                w.write_bytes(data)
            }
            Command::PutFileDone => w.write_u32(tag::PUT_FILE_DONE),
            Command::LoadTargets { definitions } => {
                w.write_u32(tag::LOAD_TARGETS)?;
                w.write_u32(definitions.len() as u32)?;
                for def in definitions {
                    def.encode(w)?;
                }
                Ok(())
            }
            Command::StartAnimate { frame0, frame1 } => {
                w.write_u32(tag::START_ANIMATE)?;
                w.write_u32(frame0.len() as u32)?;
                for v in frame0 {
                    v.encode(w)?;
                }
                for v in frame1 {
                    v.encode(w)?;
                }
                Ok(())
            }
            Command::UpdateFrame { vectors } => {
                w.write_u32(tag::UPDATE_FRAME)?;
                w.write_u32(vectors.len() as u32)?;
                for v in vectors {
                    v.encode(w)?;
                }
                Ok(())
            }
            Command::StopAnimate => w.write_u32(tag::STOP_ANIMATE),
            Command::Restart => w.write_u32(tag::RESTART),
            Command::Exit => w.write_u32(tag::EXIT),
        }
    }

    pub fn decode<R: Read>(r: &mut WordReader<R>) -> Result<Self> {
        let t = r.read_u32()?;
        Ok(match t {
            tag::GET_VERSION => Command::GetVersion,
            tag::SHUTTING_DOWN => Command::ShuttingDown,
            tag::GET_ALL_VIDEO_MODES => Command::GetAllVideoModes,
            tag::GET_CURRENT_VIDEO_MODE => Command::GetCurrentVideoMode,
            tag::SET_CURRENT_VIDEO_MODE => Command::SetCurrentVideoMode { index: r.read_u32()? },
            tag::GET_GAMMA => Command::GetGamma,
            tag::SET_GAMMA => Command::SetGamma {
                r_milli: r.read_u32()?,
                g_milli: r.read_u32()?,
                b_milli: r.read_u32()?,
            },
            tag::SET_SYNC_FLASH => Command::SetSyncFlash {
                size_mm: r.read_f32()?,
                duration_frames: r.read_u32()?,
            },
            tag::SET_BACKGROUND_COLOR => Command::SetBackgroundColor { packed_rgb: r.read_u32()? },
            tag::SET_GEOMETRY => Command::SetGeometry {
                width_mm: r.read_f32()?,
                height_mm: r.read_f32()?,
                distance_mm: r.read_f32()?,
            },
            tag::GET_MEDIA_DIRS => Command::GetMediaDirs,
            tag::GET_MEDIA_FILES => Command::GetMediaFiles { folder: r.read_string()? },
            tag::GET_MEDIA_INFO => Command::GetMediaInfo {
                folder: r.read_string()?,
                file: r.read_string()?,
            },
            tag::DELETE_MEDIA => {
                let folder = r.read_string()?;
                let has_file = r.read_u32()? != 0;
                let file = if has_file { Some(r.read_string()?) } else { None };
                Command::DeleteMedia { folder, file }
            }
            tag::PUT_FILE => Command::PutFile {
                folder: r.read_string()?,
                file: r.read_string()?,
                size_bytes: r.read_u32()?,
            },
            tag::PUT_FILE_CHUNK => Command::PutFileChunk { data: r.read_bytes()? },
            tag::PUT_FILE_DONE => Command::PutFileDone,
            tag::LOAD_TARGETS => {
                let n = r.read_u32()?;
                let definitions = (0..n).map(|_| TargetDefinition::decode(r)).collect::<Result<_>>()?;
                Command::LoadTargets { definitions }
            }
            tag::START_ANIMATE => {
                let n = r.read_u32()?;
                let frame0 = (0..n).map(|_| MotionVector::decode(r)).collect::<Result<_>>()?;
                let frame1 = (0..n).map(|_| MotionVector::decode(r)).collect::<Result<_>>()?;
                Command::StartAnimate { frame0, frame1 }
            }
            tag::UPDATE_FRAME => {
                let n = r.read_u32()?;
                let vectors = (0..n).map(|_| MotionVector::decode(r)).collect::<Result<_>>()?;
                Command::UpdateFrame { vectors }
            }
            tag::STOP_ANIMATE => Command::StopAnimate,
            tag::RESTART => Command::Restart,
            tag::EXIT => Command::Exit,
            other => return Err(ProtoError::UnknownTag(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(cmd: &Command) -> Command {
        let mut buf = Vec::new();
        cmd.encode(&mut WordWriter::new(&mut buf)).unwrap();
        Command::decode(&mut WordReader::new(buf.as_slice())).unwrap()
    }

    #[test]
    fn simple_commands_round_trip() {
        assert_eq!(round_trip(&Command::GetVersion), Command::GetVersion);
        assert_eq!(round_trip(&Command::StopAnimate), Command::StopAnimate);
        assert_eq!(
            round_trip(&Command::SetGeometry { width_mm: 340.0, height_mm: 270.0, distance_mm: 300.0 }),
            Command::SetGeometry { width_mm: 340.0, height_mm: 270.0, distance_mm: 300.0 }
        );
    }

    #[test]
    fn delete_media_without_file_round_trips() {
        let cmd = Command::DeleteMedia { folder: "clips".into(), file: None };
        assert_eq!(round_trip(&cmd), cmd);
    }

    #[test]
    fn state_gating_matches_spec_table() {
        assert!(Command::LoadTargets { definitions: vec![] }.valid_outside_animation());
        assert!(!Command::LoadTargets { definitions: vec![] }.valid_during_animation());
        assert!(Command::UpdateFrame { vectors: vec![] }.valid_during_animation());
        assert!(!Command::UpdateFrame { vectors: vec![] }.valid_outside_animation());
        assert!(Command::ShuttingDown.valid_during_animation());
        assert!(Command::Exit.valid_during_animation());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut buf = Vec::new();
        WordWriter::new(&mut buf).write_u32(9999).unwrap();
        let err = Command::decode(&mut WordReader::new(buf.as_slice())).unwrap_err();
        assert!(matches!(err, ProtoError::UnknownTag(9999)));
    }
}
