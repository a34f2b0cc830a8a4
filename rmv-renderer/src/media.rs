//! Media command handling for `get-media-dirs`/`get-media-files`/
//! `get-media-info`/`delete-media`/`put-file*`: wraps [`rmv_video::MediaStore`]
//! and the chunked file upload it doesn't itself model.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use linktalk_proto::{AckPayload, Signal};
use rmv_video::{is_video_extension, load_image, FfmpegDecoder, FrameDecoder, MediaStore};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaCmdError {
    #[error(transparent)]
    Video(#[from] rmv_video::VideoError),
    #[error("no put-file upload is in progress")]
    NoUploadInProgress,
    #[error("upload received {received} bytes, expected {expected}")]
    SizeMismatch { received: u32, expected: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MediaCmdError>;

/// State for one in-flight chunked upload across `put-file` /
/// `put-file-chunk` / `put-file-done`.
struct PendingUpload {
    folder: String,
    file: String,
    expected_bytes: u32,
    buffer: Vec<u8>,
}

pub struct MediaHandler {
    store: MediaStore,
    pending: Option<PendingUpload>,
}

impl MediaHandler {
    pub fn new(store: MediaStore) -> Self {
        MediaHandler { store, pending: None }
    }

    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    pub fn get_media_dirs(&self) -> Result<Signal> {
        Ok(Signal::CmdAck(AckPayload::MediaDirs(self.store.list_folders()?)))
    }

    pub fn get_media_files(&self, folder: &str) -> Result<Signal> {
        Ok(Signal::CmdAck(AckPayload::MediaFiles(self.store.list_files(folder)?)))
    }

    pub fn get_media_info(&self, folder: &str, file: &str) -> Result<Signal> {
        let path = self.store.file_path(folder, file)?;
        let is_video = is_video_extension(&path);
        let (width_px, height_px, frame_count) = if is_video {
            let decoder = FfmpegDecoder::open(&path)?;
            (decoder.frame_width(), decoder.frame_height(), None)
        } else {
            let img = load_image(&path)?;
            (img.width, img.height, None)
        };
        Ok(Signal::CmdAck(AckPayload::MediaInfo { width_px, height_px, is_video, frame_count }))
    }

    pub fn delete_media(&self, folder: &str, file: Option<&str>) -> Result<Signal> {
        match file {
            Some(file) => self.store.delete_file(folder, file)?,
            None => self.store.delete_folder(folder)?,
        }
        Ok(Signal::CmdAck(AckPayload::None))
    }

    pub fn begin_put_file(&mut self, folder: String, file: String, size_bytes: u32) -> Result<Signal> {
        rmv_video::validate_name(&folder)?;
        rmv_video::validate_name(&file)?;
        self.pending = Some(PendingUpload { folder, file, expected_bytes: size_bytes, buffer: Vec::new() });
        Ok(Signal::CmdAck(AckPayload::None))
    }

    pub fn put_file_chunk(&mut self, data: Vec<u8>) -> Result<Signal> {
        let pending = self.pending.as_mut().ok_or(MediaCmdError::NoUploadInProgress)?;
        pending.buffer.extend_from_slice(&data);
        Ok(Signal::CmdAck(AckPayload::None))
    }

    pub fn finish_put_file(&mut self) -> Result<Signal> {
        let pending = self.pending.take().ok_or(MediaCmdError::NoUploadInProgress)?;
        if pending.buffer.len() as u32 != pending.expected_bytes {
            return Err(MediaCmdError::SizeMismatch {
                received: pending.buffer.len() as u32,
                expected: pending.expected_bytes,
            });
        }
        let folder_path: PathBuf = self.store.folder_path(&pending.folder)?;
        fs::create_dir_all(&folder_path)?;
        let file_path = self.store.file_path(&pending.folder, &pending.file)?;
        let mut out = fs::File::create(file_path)?;
        out.write_all(&pending.buffer)?;
        Ok(Signal::CmdAck(AckPayload::None))
    }
}
