//! Video and image decoding, the media store, and the single
//! video-buffering thread for the stimulus renderer.

pub mod buffer_thread;
pub mod decoder;
pub mod error;
pub mod ffmpeg_decoder;
pub mod image_loader;
pub mod media_store;
pub mod ring;
pub mod stream;

pub use buffer_thread::{restrict_main_thread_affinity, VideoBufferThread, MAX_STREAMS};
pub use decoder::{is_video_extension, FrameDecoder, NullDecoder};
pub use error::{Result, VideoError};
pub use ffmpeg_decoder::FfmpegDecoder;
pub use image_loader::{load_image, DecodedImage};
pub use media_store::{validate_name, MediaStore, MAX_NAME_LEN};
pub use ring::{DecodedFrame, FrameRing, RING_SLOTS};
pub use stream::VideoStream;
