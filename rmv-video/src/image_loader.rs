//! Still-image loading for the `Image` target variant: JPEG/PNG/BMP/PSD/GIF
//! decoded to 8-bit RGBA via the `image` crate (not ffmpeg's job).

use std::path::Path;

use crate::error::{Result, VideoError};

pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

pub fn load_image(path: &Path) -> Result<DecodedImage> {
    let img = image::open(path).map_err(|_| VideoError::UnsupportedImage(path.to_path_buf()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage { width, height, rgba8: rgba.into_raw() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported_as_unsupported() {
        let err = load_image(Path::new("/nonexistent/does-not-exist.png")).unwrap_err();
        assert!(matches!(err, VideoError::UnsupportedImage(_)));
    }
}
