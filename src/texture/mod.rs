//! Texture decoding abstractions.
//!
//! The load pipeline hands a cached tile image file to a [`TextureDecoder`]
//! and receives back a [`TileImage`], the displayable RGBA surface the
//! scene constructs its drawable from. The trait keeps the `image` crate at
//! the edge so tests can substitute a mock decoder.

use std::path::Path;

use thiserror::Error;

/// Errors that can occur while decoding a tile image.
#[derive(Debug, Error)]
pub enum TextureError {
    /// The image file could not be read.
    #[error("failed to read image file: {0}")]
    Io(#[from] std::io::Error),

    /// The image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Decoded image has unusable dimensions.
    #[error("decoded image has invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// A decoded tile image in straight RGBA8 layout, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TileImage {
    /// Wraps raw RGBA8 pixel data.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the pixel buffer does not match the
    /// dimensions.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consumes the image, returning the pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Decodes a tile image file into a displayable surface.
///
/// Implementations must be cheap to share (`Arc<dyn TextureDecoder>`) and
/// safe to call from worker threads; decoding is CPU-bound and runs on the
/// blocking pool.
pub trait TextureDecoder: Send + Sync + 'static {
    /// Decodes the image at `path` into an RGBA surface.
    fn decode(&self, path: &Path) -> Result<TileImage, TextureError>;
}

/// Decoder backed by the `image` crate.
///
/// Handles every raster format the basemap providers serve (PNG, JPEG,
/// WebP) through format auto-detection.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileDecoder;

impl ImageFileDecoder {
    /// Creates a new decoder.
    pub fn new() -> Self {
        Self
    }
}

impl TextureDecoder for ImageFileDecoder {
    fn decode(&self, path: &Path) -> Result<TileImage, TextureError> {
        let decoded = image::open(path).map_err(|err| match err {
            image::ImageError::IoError(io) => TextureError::Io(io),
            other => TextureError::Decode(other),
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        if width == 0 || height == 0 {
            return Err(TextureError::InvalidDimensions { width, height });
        }

        Ok(TileImage::from_rgba8(width, height, rgba.into_raw()))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::io::Write;

    /// Returns the bytes of a valid 2x2 PNG for cache/decode tests.
    pub fn tiny_png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .expect("encoding a 2x2 PNG cannot fail");
        bytes
    }

    #[test]
    fn test_decode_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        std::fs::write(&path, tiny_png_bytes()).unwrap();

        let image = ImageFileDecoder::new().decode(&path).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 2);
        assert_eq!(image.pixels().len(), 2 * 2 * 4);
        assert_eq!(&image.pixels()[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_garbage_bytes_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"not an image at all").unwrap();

        let result = ImageFileDecoder::new().decode(&path);
        assert!(matches!(result, Err(TextureError::Decode(_))));
    }

    #[test]
    fn test_decode_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageFileDecoder::new().decode(&dir.path().join("absent.png"));
        assert!(matches!(result, Err(TextureError::Io(_))));
    }

    #[test]
    fn test_tile_image_accessors() {
        let image = TileImage::from_rgba8(1, 2, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(image.width(), 1);
        assert_eq!(image.height(), 2);
        assert_eq!(image.into_pixels(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
