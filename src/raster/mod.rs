pub mod encoder;
pub mod jpeg;
pub mod png;
pub mod transform;

use thiserror::Error;

use crate::pipeline::capability::PageGeometry;

/// Compressed image container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// An encoded page image, ready to be embedded into the output document.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    /// Pixel dimensions of the encoded raster.
    pub width: u32,
    pub height: u32,
    /// 1 (gray) or 3 (RGB).
    pub channels: u8,
    /// Original page box the image must fill.
    pub geometry: PageGeometry,
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("image dimensions {width}x{height} exceed encoder limits")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("JPEG encoder: {0}")]
    Jpeg(#[from] jpeg_encoder::EncodingError),

    #[error("PNG encoder: {0}")]
    Png(#[from] ::png::EncodingError),
}
