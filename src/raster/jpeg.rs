// Phase 4: jpeg-encoder: raster -> progressive JPEG bytes

use image::DynamicImage;
use jpeg_encoder::{ColorType, Encoder};

use super::EncodeError;

/// Encode a raster as a progressive JPEG with optimized Huffman tables.
///
/// `Luma8` rasters are written as single-channel JPEG; everything else is
/// converted to RGB first. The caller is responsible for clamping `quality`.
///
/// # Returns
/// `(bytes, channels)` where `channels` is 1 or 3.
pub fn encode_jpeg(raster: &DynamicImage, quality: u8) -> Result<(Vec<u8>, u8), EncodeError> {
    let (width, height) = (raster.width(), raster.height());
    let (w16, h16) = match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => return Err(EncodeError::DimensionsTooLarge { width, height }),
    };

    let mut buf = Vec::new();
    let mut encoder = Encoder::new(&mut buf, quality);
    encoder.set_progressive(true);
    encoder.set_optimized_huffman_tables(true);

    let channels = match raster {
        DynamicImage::ImageLuma8(gray) => {
            encoder.encode(gray.as_raw(), w16, h16, ColorType::Luma)?;
            1
        }
        DynamicImage::ImageRgb8(rgb) => {
            encoder.encode(rgb.as_raw(), w16, h16, ColorType::Rgb)?;
            3
        }
        other => {
            let rgb = other.to_rgb8();
            encoder.encode(rgb.as_raw(), w16, h16, ColorType::Rgb)?;
            3
        }
    };

    Ok((buf, channels))
}
