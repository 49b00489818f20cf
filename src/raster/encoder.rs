// Phase 4: 色モードによる形式選択: モノクロ → PNG, それ以外 → JPEG

use image::DynamicImage;

use super::{EncodedImage, ImageFormat, jpeg, png};
use crate::config::compression::{ColorMode, CompressionConfig};
use crate::error::PdfCompressError;
use crate::pipeline::capability::PageGeometry;

/// 色モードから出力形式を決める。
pub fn format_for(mode: ColorMode) -> ImageFormat {
    match mode {
        ColorMode::Monochrome => ImageFormat::Png,
        ColorMode::NoChange | ColorMode::Grayscale => ImageFormat::Jpeg,
    }
}

/// 変換済みラスタをエンコードする。
///
/// JPEG品質は `min(image_quality, 50)` に切り詰める。
/// 失敗は `EncodeFailed { page }` になる。
pub fn encode(
    page_index: u32,
    raster: &DynamicImage,
    geometry: PageGeometry,
    config: &CompressionConfig,
) -> crate::error::Result<EncodedImage> {
    let (width, height) = (raster.width(), raster.height());

    let (data, format, channels) = match format_for(config.color_mode) {
        ImageFormat::Png => {
            let gray = raster.to_luma8();
            let data = png::encode_bilevel_png(&gray)
                .map_err(|e| PdfCompressError::encode(page_index, e))?;
            (data, ImageFormat::Png, 1)
        }
        ImageFormat::Jpeg => {
            let (data, channels) = jpeg::encode_jpeg(raster, config.jpeg_quality())
                .map_err(|e| PdfCompressError::encode(page_index, e))?;
            (data, ImageFormat::Jpeg, channels)
        }
    };

    Ok(EncodedImage {
        data,
        format,
        width,
        height,
        channels,
        geometry,
    })
}
