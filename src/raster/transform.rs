// Phase 3: ラスタ変換: 0.7倍縮小 → 色モード削減

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

use crate::config::compression::{ColorMode, MONOCHROME_THRESHOLD, scaled_dimension};

/// 縮小後の寸法 `(width, height)` を返す。各辺は1以上。
pub fn scaled_dimensions(width: u32, height: u32) -> (u32, u32) {
    (scaled_dimension(width), scaled_dimension(height))
}

/// Lanczos3で固定倍率縮小する。
pub fn scale_down(raster: &DynamicImage) -> DynamicImage {
    let (width, height) = scaled_dimensions(raster.width(), raster.height());
    raster.resize_exact(width, height, FilterType::Lanczos3)
}

/// 輝度画像を白(255)/黒(0)に二値化する。
pub fn threshold(gray: &GrayImage) -> GrayImage {
    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] >= MONOCHROME_THRESHOLD {
            255
        } else {
            0
        };
    }
    out
}

/// 色モードに応じてチャンネルを削減する。
///
/// モノクロは必ずグレースケールを経由する。
pub fn reduce_color(raster: DynamicImage, mode: ColorMode) -> DynamicImage {
    match mode {
        ColorMode::NoChange => DynamicImage::ImageRgb8(raster.into_rgb8()),
        ColorMode::Grayscale => DynamicImage::ImageLuma8(raster.into_luma8()),
        ColorMode::Monochrome => {
            let gray = raster.into_luma8();
            DynamicImage::ImageLuma8(threshold(&gray))
        }
    }
}

/// 縮小と色削減をまとめて適用する。
pub fn transform(raster: DynamicImage, mode: ColorMode) -> DynamicImage {
    let scaled = scale_down(&raster);
    drop(raster);
    reduce_color(scaled, mode)
}
