// Phase 6: ページ単位処理: ラスタ → 縮小・色削減 → エンコード

use image::DynamicImage;

use crate::config::compression::CompressionConfig;
use crate::pipeline::capability::PageGeometry;
use crate::raster::{EncodedImage, encoder, transform};

/// レンダリング済みの1ページ。
pub struct RenderedPage {
    pub page_index: u32,
    pub geometry: PageGeometry,
    pub raster: DynamicImage,
}

/// Process a single rendered page: transform -> encode.
///
/// Has no shared state, so independent pages may run on any thread.
/// The raster is consumed and dropped once encoded.
pub fn process_page(
    page: RenderedPage,
    config: &CompressionConfig,
) -> crate::error::Result<EncodedImage> {
    let RenderedPage {
        page_index,
        geometry,
        raster,
    } = page;

    let reduced = transform::transform(raster, config.color_mode);
    let encoded = encoder::encode(page_index, &reduced, geometry, config)?;

    tracing::debug!(
        page = page_index,
        width = encoded.width,
        height = encoded.height,
        format = ?encoded.format,
        bytes = encoded.data.len(),
        "page encoded"
    );

    Ok(encoded)
}
