// Phase 8: 画像ファイル群 -> 1画像1ページのPDF

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage};

use crate::error::PdfCompressError;
use crate::pdf::writer::ImagePageWriter;
use crate::pipeline::capability::PageGeometry;

/// 解像度情報を持たない画像のページ寸法換算に使うDPI。
pub const DEFAULT_IMAGE_DPI: f32 = 96.0;

/// 画像ファイルを順に1ページずつ並べたPDFを `output` に書き出す。
///
/// 戻り値はページ数。
pub fn images_to_pdf(inputs: &[PathBuf], output: &Path) -> crate::error::Result<usize> {
    if inputs.is_empty() {
        return Err(PdfCompressError::image_convert("No valid images provided"));
    }

    let mut writer = ImagePageWriter::new();
    for path in inputs {
        let bytes = std::fs::read(path).map_err(|e| {
            PdfCompressError::image_convert(format!("{}: {e}", path.display()))
        })?;
        add_image_page(&mut writer, &bytes).map_err(|e| match e {
            PdfCompressError::ImageConvertError(msg) => {
                PdfCompressError::image_convert(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
    }

    let pages = writer.page_count();
    let pdf = writer.finish()?;
    crate::pdf::writer::write_output(output, &pdf)?;
    Ok(pages)
}

/// 画像1枚をページとして追加する。
///
/// グレー/RGBのJPEGは再エンコードせずそのまま埋め込む。
/// それ以外は画素をデコードし、アルファやパレットは白背景に合成して
/// 可逆のFlateDecodeで格納する。
pub fn add_image_page(writer: &mut ImagePageWriter, bytes: &[u8]) -> crate::error::Result<()> {
    let format = image::guess_format(bytes)?;

    if format == image::ImageFormat::Jpeg
        && let Some(frame) = jpeg_frame_info(bytes)
        && matches!(frame.components, 1 | 3)
    {
        let id = writer.add_jpeg_xobject(bytes, frame.width, frame.height, frame.components);
        writer.add_image_page(id, page_geometry(frame.width, frame.height))?;
        return Ok(());
    }

    let img = image::load_from_memory_with_format(bytes, format)?;
    let (width, height) = (img.width(), img.height());
    let (raw, channels) = match flatten(&img) {
        Flattened::Gray(gray) => (gray.into_raw(), 1),
        Flattened::Rgb(rgb) => (rgb.into_raw(), 3),
    };
    let deflated = flate_encode(&raw)?;
    let id = writer.add_flate_xobject(deflated, width, height, channels);
    writer.add_image_page(id, page_geometry(width, height))?;
    Ok(())
}

/// ピクセル寸法を既定DPIでpointに換算する。
pub fn page_geometry(width: u32, height: u32) -> PageGeometry {
    let scale = 72.0 / DEFAULT_IMAGE_DPI;
    PageGeometry::new(width as f32 * scale, height as f32 * scale)
}

enum Flattened {
    Gray(GrayImage),
    Rgb(RgbImage),
}

/// アルファ付き画像を白背景に合成し、不透明なグレー/RGBにする。
fn flatten(img: &DynamicImage) -> Flattened {
    let color = img.color();
    if !color.has_alpha() {
        return if color.has_color() {
            Flattened::Rgb(img.to_rgb8())
        } else {
            Flattened::Gray(img.to_luma8())
        };
    }

    let rgba = img.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in rgb.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        let blend = |c: u8| -> u8 {
            ((u16::from(c) * u16::from(a) + 255 * (255 - u16::from(a)) + 127) / 255) as u8
        };
        dst.0 = [blend(r), blend(g), blend(b)];
    }
    Flattened::Rgb(rgb)
}

/// JPEGのSOFセグメントから読み取った情報。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegFrame {
    pub width: u32,
    pub height: u32,
    pub components: u8,
}

/// JPEGのマーカーを走査してSOFの寸法と成分数を返す。
pub fn jpeg_frame_info(data: &[u8]) -> Option<JpegFrame> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // フィルバイト
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let len = usize::from(u16::from_be_bytes([data[pos + 2], data[pos + 3]]));
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let seg = data.get(pos + 4..pos + 2 + len)?;
            if seg.len() < 6 {
                return None;
            }
            return Some(JpegFrame {
                height: u32::from(u16::from_be_bytes([seg[1], seg[2]])),
                width: u32::from(u16::from_be_bytes([seg[3], seg[4]])),
                components: seg[5],
            });
        }
        if marker == 0xDA || len < 2 {
            return None;
        }
        pos += 2 + len;
    }
    None
}

/// zlibで圧縮
fn flate_encode(data: &[u8]) -> crate::error::Result<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PdfCompressError::image_convert(format!("Flate encode error: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| PdfCompressError::image_convert(format!("Flate encode error: {}", e)))
}
