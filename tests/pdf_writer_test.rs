// Phase 5: 画像ページPDF構築テスト

use lopdf::Object;

use pdf_compress::config::compression::ColorMode;
use pdf_compress::error::PdfCompressError;
use pdf_compress::pdf::reader::PdfReader;
use pdf_compress::pdf::writer::{ImagePageWriter, write_output};
use pdf_compress::pipeline::capability::{DocumentSink, PageGeometry};
use pdf_compress::raster::png::encode_bilevel_png;
use pdf_compress::raster::transform::threshold;
use pdf_compress::raster::{EncodedImage, ImageFormat};

fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([200, 100, 50]),
    ));
    let (data, _) =
        pdf_compress::raster::jpeg::encode_jpeg(&img, 40).expect("jpeg encode should succeed");
    data
}

fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let gray = image::GrayImage::from_fn(width, height, |x, _| image::Luma([(x * 40) as u8]));
    encode_bilevel_png(&threshold(&gray)).expect("png encode should succeed")
}

fn jpeg_page(geometry: PageGeometry) -> EncodedImage {
    EncodedImage {
        data: sample_jpeg(20, 10),
        format: ImageFormat::Jpeg,
        width: 20,
        height: 10,
        channels: 3,
        geometry,
    }
}

/// 指定ページ(1-indexed)の唯一の画像XObjectを返す。
fn only_image(pdf: &[u8], page_num: u32) -> lopdf::Stream {
    let reader = PdfReader::open_mem(pdf).expect("output should parse");
    let mut images = reader.page_images(page_num).expect("page images");
    assert_eq!(images.len(), 1, "page should hold exactly one image");
    images.remove(0).1
}

// ============================================================
// 1. コンテンツストリーム
// ============================================================

#[test]
fn test_build_page_content_stream() {
    let bytes =
        ImagePageWriter::build_page_content_stream("Im0", PageGeometry::new(612.0, 792.0));
    let content = String::from_utf8(bytes).expect("valid UTF-8");
    assert_eq!(content, "q 612 0 0 792 0 0 cm /Im0 Do Q");
}

#[test]
fn test_build_page_content_stream_fractional_size() {
    let bytes =
        ImagePageWriter::build_page_content_stream("Im0", PageGeometry::new(595.5, 842.25));
    let content = String::from_utf8(bytes).expect("valid UTF-8");
    assert!(content.contains("595.5 0 0 842.25"), "got: {content}");
}

// ============================================================
// 2. ページ組立
// ============================================================

#[test]
fn test_pages_keep_order_and_geometry() {
    let geometries = [
        PageGeometry::new(612.0, 792.0),
        PageGeometry::new(842.0, 595.0),
        PageGeometry::new(100.5, 200.25),
    ];
    let mut writer = ImagePageWriter::new();
    for geometry in geometries {
        writer.add_page(&jpeg_page(geometry)).expect("add page");
    }
    assert_eq!(DocumentSink::page_count(&writer), 3);

    let bytes = writer.finalize().expect("finalize");
    let reader = PdfReader::open_mem(&bytes).expect("output should parse");
    assert_eq!(reader.page_count(), 3);
    assert_eq!(
        reader.page_geometries().expect("geometries"),
        geometries.to_vec()
    );
}

#[test]
fn test_jpeg_page_uses_dct_decode() {
    let mut writer = ImagePageWriter::new();
    writer
        .add_page(&jpeg_page(PageGeometry::new(612.0, 792.0)))
        .expect("add page");
    let bytes = writer.finalize().expect("finalize");
    let image = only_image(&bytes, 1);
    assert_eq!(
        image.dict.get(b"Filter").and_then(Object::as_name).ok(),
        Some(&b"DCTDecode"[..])
    );
    assert_eq!(
        image.dict.get(b"ColorSpace").and_then(Object::as_name).ok(),
        Some(&b"DeviceRGB"[..])
    );
    assert_eq!(image.dict.get(b"Width").and_then(Object::as_i64).ok(), Some(20));
    assert_eq!(image.dict.get(b"Height").and_then(Object::as_i64).ok(), Some(10));
}

#[test]
fn test_png_page_uses_flate_with_predictor() {
    let png = sample_png(13, 7);
    let mut writer = ImagePageWriter::new();
    writer
        .add_page(&EncodedImage {
            data: png,
            format: ImageFormat::Png,
            width: 13,
            height: 7,
            channels: 1,
            geometry: PageGeometry::new(612.0, 792.0),
        })
        .expect("add page");
    let bytes = writer.finalize().expect("finalize");
    let image = only_image(&bytes, 1);
    assert_eq!(
        image.dict.get(b"Filter").and_then(Object::as_name).ok(),
        Some(&b"FlateDecode"[..])
    );
    assert_eq!(
        image.dict.get(b"ColorSpace").and_then(Object::as_name).ok(),
        Some(&b"DeviceGray"[..])
    );
    assert_eq!(
        image.dict.get(b"BitsPerComponent").and_then(Object::as_i64).ok(),
        Some(1)
    );

    let parms = image
        .dict
        .get(b"DecodeParms")
        .and_then(Object::as_dict)
        .expect("DecodeParms should be present");
    assert_eq!(parms.get(b"Predictor").and_then(Object::as_i64).ok(), Some(15));
    assert_eq!(parms.get(b"Colors").and_then(Object::as_i64).ok(), Some(1));
    assert_eq!(parms.get(b"Columns").and_then(Object::as_i64).ok(), Some(13));
}

#[test]
fn test_invalid_png_rejected() {
    let mut writer = ImagePageWriter::new();
    let result = writer.add_png_xobject(b"not a png at all");
    assert!(
        matches!(result, Err(PdfCompressError::WriteFailed(_))),
        "got: {result:?}"
    );
}

#[test]
fn test_invalid_geometry_rejected() {
    let mut writer = ImagePageWriter::new();
    let result = writer.add_page(&jpeg_page(PageGeometry::new(0.0, 792.0)));
    assert!(
        matches!(result, Err(PdfCompressError::WriteFailed(_))),
        "got: {result:?}"
    );
}

#[test]
fn test_monochrome_mode_format_is_png() {
    assert_eq!(
        pdf_compress::raster::encoder::format_for(ColorMode::Monochrome),
        ImageFormat::Png
    );
    assert_eq!(
        pdf_compress::raster::encoder::format_for(ColorMode::Grayscale),
        ImageFormat::Jpeg
    );
}

// ============================================================
// 3. 原子的書き出し
// ============================================================

#[test]
fn test_write_output_replaces_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("out.pdf");
    std::fs::write(&path, b"old").expect("seed file");

    write_output(&path, b"new contents").expect("write should succeed");
    assert_eq!(std::fs::read(&path).expect("read back"), b"new contents");

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .expect("list dir")
        .filter_map(Result::ok)
        .filter(|e| e.path() != path)
        .collect();
    assert!(leftovers.is_empty(), "temp file should be gone");
}

#[test]
fn test_write_output_missing_directory_fails() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("no/such/dir/out.pdf");
    let result = write_output(&path, b"data");
    assert!(
        matches!(result, Err(PdfCompressError::WriteFailed(_))),
        "got: {result:?}"
    );
    assert!(!path.exists());
}
