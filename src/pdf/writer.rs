// Phase 5: 画像XObject構築、1画像1ページの組立、確定と原子的書き出し

use std::io::Write;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::error::PdfCompressError;
use crate::pipeline::capability::{DocumentSink, PageGeometry};
use crate::raster::{EncodedImage, ImageFormat};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// ページ内で画像XObjectを参照する名前。
const IMAGE_NAME: &str = "Im0";

/// 画像1枚をページ全面に描くページを追記していくPDFライター。
///
/// ページは追加順に並ぶ。[`finish`](Self::finish) は `self` を消費するため
/// 確定は1回しか起こらない。
pub struct ImagePageWriter {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

/// PNGから取り出したIDATデータとヘッダ情報。
#[derive(Debug)]
pub struct PngStream {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub colors: u8,
    pub idat: Vec<u8>,
}

impl Default for ImagePageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePageWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// JPEG XObjectを追加する（DCTDecodeのまま埋め込み）。
    ///
    /// 戻り値はXObjectのオブジェクトID。
    pub fn add_jpeg_xobject(
        &mut self,
        jpeg_data: &[u8],
        width: u32,
        height: u32,
        channels: u8,
    ) -> ObjectId {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space_for(channels),
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        let stream = Stream::new(dict, jpeg_data.to_vec());
        self.doc.add_object(Object::Stream(stream))
    }

    /// PNG XObjectを追加する。
    ///
    /// PDFはPNGを直接扱えないため、IDATのzlibデータをそのまま
    /// FlateDecode + PNG予測子(Predictor 15)のストリームとして埋め込む。
    pub fn add_png_xobject(&mut self, png_data: &[u8]) -> crate::error::Result<ObjectId> {
        let png = split_png(png_data)?;
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => png.width as i64,
            "Height" => png.height as i64,
            "ColorSpace" => color_space_for(png.colors),
            "BitsPerComponent" => png.bit_depth as i64,
            "Filter" => "FlateDecode",
            "DecodeParms" => dictionary! {
                "Predictor" => 15,
                "Colors" => png.colors as i64,
                "BitsPerComponent" => png.bit_depth as i64,
                "Columns" => png.width as i64,
            },
        };
        let stream = Stream::new(dict, png.idat).with_compression(false);
        Ok(self.doc.add_object(Object::Stream(stream)))
    }

    /// zlib圧縮済みの生画素(8bit)XObjectを追加する。
    pub fn add_flate_xobject(
        &mut self,
        deflated: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
    ) -> ObjectId {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space_for(channels),
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        let stream = Stream::new(dict, deflated).with_compression(false);
        self.doc.add_object(Object::Stream(stream))
    }

    /// 画像をページ全面に描くコンテンツストリームを生成する。
    ///
    /// `q <width> 0 0 <height> 0 0 cm /<name> Do Q`
    pub fn build_page_content_stream(name: &str, geometry: PageGeometry) -> Vec<u8> {
        format!(
            "q {} 0 0 {} 0 0 cm /{} Do Q",
            geometry.width, geometry.height, name
        )
        .into_bytes()
    }

    /// XObjectを全面に描くページを追加する。MediaBoxは `geometry` そのもの。
    pub fn add_image_page(
        &mut self,
        xobject_id: ObjectId,
        geometry: PageGeometry,
    ) -> crate::error::Result<ObjectId> {
        if !geometry.is_valid() {
            return Err(PdfCompressError::write_failed(format!(
                "invalid page geometry {}x{}",
                geometry.width, geometry.height
            )));
        }

        let mut xobject_dict = Dictionary::new();
        xobject_dict.set(IMAGE_NAME, Object::Reference(xobject_id));

        let resources_id = self.doc.add_object(dictionary! {
            "XObject" => Object::Dictionary(xobject_dict),
        });

        let content_bytes = Self::build_page_content_stream(IMAGE_NAME, geometry);
        let content_id = self
            .doc
            .add_object(Object::Stream(Stream::new(dictionary! {}, content_bytes)));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                point_value(geometry.width),
                point_value(geometry.height),
            ],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        self.kids.push(page_id.into());

        Ok(page_id)
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// ページツリーとCatalogを組み立て、最適化してバイト列として出力する。
    pub fn finish(mut self) -> crate::error::Result<Vec<u8>> {
        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => std::mem::take(&mut self.kids),
            "Count" => count,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        crate::pdf::optimizer::optimize(&mut self.doc);

        save_to_bytes(&mut self.doc)
    }
}

impl DocumentSink for ImagePageWriter {
    fn add_page(&mut self, image: &EncodedImage) -> crate::error::Result<()> {
        let xobject_id = match image.format {
            ImageFormat::Jpeg => {
                self.add_jpeg_xobject(&image.data, image.width, image.height, image.channels)
            }
            ImageFormat::Png => self.add_png_xobject(&image.data)?,
        };
        self.add_image_page(xobject_id, image.geometry)?;
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.kids.len()
    }

    fn finalize(self) -> crate::error::Result<Vec<u8>> {
        self.finish()
    }
}

/// PDFドキュメントをバイト列として出力する。
pub fn save_to_bytes(doc: &mut Document) -> crate::error::Result<Vec<u8>> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| PdfCompressError::write_failed(e.to_string()))?;
    Ok(buf)
}

/// 出力先と同じディレクトリの一時ファイルに書いてからリネームする。
///
/// 失敗時は一時ファイルが破棄され、出力先には何も残らない。
pub fn write_output(path: &Path, bytes: &[u8]) -> crate::error::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        PdfCompressError::write_failed(format!("{}: {e}", dir.display()))
    })?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| PdfCompressError::write_failed(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| PdfCompressError::write_failed(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}

/// PNGのチャンクを走査してIHDRとIDATを取り出す。
///
/// 非インターレースのグレースケール(1/2/4/8bit)とRGB(8bit)のみ対応。
pub fn split_png(data: &[u8]) -> crate::error::Result<PngStream> {
    let invalid = |msg: &str| PdfCompressError::write_failed(format!("invalid PNG: {msg}"));

    if data.len() < PNG_SIGNATURE.len() || data[..8] != PNG_SIGNATURE {
        return Err(invalid("bad signature"));
    }

    let mut header: Option<(u32, u32, u8, u8)> = None;
    let mut idat = Vec::new();
    let mut pos = PNG_SIGNATURE.len();

    while pos + 8 <= data.len() {
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        let kind = &data[pos + 4..pos + 8];
        let body_start = pos + 8;
        let body_end = body_start
            .checked_add(len)
            .filter(|&end| end + 4 <= data.len())
            .ok_or_else(|| invalid("truncated chunk"))?;
        let body = &data[body_start..body_end];

        match kind {
            b"IHDR" => {
                if body.len() < 13 {
                    return Err(invalid("short IHDR"));
                }
                let width = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
                let height = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
                let bit_depth = body[8];
                let color_type = body[9];
                let interlace = body[12];
                if interlace != 0 {
                    return Err(invalid("interlaced PNG"));
                }
                let colors = match (color_type, bit_depth) {
                    (0, 1 | 2 | 4 | 8) => 1,
                    (2, 8) => 3,
                    _ => {
                        return Err(invalid(&format!(
                            "unsupported color type {color_type} / bit depth {bit_depth}"
                        )));
                    }
                };
                header = Some((width, height, bit_depth, colors));
            }
            b"IDAT" => idat.extend_from_slice(body),
            b"IEND" => break,
            _ => {}
        }

        pos = body_end + 4; // CRC
    }

    let (width, height, bit_depth, colors) = header.ok_or_else(|| invalid("missing IHDR"))?;
    if idat.is_empty() {
        return Err(invalid("missing IDAT"));
    }

    Ok(PngStream {
        width,
        height,
        bit_depth,
        colors,
        idat,
    })
}

fn color_space_for(channels: u8) -> &'static str {
    if channels == 1 { "DeviceGray" } else { "DeviceRGB" }
}

/// 整数値なら Integer、そうでなければ Real として表す。
fn point_value(v: f32) -> Object {
    if v.fract() == 0.0 && v.abs() < i32::MAX as f32 {
        Object::Integer(v as i64)
    } else {
        Object::Real(v.into())
    }
}
