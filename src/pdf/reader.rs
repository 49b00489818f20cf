use std::path::Path;

use lopdf::{Document, Object};

use crate::error::PdfCompressError;
use crate::pipeline::capability::PageGeometry;

/// lopdfベースの読み取り専用ビュー。
///
/// 連結では入力の読み込みに使う。寸法・画像の問い合わせは、
/// 出力PDFがページ数・ページ矩形・埋め込み画像を保っているかを
/// 検証するためのもの。
pub struct PdfReader {
    doc: Document,
}

impl PdfReader {
    /// PDFファイルを開いてPdfReaderを作成する。
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let doc = Document::load(path).map_err(|e| {
            PdfCompressError::source_unreadable(format!("{}: {e}", path.display()))
        })?;
        Ok(Self { doc })
    }

    /// メモリ上のPDFバイト列からPdfReaderを作成する。
    ///
    /// `compress_document` が返すバイト列の検証に使う。
    pub fn open_mem(bytes: &[u8]) -> crate::error::Result<Self> {
        let doc = Document::load_mem(bytes)?;
        Ok(Self { doc })
    }

    /// 内部のlopdf Documentを取り出す。
    pub fn into_document(self) -> Document {
        self.doc
    }

    /// ページ数を返す。
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// 指定ページ辞書からMediaBoxを取得する（Parent経由の継承も考慮）。
    fn get_media_box(&self, dict: &lopdf::Dictionary) -> crate::error::Result<Object> {
        if let Ok(obj) = dict.get(b"MediaBox") {
            return Ok(obj.clone());
        }

        if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
            let parent_dict = self.doc.get_dictionary(*parent_id)?;
            return self.get_media_box(parent_dict);
        }

        Err(PdfCompressError::source_unreadable("MediaBox not found"))
    }

    /// 指定ページ(1-indexed)のMediaBoxからページ寸法を返す。
    ///
    /// 出力のページ矩形が入力と一致するかの検証用。
    pub fn page_dimensions(&self, page_num: u32) -> crate::error::Result<PageGeometry> {
        let page_id = self.get_page_id(page_num)?;
        let page_dict = self.doc.get_dictionary(page_id)?;

        let media_box = self.get_media_box(page_dict)?;
        let media_box = match media_box {
            Object::Reference(id) => self.doc.get_object(id)?.clone(),
            other => other,
        };

        let media_box_array = media_box.as_array()?;
        if media_box_array.len() < 4 {
            return Err(PdfCompressError::source_unreadable("Invalid MediaBox"));
        }

        // MediaBoxの値は整数または実数の可能性がある
        let to_f32 = |obj: &Object| -> crate::error::Result<f32> {
            match obj {
                Object::Integer(i) => Ok(*i as f32),
                Object::Real(f) => Ok(*f as f32),
                _ => Err(PdfCompressError::source_unreadable("Invalid MediaBox value")),
            }
        };

        let x0 = to_f32(&media_box_array[0])?;
        let y0 = to_f32(&media_box_array[1])?;
        let x1 = to_f32(&media_box_array[2])?;
        let y1 = to_f32(&media_box_array[3])?;

        let geometry = PageGeometry::new((x1 - x0).abs(), (y1 - y0).abs());
        if !geometry.is_valid() {
            return Err(PdfCompressError::source_unreadable(
                "Invalid MediaBox: non-positive page dimensions",
            ));
        }

        Ok(geometry)
    }

    /// 全ページの寸法を文書順に返す（出力検証用）。
    pub fn page_geometries(&self) -> crate::error::Result<Vec<PageGeometry>> {
        (1..=self.page_count())
            .map(|page_num| self.page_dimensions(page_num))
            .collect()
    }

    /// 指定ページ(1-indexed)のXObjectリソースのうち、Subtype=Imageのストリームを名前順に返す。
    ///
    /// 出力ページが1枚の画像だけを持つこと、その形式と寸法の検証用。
    pub fn page_images(&self, page_num: u32) -> crate::error::Result<Vec<(String, lopdf::Stream)>> {
        let page_id = self.get_page_id(page_num)?;
        let (resource_dict, resource_ids) = self.doc.get_page_resources(page_id)?;

        let mut images = Vec::new();
        if let Some(dict) = resource_dict {
            self.collect_images_from_dict(dict, &mut images)?;
        }
        for res_id in resource_ids {
            let dict = self.doc.get_dictionary(res_id)?;
            self.collect_images_from_dict(dict, &mut images)?;
        }

        images.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(images)
    }

    /// リソース辞書のXObjectエントリからSubtype=Imageのストリームを集める。
    fn collect_images_from_dict(
        &self,
        dict: &lopdf::Dictionary,
        images: &mut Vec<(String, lopdf::Stream)>,
    ) -> crate::error::Result<()> {
        let xobject_dict = match dict.get(b"XObject") {
            Ok(Object::Dictionary(d)) => d,
            Ok(Object::Reference(id)) => self.doc.get_object(*id).and_then(Object::as_dict)?,
            _ => return Ok(()),
        };

        for (name_bytes, value) in xobject_dict.iter() {
            let stream = match value {
                Object::Reference(id) => self.doc.get_object(*id).and_then(Object::as_stream)?,
                Object::Stream(s) => s,
                _ => continue,
            };

            if let Ok(subtype) = stream.dict.get(b"Subtype").and_then(Object::as_name)
                && subtype == b"Image"
            {
                images.push((String::from_utf8_lossy(name_bytes).into_owned(), stream.clone()));
            }
        }

        Ok(())
    }

    /// ページ番号(1-indexed)からObjectIdを取得する。
    fn get_page_id(&self, page_num: u32) -> crate::error::Result<lopdf::ObjectId> {
        let pages = self.doc.get_pages();
        pages.get(&page_num).copied().ok_or_else(|| {
            PdfCompressError::source_unreadable(format!("page {} not found", page_num))
        })
    }
}
