// Phase 2: 文書の読み出し/書き込み能力インターフェース
//
// PDFライブラリの内部表現に依存しないよう、パイプラインは
// これらのトレイトだけを通して入出力文書を扱う。

use image::DynamicImage;

use crate::raster::EncodedImage;

/// ページ矩形（単位: point）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// 幅・高さがともに有限かつ正であること。
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// 入力文書。ページは0始まり、文書順。
pub trait DocumentSource {
    type Page<'p>: PageHandle
    where
        Self: 'p;

    fn page_count(&self) -> u32;

    /// 指定ページを取得する。失敗は `PageRenderFailed`。
    fn page(&self, index: u32) -> crate::error::Result<Self::Page<'_>>;
}

/// 入力文書の1ページ。
pub trait PageHandle {
    fn geometry(&self) -> PageGeometry;

    /// 指定倍率で不透明RGBラスタにレンダリングする。
    fn render(&self, zoom: f32) -> crate::error::Result<DynamicImage>;
}

/// 出力文書。ページ追加は追記のみ・順序保持、確定は1回だけ。
pub trait DocumentSink {
    fn add_page(&mut self, image: &EncodedImage) -> crate::error::Result<()>;

    fn page_count(&self) -> usize;

    /// 文書を確定してシリアライズする。
    fn finalize(self) -> crate::error::Result<Vec<u8>>
    where
        Self: Sized;
}
