// Phase 1: 圧縮パラメータ、クランプ定数、色モード

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::PdfCompressError;

/// PDFのユーザー単位: 1 point = 1/72 inch
pub const POINTS_PER_INCH: f64 = 72.0;

/// レンダリングDPIの上限。これを超える要求は黙って切り詰める。
pub const DPI_CEILING: u32 = 100;

/// 非可逆(JPEG)経路の品質上限。
pub const JPEG_QUALITY_CEILING: u8 = 50;

/// レンダリング後に全ページへ適用する縮小率（設定不可）。
pub const SCALE_FACTOR: f64 = 0.7;

/// モノクロ化の二値化しきい値（輝度がこれ以上なら白）。
pub const MONOCHROME_THRESHOLD: u8 = 128;

/// 呼び出し側で受け付けるDPIの範囲。
pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 300;

/// 出力画像の色深度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ColorMode {
    /// 3チャンネルのまま
    #[default]
    NoChange,
    /// 1チャンネル輝度
    Grayscale,
    /// 輝度 → 1bit白黒
    Monochrome,
}

impl ColorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::NoChange => "no-change",
            ColorMode::Grayscale => "grayscale",
            ColorMode::Monochrome => "monochrome",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorMode {
    type Err = PdfCompressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no-change" => Ok(ColorMode::NoChange),
            "grayscale" => Ok(ColorMode::Grayscale),
            "monochrome" => Ok(ColorMode::Monochrome),
            other => Err(PdfCompressError::config(format!(
                "color_mode must be one of: no-change, grayscale, monochrome (got '{other}')"
            ))),
        }
    }
}

impl TryFrom<String> for ColorMode {
    type Error = PdfCompressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 1回の圧縮呼び出しに渡す不変パラメータ。
///
/// `new` は呼び出し側の範囲検証を行う。コア側のクランプ
/// （DPI ≤ 100, JPEG品質 ≤ 50）はこれとは独立に
/// [`effective_dpi`](Self::effective_dpi) と
/// [`jpeg_quality`](Self::jpeg_quality) で適用される。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionConfig {
    pub dpi: u32,
    pub image_quality: u8,
    pub color_mode: ColorMode,
}

impl CompressionConfig {
    pub fn new(dpi: u32, image_quality: u8, color_mode: ColorMode) -> crate::error::Result<Self> {
        let config = CompressionConfig {
            dpi,
            image_quality,
            color_mode,
        };
        config.validate()?;
        Ok(config)
    }

    /// `dpi` ∈ [72, 300], `image_quality` ∈ [1, 100] を検証する。
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(MIN_DPI..=MAX_DPI).contains(&self.dpi) {
            return Err(PdfCompressError::config(format!(
                "dpi must be between {MIN_DPI} and {MAX_DPI}, got {}",
                self.dpi
            )));
        }
        if !(1..=100).contains(&self.image_quality) {
            return Err(PdfCompressError::config(format!(
                "image_quality must be between 1 and 100, got {}",
                self.image_quality
            )));
        }
        Ok(())
    }

    pub fn effective_dpi(&self) -> u32 {
        effective_dpi(self.dpi)
    }

    pub fn render_zoom(&self) -> f32 {
        render_zoom(self.dpi)
    }

    pub fn jpeg_quality(&self) -> u8 {
        jpeg_quality(self.image_quality)
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        CompressionConfig {
            dpi: 72,
            image_quality: 40,
            color_mode: ColorMode::NoChange,
        }
    }
}

/// 実際にレンダリングに使うDPI: `min(dpi, 100)`
pub fn effective_dpi(requested_dpi: u32) -> u32 {
    requested_dpi.min(DPI_CEILING)
}

/// 要求DPIからレンダリング倍率を求める: `effective_dpi / 72`
pub fn render_zoom(requested_dpi: u32) -> f32 {
    (f64::from(effective_dpi(requested_dpi)) / POINTS_PER_INCH) as f32
}

/// JPEG品質を上限で切り詰める。
pub fn jpeg_quality(requested: u8) -> u8 {
    requested.min(JPEG_QUALITY_CEILING)
}

/// 縮小後のピクセル寸法。小数部は切り捨て、0にはならない。
pub fn scaled_dimension(pixels: u32) -> u32 {
    ((f64::from(pixels) * SCALE_FACTOR) as u32).max(1)
}
