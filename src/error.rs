use thiserror::Error;

use crate::raster::EncodeError;

#[derive(Debug, Error)]
pub enum PdfCompressError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Source unreadable: {0}")]
    SourceUnreadable(String),

    #[error("Renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("Page {page} render failed: {message}")]
    PageRenderFailed { page: u32, message: String },

    #[error("Page {page} encode failed: {source}")]
    EncodeFailed {
        page: u32,
        #[source]
        source: EncodeError,
    },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Deadline exceeded after {elapsed_secs:.1}s")]
    Timeout { elapsed_secs: f64 },

    #[error("Merge error: {0}")]
    MergeError(String),

    #[error("Image conversion error: {0}")]
    ImageConvertError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`PdfCompressError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl PdfCompressError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create a source-unreadable error.
    source_unreadable => SourceUnreadable,
    /// Create a renderer-unavailable error.
    renderer_unavailable => RendererUnavailable,
    /// Create a write error.
    write_failed => WriteFailed,
    /// Create a merge error.
    merge => MergeError,
    /// Create an image conversion error.
    image_convert => ImageConvertError,
}

impl PdfCompressError {
    /// Create a render error for the given 0-indexed page.
    pub fn page_render(page: u32, msg: impl Into<String>) -> Self {
        Self::PageRenderFailed {
            page,
            message: msg.into(),
        }
    }

    /// Create an encode error for the given 0-indexed page.
    pub fn encode(page: u32, source: EncodeError) -> Self {
        Self::EncodeFailed { page, source }
    }
}

impl From<lopdf::Error> for PdfCompressError {
    fn from(e: lopdf::Error) -> Self {
        Self::SourceUnreadable(e.to_string())
    }
}

impl From<serde_yml::Error> for PdfCompressError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<pdfium_render::prelude::PdfiumError> for PdfCompressError {
    fn from(e: pdfium_render::prelude::PdfiumError) -> Self {
        Self::RendererUnavailable(e.to_string())
    }
}

impl From<image::ImageError> for PdfCompressError {
    fn from(e: image::ImageError) -> Self {
        Self::ImageConvertError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PdfCompressError>;
