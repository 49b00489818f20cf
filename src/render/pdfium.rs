// Phase 2: pdfium-render wrapper: page -> opaque RGB DynamicImage (in-memory only)

use std::path::{Path, PathBuf};

use image::DynamicImage;
use pdfium_render::prelude::*;

use crate::error::PdfCompressError;
use crate::pipeline::capability::{DocumentSource, PageGeometry, PageHandle};

/// Resolves the path to the pdfium shared library.
///
/// Search order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` environment variable
/// 2. `vendor/pdfium/lib/` relative to the project root (for development)
fn resolve_pdfium_lib_path() -> crate::error::Result<PathBuf> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Ok(p);
        }
        return Err(PdfCompressError::renderer_unavailable(format!(
            "PDFIUM_DYNAMIC_LIB_PATH is set to '{}' but the path does not exist",
            path
        )));
    }

    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let vendor_path = PathBuf::from(&manifest_dir).join("vendor/pdfium/lib");
        if vendor_path.exists() {
            return Ok(vendor_path);
        }
    }

    Err(PdfCompressError::renderer_unavailable(
        "pdfium library not found: set PDFIUM_DYNAMIC_LIB_PATH or place libpdfium.so in vendor/pdfium/lib/",
    ))
}

/// Creates a new Pdfium instance by dynamically loading the shared library.
pub fn create_pdfium() -> crate::error::Result<Pdfium> {
    let lib_path = resolve_pdfium_lib_path()?;
    let lib_path_str = lib_path.to_str().ok_or_else(|| {
        PdfCompressError::renderer_unavailable("pdfium library path contains non-UTF-8 characters")
    })?;
    let bindings =
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(lib_path_str))?;
    Ok(Pdfium::new(bindings))
}

/// A source document opened through pdfium.
///
/// Dropping it closes the underlying pdfium document handle.
pub struct PdfiumSource<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumSource<'a> {
    /// Open a PDF file. Any load failure is `SourceUnreadable`.
    pub fn open_file(pdfium: &'a Pdfium, path: &Path) -> crate::error::Result<Self> {
        let document = pdfium.load_pdf_from_file(path, None).map_err(|e| {
            PdfCompressError::source_unreadable(format!("{}: {e}", path.display()))
        })?;
        Ok(Self { document })
    }

    /// Open a PDF held in memory. Any load failure is `SourceUnreadable`.
    pub fn open_bytes(pdfium: &'a Pdfium, bytes: Vec<u8>) -> crate::error::Result<Self> {
        let document = pdfium
            .load_pdf_from_byte_vec(bytes, None)
            .map_err(|e| PdfCompressError::source_unreadable(e.to_string()))?;
        Ok(Self { document })
    }
}

impl<'a> DocumentSource for PdfiumSource<'a> {
    type Page<'p>
        = PdfiumPage<'a>
    where
        Self: 'p;

    fn page_count(&self) -> u32 {
        u32::from(self.document.pages().len())
    }

    fn page(&self, index: u32) -> crate::error::Result<PdfiumPage<'a>> {
        let page_index = u16::try_from(index)
            .map_err(|_| PdfCompressError::page_render(index, "page index exceeds u16 range"))?;
        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| PdfCompressError::page_render(index, e.to_string()))?;
        Ok(PdfiumPage { index, page })
    }
}

/// One loaded pdfium page.
pub struct PdfiumPage<'a> {
    index: u32,
    page: PdfPage<'a>,
}

impl PageHandle for PdfiumPage<'_> {
    fn geometry(&self) -> PageGeometry {
        PageGeometry::new(self.page.width().value, self.page.height().value)
    }

    /// Renders at `zoom` device pixels per point.
    ///
    /// The bitmap is cleared to opaque white before drawing and the alpha
    /// channel is dropped, so no transparency reaches the JPEG path.
    fn render(&self, zoom: f32) -> crate::error::Result<DynamicImage> {
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(PdfCompressError::page_render(
                self.index,
                format!("invalid zoom factor {zoom}"),
            ));
        }

        let config = PdfRenderConfig::new()
            .scale_page_by_factor(zoom)
            .set_clear_color(PdfColor::WHITE);

        let bitmap = self
            .page
            .render_with_config(&config)
            .map_err(|e| PdfCompressError::page_render(self.index, e.to_string()))?;

        Ok(DynamicImage::ImageRgb8(bitmap.as_image().into_rgb8()))
    }
}
