// Phase 6: 文書単位: 開く -> バッチ単位でレンダリング/並列エンコード -> 順序通りに組立 -> 確定

use std::io::Read;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::debug;

use crate::config::compression::CompressionConfig;
use crate::error::PdfCompressError;
use crate::pdf::writer::{ImagePageWriter, write_output};
use crate::pipeline::capability::{DocumentSink, DocumentSource, PageHandle};
use crate::pipeline::deadline::Deadline;
use crate::pipeline::page_processor::{RenderedPage, process_page};
use crate::raster::EncodedImage;
use crate::render::pdfium::{PdfiumSource, create_pdfium};

/// pdfiumはヘッダ前のゴミをこの範囲まで許容する。
const HEADER_SEARCH_LIMIT: usize = 1024;

/// 入力文書の渡し方。
#[derive(Debug, Clone)]
pub enum CompressInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// Execution knobs that do not change the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Pages rendered per batch before the batch is encoded in parallel.
    /// 0 = number of rayon worker threads.
    pub parallel_workers: usize,
    pub deadline: Option<Deadline>,
}

impl PipelineOptions {
    fn batch_size(&self) -> usize {
        if self.parallel_workers == 0 {
            rayon::current_num_threads().max(1)
        } else {
            self.parallel_workers
        }
    }

    fn check_deadline(&self) -> crate::error::Result<()> {
        match &self.deadline {
            Some(deadline) => deadline.check(),
            None => Ok(()),
        }
    }
}

/// Result of one successful compression call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionReport {
    pub pages: usize,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percentage saved; negative when the output grew.
    pub compression_ratio: f64,
}

impl CompressionReport {
    pub fn new(pages: usize, original_size: u64, compressed_size: u64) -> Self {
        Self {
            pages,
            original_size,
            compressed_size,
            compression_ratio: compression_ratio(original_size, compressed_size),
        }
    }
}

/// `(1 - compressed/original) * 100`. Returns 0 when `original_size` is 0.
pub fn compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (1.0 - compressed_size as f64 / original_size as f64) * 100.0
}

/// Run the page pipeline over any source/sink pair and return the
/// finalized document bytes.
///
/// Pages are handled in batches: rendering is sequential and stops at the
/// first failing page, transform + encode of the batch runs on rayon, and
/// the encoded pages are appended to `sink` in page order. Any error aborts
/// the call before the next batch is rendered; `sink` is dropped unfinished.
pub fn compress_document<S, K>(
    source: &S,
    mut sink: K,
    config: &CompressionConfig,
    options: &PipelineOptions,
) -> crate::error::Result<Vec<u8>>
where
    S: DocumentSource,
    K: DocumentSink,
{
    config.validate()?;

    let page_count = source.page_count();
    if page_count == 0 {
        return Err(PdfCompressError::source_unreadable("document has no pages"));
    }

    let zoom = config.render_zoom();
    let indices: Vec<u32> = (0..page_count).collect();

    for batch in indices.chunks(options.batch_size()) {
        options.check_deadline()?;

        let rendered = render_batch(source, batch, zoom)?;
        let encoded: Vec<crate::error::Result<EncodedImage>> = rendered
            .into_par_iter()
            .map(|page| process_page(page, config))
            .collect();

        for image in encoded {
            sink.add_page(&image?)?;
        }
    }

    options.check_deadline()?;
    debug!(pages = sink.page_count(), "finalizing output document");
    sink.finalize()
}

fn render_batch<S: DocumentSource>(
    source: &S,
    batch: &[u32],
    zoom: f32,
) -> crate::error::Result<Vec<RenderedPage>> {
    batch
        .iter()
        .map(|&page_index| {
            let page = source.page(page_index)?;
            let geometry = page.geometry();
            if !geometry.is_valid() {
                return Err(PdfCompressError::page_render(
                    page_index,
                    format!(
                        "invalid page geometry {}x{}",
                        geometry.width, geometry.height
                    ),
                ));
            }
            let raster = page.render(zoom)?;
            debug!(
                page = page_index,
                width = raster.width(),
                height = raster.height(),
                "page rendered"
            );
            Ok(RenderedPage {
                page_index,
                geometry,
                raster,
            })
        })
        .collect()
}

/// Compress a PDF into `output` with default pipeline options.
pub fn compress(
    input: CompressInput,
    output: &Path,
    config: &CompressionConfig,
) -> crate::error::Result<CompressionReport> {
    compress_with_options(input, output, config, &PipelineOptions::default())
}

/// Compress a PDF into `output`.
///
/// The output file is only created after the whole document has been
/// rendered, encoded and finalized; on any error nothing is written.
pub fn compress_with_options(
    input: CompressInput,
    output: &Path,
    config: &CompressionConfig,
    options: &PipelineOptions,
) -> crate::error::Result<CompressionReport> {
    config.validate()?;
    let original_size = inspect_input(&input)?;

    let pdfium = create_pdfium()?;
    let (pages, bytes) = {
        let source = match input {
            CompressInput::Path(path) => PdfiumSource::open_file(&pdfium, &path)?,
            CompressInput::Bytes(bytes) => PdfiumSource::open_bytes(&pdfium, bytes)?,
        };
        let pages = source.page_count() as usize;
        let bytes = compress_document(&source, ImagePageWriter::new(), config, options)?;
        (pages, bytes)
    };

    write_output(output, &bytes)?;

    Ok(CompressionReport::new(pages, original_size, bytes.len() as u64))
}

/// Cheap pre-flight check: the input must exist, be non-empty and carry a
/// `%PDF-` header. Returns the input size in bytes.
fn inspect_input(input: &CompressInput) -> crate::error::Result<u64> {
    match input {
        CompressInput::Path(path) => {
            let unreadable =
                |e: std::io::Error| PdfCompressError::source_unreadable(format!("{}: {e}", path.display()));
            let size = std::fs::metadata(path).map_err(unreadable)?.len();
            let mut head = Vec::with_capacity(HEADER_SEARCH_LIMIT);
            std::fs::File::open(path)
                .and_then(|f| f.take(HEADER_SEARCH_LIMIT as u64).read_to_end(&mut head))
                .map_err(unreadable)?;
            check_pdf_header(&head)?;
            Ok(size)
        }
        CompressInput::Bytes(bytes) => {
            check_pdf_header(bytes)?;
            Ok(bytes.len() as u64)
        }
    }
}

fn check_pdf_header(bytes: &[u8]) -> crate::error::Result<()> {
    if bytes.is_empty() {
        return Err(PdfCompressError::source_unreadable("input is empty"));
    }
    let head = &bytes[..bytes.len().min(HEADER_SEARCH_LIMIT)];
    if !head.windows(5).any(|w| w == b"%PDF-") {
        return Err(PdfCompressError::source_unreadable(
            "input is not a PDF (missing %PDF- header)",
        ));
    }
    Ok(())
}
