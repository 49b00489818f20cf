// Phase 9: ジョブ単位: 入力検証 -> 圧縮 / 連結 / 画像PDF化

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::config::compression::CompressionConfig;
use crate::config::job::Job;
use crate::config::merged::MergedConfig;
use crate::config::settings::Settings;
use crate::error::PdfCompressError;
use crate::pipeline::compress::{
    CompressInput, CompressionReport, PipelineOptions, compress_with_options,
};
use crate::pipeline::deadline::Deadline;

/// What a job does.
#[derive(Debug, Clone)]
pub enum JobKind {
    Compress {
        input_path: PathBuf,
        compression: CompressionConfig,
        parallel_workers: usize,
        timeout: Option<Duration>,
    },
    Merge {
        input_paths: Vec<PathBuf>,
    },
    Images {
        input_paths: Vec<PathBuf>,
    },
}

/// Per-job input limits taken from [`Settings`].
#[derive(Debug, Clone, Copy)]
pub struct InputLimits {
    pub max_file_size_bytes: u64,
    pub max_files: usize,
}

impl InputLimits {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_file_size_bytes: settings.max_file_size_bytes(),
            max_files: settings.max_files_per_job,
        }
    }
}

impl Default for InputLimits {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Configuration for a single job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub kind: JobKind,
    pub output_path: PathBuf,
    pub limits: InputLimits,
}

/// Result of processing a single job.
#[derive(Debug)]
pub struct JobResult {
    pub output_path: PathBuf,
    pub pages_processed: usize,
    /// Set for compress jobs only.
    pub report: Option<CompressionReport>,
}

impl JobConfig {
    /// ジョブファイルの1エントリと設定から JobConfig を組み立てる。
    ///
    /// 相対パスは `base_dir`（ジョブファイルのディレクトリ）基準で解決する。
    /// 圧縮パラメータの範囲検証はここで行う。
    pub fn from_job(job: &Job, settings: &Settings, base_dir: &Path) -> crate::error::Result<Self> {
        let kind = match job {
            Job::Compress(compress_job) => {
                let merged = MergedConfig::new(settings, compress_job);
                JobKind::Compress {
                    input_path: resolve_path(base_dir, &compress_job.input),
                    compression: merged.compression_config()?,
                    parallel_workers: merged.parallel_workers,
                    timeout: merged.timeout,
                }
            }
            Job::Merge(merge_job) => JobKind::Merge {
                input_paths: resolve_all(base_dir, &merge_job.inputs),
            },
            Job::Images(images_job) => JobKind::Images {
                input_paths: resolve_all(base_dir, &images_job.inputs),
            },
        };

        Ok(JobConfig {
            kind,
            output_path: resolve_path(base_dir, job.output()),
            limits: InputLimits::from_settings(settings),
        })
    }

    pub fn input_paths(&self) -> Vec<&Path> {
        match &self.kind {
            JobKind::Compress { input_path, .. } => vec![input_path.as_path()],
            JobKind::Merge { input_paths } | JobKind::Images { input_paths } => {
                input_paths.iter().map(PathBuf::as_path).collect()
            }
        }
    }
}

/// Run a single job.
pub fn run_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    validate_inputs(config)?;

    match &config.kind {
        JobKind::Compress {
            input_path,
            compression,
            parallel_workers,
            timeout,
        } => {
            let options = PipelineOptions {
                parallel_workers: *parallel_workers,
                deadline: timeout.map(Deadline::after),
            };
            let report = compress_with_options(
                CompressInput::Path(input_path.clone()),
                &config.output_path,
                compression,
                &options,
            )?;
            info!(
                input = %input_path.display(),
                output = %config.output_path.display(),
                pages = report.pages,
                original_size = report.original_size,
                compressed_size = report.compressed_size,
                "compression complete: {:.1}% reduction",
                report.compression_ratio
            );
            Ok(JobResult {
                output_path: config.output_path.clone(),
                pages_processed: report.pages,
                report: Some(report),
            })
        }
        JobKind::Merge { input_paths } => {
            let pages = crate::pdf::merge::merge_files(input_paths, &config.output_path)?;
            info!(
                inputs = input_paths.len(),
                pages,
                output = %config.output_path.display(),
                "merge complete"
            );
            Ok(JobResult {
                output_path: config.output_path.clone(),
                pages_processed: pages,
                report: None,
            })
        }
        JobKind::Images { input_paths } => {
            let pages = crate::pdf::images::images_to_pdf(input_paths, &config.output_path)?;
            info!(pages, output = %config.output_path.display(), "images converted");
            Ok(JobResult {
                output_path: config.output_path.clone(),
                pages_processed: pages,
                report: None,
            })
        }
    }
}

/// 入力ファイル数とサイズの上限を検証する。
///
/// 存在しないファイルはここでは通し、各処理が種類に応じたエラーを返す。
fn validate_inputs(config: &JobConfig) -> crate::error::Result<()> {
    let inputs = config.input_paths();

    match &config.kind {
        JobKind::Merge { .. } if inputs.len() < 2 => {
            return Err(PdfCompressError::config(
                "At least 2 PDF files required for merging",
            ));
        }
        JobKind::Images { .. } if inputs.is_empty() => {
            return Err(PdfCompressError::config("No files provided"));
        }
        _ => {}
    }

    if inputs.len() > config.limits.max_files {
        return Err(PdfCompressError::config(format!(
            "Too many files. Maximum {} files allowed",
            config.limits.max_files
        )));
    }

    for path in inputs {
        if let Ok(meta) = std::fs::metadata(path)
            && meta.len() > config.limits.max_file_size_bytes
        {
            return Err(PdfCompressError::config(format!(
                "{} is {} bytes, exceeding the {} byte limit",
                path.display(),
                meta.len(),
                config.limits.max_file_size_bytes
            )));
        }
    }

    Ok(())
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn resolve_all(base_dir: &Path, paths: &[String]) -> Vec<PathBuf> {
    paths.iter().map(|p| resolve_path(base_dir, p)).collect()
}
