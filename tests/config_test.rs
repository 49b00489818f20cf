// Phase 1: 設定ファイル解析・圧縮パラメータテスト

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use pdf_compress::config::compression::{
    ColorMode, CompressionConfig, jpeg_quality, render_zoom, scaled_dimension,
};
use pdf_compress::config::job::{Job, JobFile};
use pdf_compress::config::load_settings_for_job;
use pdf_compress::config::merged::MergedConfig;
use pdf_compress::config::settings::Settings;
use pdf_compress::error::PdfCompressError;

// ============================================================
// 1. Settings 構造体のデシリアライズ
// ============================================================

#[test]
fn test_settings_full_yaml() {
    let yaml = r#"
dpi: 150
image_quality: 70
color_mode: grayscale
parallel_workers: 4
max_file_size_mb: 10
max_files_per_job: 5
process_timeout_seconds: 60
"#;
    let settings = Settings::from_yaml(yaml).expect("should parse full settings");
    assert_eq!(settings.dpi, 150);
    assert_eq!(settings.image_quality, 70);
    assert_eq!(settings.color_mode, ColorMode::Grayscale);
    assert_eq!(settings.parallel_workers, 4);
    assert_eq!(settings.max_file_size_bytes(), 10 * 1024 * 1024);
    assert_eq!(settings.max_files_per_job, 5);
    assert_eq!(settings.process_timeout(), Some(Duration::from_secs(60)));
}

#[test]
fn test_settings_defaults_for_missing_keys() {
    let settings = Settings::from_yaml("dpi: 96\n").expect("should parse partial settings");
    assert_eq!(settings.dpi, 96);
    assert_eq!(settings.image_quality, 40);
    assert_eq!(settings.color_mode, ColorMode::NoChange);
    assert_eq!(settings.parallel_workers, 0);
    assert_eq!(settings.max_file_size_mb, 100);
    assert_eq!(settings.max_files_per_job, 50);
    assert_eq!(settings.process_timeout_seconds, 300);
}

#[test]
fn test_settings_zero_timeout_means_no_deadline() {
    let settings =
        Settings::from_yaml("process_timeout_seconds: 0\n").expect("should parse settings");
    assert_eq!(settings.process_timeout(), None);
}

#[test]
fn test_settings_invalid_color_mode_rejected() {
    let result = Settings::from_yaml("color_mode: sepia\n");
    assert!(
        matches!(result, Err(PdfCompressError::ConfigError(_))),
        "unknown color_mode should be a config error, got: {result:?}"
    );
}

#[test]
fn test_load_settings_for_job_reads_sibling_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut f = std::fs::File::create(dir.path().join("settings.yaml")).expect("create settings");
    writeln!(f, "dpi: 200").expect("write settings");
    let job_path = dir.path().join("jobs.yaml");

    let settings = load_settings_for_job(&job_path).expect("should load settings");
    assert_eq!(settings.dpi, 200);
}

#[test]
fn test_load_settings_for_job_defaults_when_absent() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let settings =
        load_settings_for_job(&dir.path().join("jobs.yaml")).expect("should default settings");
    assert_eq!(settings.dpi, 72);
    assert_eq!(settings.image_quality, 40);
}

#[test]
fn test_load_settings_for_job_relative_file_name() {
    // 親ディレクトリが空文字列でもエラーにならない
    let result = load_settings_for_job(Path::new("definitely_missing_jobs.yaml"));
    assert!(result.is_ok(), "got: {result:?}");
}

// ============================================================
// 2. ジョブファイル
// ============================================================

#[test]
fn test_job_file_all_kinds() {
    let yaml = r#"
jobs:
  - type: compress
    input: in.pdf
    output: out.pdf
    dpi: 100
    color_mode: monochrome
  - type: merge
    inputs: [a.pdf, b.pdf]
    output: merged.pdf
  - type: images
    inputs: [one.png, two.jpg]
    output: album.pdf
"#;
    let job_file: JobFile = serde_yml::from_str(yaml).expect("should parse job file");
    assert_eq!(job_file.jobs.len(), 3);

    match &job_file.jobs[0] {
        Job::Compress(job) => {
            assert_eq!(job.input, "in.pdf");
            assert_eq!(job.dpi, Some(100));
            assert_eq!(job.image_quality, None);
            assert_eq!(job.color_mode, Some(ColorMode::Monochrome));
        }
        other => panic!("expected compress job, got {other:?}"),
    }
    assert_eq!(job_file.jobs[1].inputs(), vec!["a.pdf", "b.pdf"]);
    assert_eq!(job_file.jobs[2].output(), "album.pdf");
}

#[test]
fn test_job_file_unknown_type_rejected() {
    let yaml = "jobs:\n  - type: split\n    input: a.pdf\n    output: b.pdf\n";
    let result: Result<JobFile, _> = serde_yml::from_str(yaml);
    assert!(result.is_err(), "unknown job type should not parse");
}

#[test]
fn test_merged_config_job_overrides_settings() {
    let settings = Settings {
        dpi: 150,
        image_quality: 60,
        color_mode: ColorMode::Grayscale,
        ..Settings::default()
    };
    let yaml = "jobs:\n  - type: compress\n    input: a.pdf\n    output: b.pdf\n    image_quality: 20\n";
    let job_file: JobFile = serde_yml::from_str(yaml).expect("should parse job file");
    let Job::Compress(job) = &job_file.jobs[0] else {
        panic!("expected compress job");
    };

    let merged = MergedConfig::new(&settings, job);
    assert_eq!(merged.dpi, 150);
    assert_eq!(merged.image_quality, 20);
    assert_eq!(merged.color_mode, ColorMode::Grayscale);
    assert_eq!(merged.timeout, Some(Duration::from_secs(300)));
}

// ============================================================
// 3. CompressionConfig の検証とクランプ
// ============================================================

#[test]
fn test_compression_config_bounds() {
    assert!(CompressionConfig::new(72, 1, ColorMode::NoChange).is_ok());
    assert!(CompressionConfig::new(300, 100, ColorMode::Monochrome).is_ok());

    for (dpi, quality) in [(71, 40), (301, 40), (72, 0), (72, 101)] {
        let result = CompressionConfig::new(dpi, quality, ColorMode::NoChange);
        assert!(
            matches!(result, Err(PdfCompressError::ConfigError(_))),
            "dpi={dpi} quality={quality} should be rejected, got: {result:?}"
        );
    }
}

#[test]
fn test_dpi_clamped_to_ceiling() {
    let config = CompressionConfig::new(300, 40, ColorMode::NoChange).expect("valid config");
    assert_eq!(config.effective_dpi(), 100);
    assert_eq!(render_zoom(300), render_zoom(100));
    assert!((render_zoom(100) - 100.0 / 72.0).abs() < 1e-6);
    assert!((render_zoom(72) - 1.0).abs() < 1e-6);
}

#[test]
fn test_jpeg_quality_clamped_to_ceiling() {
    assert_eq!(jpeg_quality(80), 50);
    assert_eq!(jpeg_quality(50), 50);
    assert_eq!(jpeg_quality(10), 10);
}

#[test]
fn test_scaled_dimension_letter_page() {
    assert_eq!(scaled_dimension(612), 428);
    assert_eq!(scaled_dimension(792), 554);
}

#[test]
fn test_color_mode_from_str() {
    assert_eq!("no-change".parse::<ColorMode>().ok(), Some(ColorMode::NoChange));
    assert_eq!("grayscale".parse::<ColorMode>().ok(), Some(ColorMode::Grayscale));
    assert_eq!("monochrome".parse::<ColorMode>().ok(), Some(ColorMode::Monochrome));

    let err = "color".parse::<ColorMode>().expect_err("should reject unknown mode");
    assert!(err.to_string().contains("no-change, grayscale, monochrome"));
    assert_eq!(ColorMode::Grayscale.to_string(), "grayscale");
}
