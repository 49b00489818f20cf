use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::compression::ColorMode;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dpi: u32,
    pub image_quality: u8,
    pub color_mode: ColorMode,
    pub parallel_workers: usize,
    pub max_file_size_mb: u64,
    pub max_files_per_job: usize,
    pub process_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            dpi: 72,
            image_quality: 40,
            color_mode: ColorMode::NoChange,
            parallel_workers: 0,
            max_file_size_mb: 100,
            max_files_per_job: 50,
            process_timeout_seconds: 300,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::PdfCompressError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// `process_timeout_seconds: 0` は期限なし。
    pub fn process_timeout(&self) -> Option<Duration> {
        (self.process_timeout_seconds > 0).then(|| Duration::from_secs(self.process_timeout_seconds))
    }
}
