use std::time::Duration;

use super::compression::{ColorMode, CompressionConfig};
use super::job::CompressJob;
use super::settings::Settings;

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub dpi: u32,
    pub image_quality: u8,
    pub color_mode: ColorMode,
    pub parallel_workers: usize,
    pub timeout: Option<Duration>,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &CompressJob) -> Self {
        MergedConfig {
            dpi: job.dpi.unwrap_or(settings.dpi),
            image_quality: job.image_quality.unwrap_or(settings.image_quality),
            color_mode: job.color_mode.unwrap_or(settings.color_mode),
            parallel_workers: settings.parallel_workers,
            timeout: settings.process_timeout(),
        }
    }

    /// 範囲検証を通した [`CompressionConfig`] を返す。
    pub fn compression_config(&self) -> crate::error::Result<CompressionConfig> {
        CompressionConfig::new(self.dpi, self.image_quality, self.color_mode)
    }
}
