use serde::Deserialize;

use super::compression::ColorMode;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

/// ジョブ1件。`type` キーで種類を選ぶ。
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    Compress(CompressJob),
    Merge(MergeJob),
    Images(ImagesJob),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompressJob {
    pub input: String,
    pub output: String,
    pub dpi: Option<u32>,
    pub image_quality: Option<u8>,
    pub color_mode: Option<ColorMode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeJob {
    pub inputs: Vec<String>,
    pub output: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagesJob {
    pub inputs: Vec<String>,
    pub output: String,
}

impl Job {
    pub fn output(&self) -> &str {
        match self {
            Job::Compress(job) => &job.output,
            Job::Merge(job) => &job.output,
            Job::Images(job) => &job.output,
        }
    }

    /// 入力パス（文字列のまま）を列挙する。
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Job::Compress(job) => vec![job.input.as_str()],
            Job::Merge(job) => job.inputs.iter().map(String::as_str).collect(),
            Job::Images(job) => job.inputs.iter().map(String::as_str).collect(),
        }
    }
}
