//! Run configuration resolved from CLI overrides, environment and defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::datasets::{DatasetKind, DEFAULT_BASE_URL};
use crate::media::validator::{DEFAULT_CONCURRENCY, DEFAULT_PROGRESS_EVERY};
use crate::media::{ValidatorOptions, CACHE_FILE_NAME};
use crate::normalization::DEFAULT_PARENT_DEPTH;
use crate::util::env::{env_flag, env_opt, env_parse, log_snapshot};

pub const DATA_DIR_ENV: &str = "BRICK_DATA_DIR";
pub const CACHE_PATH_ENV: &str = "BRICK_CACHE_PATH";
pub const WORK_DIR_ENV: &str = "BRICK_WORK_DIR";
pub const BASE_URL_ENV: &str = "BRICK_BASE_URL";
pub const SOURCE_DIR_ENV: &str = "BRICK_SOURCE_DIR";
pub const VALIDATE_ENV: &str = "BRICK_VALIDATE_IMAGES";
pub const CONCURRENCY_ENV: &str = "BRICK_PROBE_CONCURRENCY";
pub const TIMEOUT_ENV: &str = "BRICK_PROBE_TIMEOUT_SECS";
pub const PROGRESS_ENV: &str = "BRICK_PROGRESS_EVERY";
pub const PARENT_DEPTH_ENV: &str = "BRICK_PARENT_DEPTH";

const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub cache_path: PathBuf,
    /// Directory that receives `temp_<dataset>.zip` downloads.
    pub work_dir: PathBuf,
    pub base_url: String,
    /// Read archives from here instead of downloading them.
    pub source_dir: Option<PathBuf>,
    pub datasets: Vec<DatasetKind>,
    pub validate_images: bool,
    pub parent_depth: usize,
    pub validator: ValidatorOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            cache_path: data_dir.join(CACHE_FILE_NAME),
            data_dir,
            work_dir: PathBuf::from("."),
            base_url: DEFAULT_BASE_URL.to_string(),
            source_dir: None,
            datasets: DatasetKind::OUTPUTS.to_vec(),
            validate_images: true,
            parent_depth: DEFAULT_PARENT_DEPTH,
            validator: ValidatorOptions::default(),
        }
    }
}

/// Optional per-invocation overrides (typically CLI flags). `None` falls back
/// to the environment, then to the default.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub source_dir: Option<PathBuf>,
    pub datasets: Vec<DatasetKind>,
    pub no_validate: bool,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub progress_every: Option<usize>,
    pub parent_depth: Option<usize>,
}

impl PipelineConfig {
    pub fn resolve(o: Overrides) -> Self {
        let defaults = Self::default();
        let data_dir = o
            .data_dir
            .or_else(|| env_opt(DATA_DIR_ENV).map(PathBuf::from))
            .unwrap_or(defaults.data_dir);
        let cache_path = o
            .cache_path
            .or_else(|| env_opt(CACHE_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| data_dir.join(CACHE_FILE_NAME));
        let work_dir = o
            .work_dir
            .or_else(|| env_opt(WORK_DIR_ENV).map(PathBuf::from))
            .unwrap_or(defaults.work_dir);
        let base_url = o
            .base_url
            .or_else(|| env_opt(BASE_URL_ENV))
            .unwrap_or(defaults.base_url);
        let source_dir = o
            .source_dir
            .or_else(|| env_opt(SOURCE_DIR_ENV).map(PathBuf::from));
        let datasets = if o.datasets.is_empty() {
            defaults.datasets
        } else {
            o.datasets
                .into_iter()
                .filter(|k| *k != DatasetKind::Themes)
                .collect()
        };
        let validate_images = !o.no_validate && env_flag(VALIDATE_ENV, true);
        let concurrency = o
            .concurrency
            .unwrap_or_else(|| env_parse(CONCURRENCY_ENV, DEFAULT_CONCURRENCY))
            .max(1);
        let timeout_secs = o
            .timeout_secs
            .unwrap_or_else(|| env_parse(TIMEOUT_ENV, DEFAULT_TIMEOUT_SECS))
            .max(1);
        let progress_every = o
            .progress_every
            .unwrap_or_else(|| env_parse(PROGRESS_ENV, DEFAULT_PROGRESS_EVERY))
            .max(1);
        let parent_depth = o
            .parent_depth
            .unwrap_or_else(|| env_parse(PARENT_DEPTH_ENV, DEFAULT_PARENT_DEPTH))
            .max(1);

        Self {
            data_dir,
            cache_path,
            work_dir,
            base_url,
            source_dir,
            datasets,
            validate_images,
            parent_depth,
            validator: ValidatorOptions {
                concurrency,
                probe_timeout: Duration::from_secs(timeout_secs),
                progress_every,
            },
        }
    }

    pub fn log_summary(&self) {
        log_snapshot("brick-sync", &self.snapshot());
    }

    /// Resolved settings keyed by the env var that controls each one.
    fn snapshot(&self) -> Vec<(&'static str, String)> {
        let datasets: Vec<&str> = self.datasets.iter().map(|k| k.name()).collect();
        vec![
            (DATA_DIR_ENV, self.data_dir.display().to_string()),
            (CACHE_PATH_ENV, self.cache_path.display().to_string()),
            (WORK_DIR_ENV, self.work_dir.display().to_string()),
            (BASE_URL_ENV, self.base_url.clone()),
            (
                SOURCE_DIR_ENV,
                self.source_dir
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
            ("datasets", datasets.join(",")),
            (VALIDATE_ENV, self.validate_images.to_string()),
            (CONCURRENCY_ENV, self.validator.concurrency.to_string()),
            (
                TIMEOUT_ENV,
                self.validator.probe_timeout.as_secs().to_string(),
            ),
            (PROGRESS_ENV, self.validator.progress_every.to_string()),
            (PARENT_DEPTH_ENV, self.parent_depth.to_string()),
        ]
    }
}
