//! End-to-end run: themes -> index, then each output dataset through
//! acquisition, enrichment, optional image validation, normalization and
//! the writers.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::datasets::acquire::{acquire, ArchiveSource};
use crate::datasets::extract::{load_records, load_themes};
use crate::datasets::DatasetKind;
use crate::media::{validate_all, HttpProbe, ImageCache, ImageProbe, ValidationReport};
use crate::normalization::{enrich, normalize, DatasetRecord, NormalizedRecord, ThemeIndex};
use crate::output::{save_json, save_txt};

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub dataset: DatasetKind,
    pub decoded: usize,
    pub written: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub themes: usize,
    pub datasets: Vec<DatasetSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_entries: Option<usize>,
}

/// Run the pipeline with the HTTP `HEAD` probe.
pub async fn run(config: &PipelineConfig) -> Result<RunSummary> {
    let probe = HttpProbe::new(config.validator.probe_timeout)?;
    run_with_probe(config, &probe).await
}

/// Run the pipeline with a caller-supplied probe.
///
/// The image cache is loaded once before the first dataset and saved once
/// after the last, including when a dataset fails; only verdicts from probes
/// that actually completed are ever recorded.
pub async fn run_with_probe<P>(config: &PipelineConfig, probe: &P) -> Result<RunSummary>
where
    P: ImageProbe + ?Sized,
{
    let started_at = Utc::now();
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;
    info!(data_dir = %config.data_dir.display(), "data directory ready");

    let source = archive_source(config)?;

    let themes = {
        let archive = acquire(&source, DatasetKind::Themes).await?;
        ThemeIndex::build(load_themes(archive.path())?)
    };
    info!(themes = themes.len(), "loaded themes");

    let mut cache = if config.validate_images {
        Some(ImageCache::load(&config.cache_path)?)
    } else {
        None
    };

    let mut datasets = Vec::with_capacity(config.datasets.len());
    let mut outcome: Result<()> = Ok(());
    for &kind in &config.datasets {
        match process_dataset(config, &source, kind, &themes, cache.as_mut(), probe).await {
            Ok(summary) => datasets.push(summary),
            Err(e) => {
                error!(dataset = %kind, error = ?e, "dataset processing failed");
                outcome = Err(e.context(format!("error processing {kind}")));
                break;
            }
        }
    }

    if let Some(cache) = &cache {
        if let Err(e) = cache.save(&config.cache_path) {
            warn!(path = %config.cache_path.display(), error = ?e, "failed to save image cache");
            if outcome.is_ok() {
                outcome = Err(e);
            }
        } else {
            info!(path = %config.cache_path.display(), entries = cache.len(), "image cache saved");
        }
    }
    outcome?;

    Ok(RunSummary {
        started_at,
        finished_at: Utc::now(),
        themes: themes.len(),
        datasets,
        cache_entries: cache.as_ref().map(ImageCache::len),
    })
}

fn archive_source(config: &PipelineConfig) -> Result<ArchiveSource> {
    if let Some(dir) = &config.source_dir {
        return Ok(ArchiveSource::Local { dir: dir.clone() });
    }
    let client = Client::builder()
        .user_agent(concat!("brick-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build download client")?;
    Ok(ArchiveSource::Remote {
        client,
        base_url: config.base_url.clone(),
        work_dir: config.work_dir.clone(),
    })
}

async fn process_dataset<P>(
    config: &PipelineConfig,
    source: &ArchiveSource,
    kind: DatasetKind,
    themes: &ThemeIndex,
    cache: Option<&mut ImageCache>,
    probe: &P,
) -> Result<DatasetSummary>
where
    P: ImageProbe + ?Sized,
{
    let mut records = {
        let archive = acquire(source, kind).await?;
        load_records(archive.path(), kind)?
    };
    let decoded = records.len();
    enrich(&mut records, themes, config.parent_depth);

    let validation = match cache {
        Some(cache) => {
            let outcome = validate_all(records, cache, probe, &config.validator).await;
            records = outcome.records;
            // Validation completes out of order; restore the file order.
            records.par_sort_by_cached_key(DatasetRecord::sort_key);
            Some(outcome.report)
        }
        None => None,
    };

    let normalized: Vec<NormalizedRecord> = records.iter().map(normalize).collect();
    write_outputs(&config.data_dir, kind, &normalized)?;

    Ok(DatasetSummary {
        dataset: kind,
        decoded,
        written: normalized.len(),
        validation,
    })
}

fn write_outputs(data_dir: &Path, kind: DatasetKind, records: &[NormalizedRecord]) -> Result<()> {
    save_json(records, &data_dir.join(format!("{}.json", kind.name())))?;
    save_txt(records, &data_dir.join(format!("{}.txt", kind.name())))?;
    Ok(())
}
