//! Bounded-concurrency image validation backed by [`ImageCache`].
//!
//! One driver (the caller's task) owns every probe future through a
//! `FuturesUnordered`; a semaphore caps how many of them are past the gate at
//! once. Futures complete in arbitrary order, so the returned records are in
//! no particular order. Verdicts are written to the cache by the driver as
//! each probe completes.

use futures::{stream::FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::cache::ImageCache;
use super::probe::ImageProbe;
use crate::normalization::DatasetRecord;

pub const DEFAULT_CONCURRENCY: usize = 50;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PROGRESS_EVERY: usize = 50;

#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// Maximum number of probes outstanding at any moment.
    pub concurrency: usize,
    pub probe_timeout: Duration,
    /// Log a progress line every N completed probes.
    pub progress_every: usize,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    pub missing_image: usize,
    pub cache_hits: usize,
    /// Distinct URLs sent to the probe.
    pub probed: usize,
    pub probe_failures: usize,
    pub valid: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub records: Vec<DatasetRecord>,
    pub report: ValidationReport,
}

/// Keep the records whose image URL is reachable.
///
/// * no image reference: dropped, never probed
/// * URL already cached: kept or dropped per the cached verdict, never probed
/// * otherwise: each distinct URL is probed once; errors, non-success
///   statuses and timeouts are recorded as `false`
///
/// Output order is unspecified.
pub async fn validate_all<P>(
    records: Vec<DatasetRecord>,
    cache: &mut ImageCache,
    probe: &P,
    opts: &ValidatorOptions,
) -> ValidationOutcome
where
    P: ImageProbe + ?Sized,
{
    let started = Instant::now();
    let mut report = ValidationReport {
        total: records.len(),
        ..Default::default()
    };
    let mut valid: Vec<DatasetRecord> = Vec::with_capacity(records.len());
    let mut pending: HashMap<String, Vec<DatasetRecord>> = HashMap::new();

    for record in records {
        let Some(url) = record.image_url().map(str::to_owned) else {
            report.missing_image += 1;
            continue;
        };
        match cache.get(&url) {
            Some(verdict) => {
                report.cache_hits += 1;
                if verdict {
                    valid.push(record);
                }
            }
            None => pending.entry(url).or_default().push(record),
        }
    }

    report.probed = pending.len();
    if !pending.is_empty() {
        info!(
            urls = pending.len(),
            cache_hits = report.cache_hits,
            concurrency = opts.concurrency.max(1),
            "probing uncached image urls"
        );
    }

    let gate = Semaphore::new(opts.concurrency.max(1));
    let every = opts.progress_every.max(1);
    let total = pending.len();
    let mut futs = FuturesUnordered::new();
    for url in pending.keys().cloned() {
        let gate = &gate;
        futs.push(async move {
            let _permit = gate.acquire().await;
            let ok = match tokio::time::timeout(opts.probe_timeout, probe.probe(&url)).await {
                Ok(Ok(())) => true,
                Ok(Err(err)) => {
                    debug!(url = %url, error = %err, "image probe failed");
                    false
                }
                Err(_) => {
                    debug!(url = %url, timeout = ?opts.probe_timeout, "image probe timed out");
                    false
                }
            };
            (url, ok)
        });
    }

    let mut completed = 0usize;
    while let Some((url, ok)) = futs.next().await {
        completed += 1;
        let group = pending.remove(&url).unwrap_or_default();
        if ok {
            valid.extend(group);
        } else {
            report.probe_failures += 1;
        }
        cache.record(url, ok);
        if completed % every == 0 || completed == total {
            info!(completed, total, "image validation progress");
        }
    }

    report.valid = valid.len();
    info!(
        total = report.total,
        valid = report.valid,
        missing_image = report.missing_image,
        cache_hits = report.cache_hits,
        probed = report.probed,
        probe_failures = report.probe_failures,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "image validation finished"
    );
    ValidationOutcome {
        records: valid,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockProbe {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
        broken: HashSet<String>,
        hanging: HashSet<String>,
    }

    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl MockProbe {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageProbe for MockProbe {
        async fn probe(&self, url: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            let _guard = InFlight(&self.in_flight);
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if self.hanging.contains(url) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.broken.contains(url) {
                bail!("404 for {url}");
            }
            Ok(())
        }
    }

    fn record(id: &str, url: Option<&str>) -> DatasetRecord {
        DatasetRecord {
            set_num: Some(id.to_string()),
            img_url: url.map(str::to_string),
            ..Default::default()
        }
    }

    fn ids(records: &[DatasetRecord]) -> Vec<String> {
        let mut out: Vec<String> = records
            .iter()
            .filter_map(|r| r.identifier().map(str::to_string))
            .collect();
        out.sort();
        out
    }

    #[tokio::test]
    async fn record_without_image_is_dropped_without_probe() {
        let probe = MockProbe::default();
        let mut cache = ImageCache::new();
        let out = validate_all(
            vec![record("1-1", None), record("2-1", Some("  "))],
            &mut cache,
            &probe,
            &ValidatorOptions::default(),
        )
        .await;
        assert!(out.records.is_empty());
        assert_eq!(out.report.missing_image, 2);
        assert_eq!(probe.calls(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn cached_false_is_dropped_without_probe() {
        let probe = MockProbe::default();
        let mut cache = ImageCache::new();
        cache.record("https://img/bad.jpg", false);
        cache.record("https://img/good.jpg", true);
        let out = validate_all(
            vec![
                record("1-1", Some("https://img/bad.jpg")),
                record("2-1", Some("https://img/good.jpg")),
            ],
            &mut cache,
            &probe,
            &ValidatorOptions::default(),
        )
        .await;
        assert_eq!(ids(&out.records), vec!["2-1"]);
        assert_eq!(out.report.cache_hits, 2);
        assert_eq!(probe.calls(), 0);
    }

    #[tokio::test]
    async fn failures_are_isolated_and_cached_false() {
        let mut probe = MockProbe::default();
        probe.broken.insert("https://img/404.jpg".into());
        let mut cache = ImageCache::new();
        let out = validate_all(
            vec![
                record("1-1", Some("https://img/ok.jpg")),
                record("2-1", Some("https://img/404.jpg")),
                record("3-1", Some("https://img/ok2.jpg")),
            ],
            &mut cache,
            &probe,
            &ValidatorOptions::default(),
        )
        .await;
        assert_eq!(ids(&out.records), vec!["1-1", "3-1"]);
        assert_eq!(out.report.probe_failures, 1);
        assert_eq!(cache.get("https://img/404.jpg"), Some(false));
        assert_eq!(cache.get("https://img/ok.jpg"), Some(true));
    }

    #[tokio::test]
    async fn timeout_counts_as_invalid() {
        let mut probe = MockProbe::default();
        probe.hanging.insert("https://img/slow.jpg".into());
        let mut cache = ImageCache::new();
        let opts = ValidatorOptions {
            probe_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let out = validate_all(
            vec![
                record("1-1", Some("https://img/slow.jpg")),
                record("2-1", Some("https://img/fast.jpg")),
            ],
            &mut cache,
            &probe,
            &opts,
        )
        .await;
        assert_eq!(ids(&out.records), vec!["2-1"]);
        assert_eq!(cache.get("https://img/slow.jpg"), Some(false));
    }

    #[tokio::test]
    async fn shared_url_is_probed_once() {
        let probe = MockProbe::default();
        let mut cache = ImageCache::new();
        let out = validate_all(
            vec![
                record("1-1", Some("https://img/shared.jpg")),
                record("2-1", Some("https://img/shared.jpg")),
                record("3-1", Some("https://img/shared.jpg")),
            ],
            &mut cache,
            &probe,
            &ValidatorOptions::default(),
        )
        .await;
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.report.probed, 1);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn outstanding_probes_never_exceed_limit() {
        let probe = MockProbe::with_delay(Duration::from_millis(10));
        let mut cache = ImageCache::new();
        let records: Vec<_> = (0..40)
            .map(|i| record(&format!("{i}-1"), Some(format!("https://img/{i}.jpg").as_str())))
            .collect();
        let opts = ValidatorOptions {
            concurrency: 4,
            progress_every: 10,
            ..Default::default()
        };
        let out = validate_all(records, &mut cache, &probe, &opts).await;
        assert_eq!(out.records.len(), 40);
        assert_eq!(probe.calls(), 40);
        let peak = probe.max_in_flight.load(Ordering::SeqCst);
        assert_eq!(peak, 4, "gate should fill to exactly the limit");
    }

    #[tokio::test]
    async fn second_run_on_populated_cache_issues_no_probes() {
        let mut probe = MockProbe::default();
        probe.broken.insert("https://img/2.jpg".into());
        let mut cache = ImageCache::new();
        let input = vec![
            record("1-1", Some("https://img/1.jpg")),
            record("2-1", Some("https://img/2.jpg")),
            record("3-1", None),
        ];

        let opts = ValidatorOptions::default();
        let first = validate_all(input.clone(), &mut cache, &probe, &opts).await;
        let calls_after_first = probe.calls();
        let second = validate_all(input, &mut cache, &probe, &opts).await;

        assert_eq!(probe.calls(), calls_after_first);
        assert_eq!(second.report.probed, 0);
        assert_eq!(ids(&first.records), ids(&second.records));
        assert_eq!(ids(&second.records), vec!["1-1"]);
    }
}
