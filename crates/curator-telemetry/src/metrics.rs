//! Prometheus-backed metrics registry for checker runs.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - A run is short-lived, so metrics are exported as a node-exporter textfile
//!   written once at the end instead of being scraped.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across one run.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    requests_listed_total: IntCounter,
    requests_skipped_total: IntCounter,
    submissions_completed_total: IntCounter,
    submissions_incomplete_total: IntCounterVec,
    files_downloaded_total: IntCounter,
    download_failures_total: IntCounterVec,
    file_checks_total: IntCounterVec,
    processed_set_size: IntGauge,
}

/// Snapshot of the run counters, used for the end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Requests returned by the listing call.
    pub requests_listed_total: u64,
    /// Requests skipped because they were already processed.
    pub requests_skipped_total: u64,
    /// Submissions processed to completion and marked.
    pub submissions_completed_total: u64,
    /// Files written to scratch storage.
    pub files_downloaded_total: u64,
    /// Size of the processed set after the last update.
    pub processed_set_size: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests_listed_total = counter(
            "curator_requests_listed_total",
            "Inclusion requests returned by the listing call",
        )?;
        let requests_skipped_total = counter(
            "curator_requests_skipped_total",
            "Inclusion requests skipped because they were already processed",
        )?;
        let submissions_completed_total = counter(
            "curator_submissions_completed_total",
            "Submissions processed to completion",
        )?;
        let submissions_incomplete_total = counter_vec(
            "curator_submissions_incomplete_total",
            "Submissions that could not be processed, by reason",
            &["reason"],
        )?;
        let files_downloaded_total = counter(
            "curator_files_downloaded_total",
            "Files downloaded into scratch storage",
        )?;
        let download_failures_total = counter_vec(
            "curator_download_failures_total",
            "File downloads that failed, by kind",
            &["kind"],
        )?;
        let file_checks_total = counter_vec(
            "curator_file_checks_total",
            "Local file checks by verdict",
            &["verdict"],
        )?;
        let processed_set_size = IntGauge::with_opts(Opts::new(
            "curator_processed_set_size",
            "Number of identifiers in the processed set",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "curator_processed_set_size",
            source,
        })?;

        register(&registry, "curator_requests_listed_total", &requests_listed_total)?;
        register(&registry, "curator_requests_skipped_total", &requests_skipped_total)?;
        register(
            &registry,
            "curator_submissions_completed_total",
            &submissions_completed_total,
        )?;
        register(
            &registry,
            "curator_submissions_incomplete_total",
            &submissions_incomplete_total,
        )?;
        register(&registry, "curator_files_downloaded_total", &files_downloaded_total)?;
        register(
            &registry,
            "curator_download_failures_total",
            &download_failures_total,
        )?;
        register(&registry, "curator_file_checks_total", &file_checks_total)?;
        register(&registry, "curator_processed_set_size", &processed_set_size)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                requests_listed_total,
                requests_skipped_total,
                submissions_completed_total,
                submissions_incomplete_total,
                files_downloaded_total,
                download_failures_total,
                file_checks_total,
                processed_set_size,
            }),
        })
    }

    /// Record the number of requests returned by the listing call.
    pub fn inc_requests_listed(&self, count: u64) {
        self.inner.requests_listed_total.inc_by(count);
    }

    /// Record one request skipped as already processed.
    pub fn inc_request_skipped(&self) {
        self.inner.requests_skipped_total.inc();
    }

    /// Record one submission processed to completion.
    pub fn inc_submission_completed(&self) {
        self.inner.submissions_completed_total.inc();
    }

    /// Record one submission left unprocessed for `reason`.
    pub fn inc_submission_incomplete(&self, reason: &str) {
        self.inner
            .submissions_incomplete_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record one file written to scratch storage.
    pub fn inc_file_downloaded(&self) {
        self.inner.files_downloaded_total.inc();
    }

    /// Record one failed download of the given kind.
    pub fn inc_download_failure(&self, kind: &str) {
        self.inner
            .download_failures_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Record the verdict of one local file check.
    pub fn inc_file_check(&self, passed: bool) {
        let verdict = if passed { "passed" } else { "failed" };
        self.inner
            .file_checks_total
            .with_label_values(&[verdict])
            .inc();
    }

    /// Set the processed-set size gauge.
    pub fn set_processed_set_size(&self, size: usize) {
        self.inner
            .processed_set_size
            .set(i64::try_from(size).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Render the registry and replace `path` with the result.
    ///
    /// The text is written to a sibling temporary file first and renamed into
    /// place, so collectors never observe a half-written file.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or the file cannot be written.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        let staging = path.with_extension("prom.tmp");
        let write_err = |source| TelemetryError::MetricsWrite {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&staging, rendered).map_err(write_err)?;
        fs::rename(&staging, path).map_err(|source| {
            let _ = fs::remove_file(&staging);
            write_err(source)
        })
    }

    /// Take a point-in-time snapshot of the run counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_listed_total: self.inner.requests_listed_total.get(),
            requests_skipped_total: self.inner.requests_skipped_total.get(),
            submissions_completed_total: self.inner.submissions_completed_total.get(),
            files_downloaded_total: self.inner.files_downloaded_total.get(),
            processed_set_size: self.inner.processed_set_size.get(),
        }
    }
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_requests_listed(3);
        metrics.inc_request_skipped();
        metrics.inc_submission_completed();
        metrics.inc_submission_incomplete("no_files");
        metrics.inc_file_downloaded();
        metrics.inc_file_downloaded();
        metrics.inc_download_failure("status");
        metrics.inc_file_check(true);
        metrics.inc_file_check(false);
        metrics.set_processed_set_size(7);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_listed_total, 3);
        assert_eq!(snapshot.requests_skipped_total, 1);
        assert_eq!(snapshot.submissions_completed_total, 1);
        assert_eq!(snapshot.files_downloaded_total, 2);
        assert_eq!(snapshot.processed_set_size, 7);

        let rendered = metrics.render()?;
        assert!(rendered.contains("curator_submissions_incomplete_total{reason=\"no_files\"} 1"));
        assert!(rendered.contains("curator_download_failures_total{kind=\"status\"} 1"));
        assert!(rendered.contains("curator_file_checks_total{verdict=\"failed\"} 1"));
        Ok(())
    }

    #[test]
    fn textfile_is_replaced_atomically() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("curator.prom");
        fs::write(&path, "stale")?;

        let metrics = Metrics::new()?;
        metrics.inc_submission_completed();
        metrics.write_textfile(&path)?;

        let written = fs::read_to_string(&path)?;
        assert!(written.contains("curator_submissions_completed_total 1"));
        assert!(!dir.path().join("curator.prom.tmp").exists());
        Ok(())
    }

    #[test]
    fn textfile_write_reports_missing_directory() -> Result<()> {
        let metrics = Metrics::new()?;
        let err = metrics
            .write_textfile(Path::new("/definitely/missing/dir/curator.prom"))
            .err();
        assert!(matches!(err, Some(TelemetryError::MetricsWrite { .. })));
        Ok(())
    }
}
