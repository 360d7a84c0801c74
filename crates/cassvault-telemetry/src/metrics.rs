//! Prometheus-backed pipeline metrics.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Rendered output is written as a node-exporter textfile; there is no
//!   long-running process to scrape.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::error::{Result, TelemetryError};

/// Prometheus registry shared by the pipelines of one invocation.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    pipeline_steps_total: IntCounterVec,
    pipeline_runs_total: IntCounterVec,
    archive_bytes: IntGauge,
    last_success_timestamp_seconds: IntGaugeVec,
}

impl Metrics {
    /// Construct a registry with the pipeline collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("cassvault".to_string()), None)
            .map_err(|source| TelemetryError::registry("registry", "build", source))?;

        let pipeline_steps_total = IntCounterVec::new(
            Opts::new(
                "pipeline_steps_total",
                "Backup/restore pipeline steps by status",
            ),
            &["pipeline", "step", "status"],
        )
        .map_err(|source| TelemetryError::registry("pipeline_steps_total", "build", source))?;
        let pipeline_runs_total = IntCounterVec::new(
            Opts::new("pipeline_runs_total", "Pipeline invocations by outcome"),
            &["pipeline", "outcome"],
        )
        .map_err(|source| TelemetryError::registry("pipeline_runs_total", "build", source))?;
        let archive_bytes = IntGauge::with_opts(Opts::new(
            "archive_bytes",
            "Size of the most recently written backup archive",
        ))
        .map_err(|source| TelemetryError::registry("archive_bytes", "build", source))?;
        let last_success_timestamp_seconds = IntGaugeVec::new(
            Opts::new(
                "last_success_timestamp_seconds",
                "Unix time of the last successful pipeline run",
            ),
            &["pipeline"],
        )
        .map_err(|source| {
            TelemetryError::registry("last_success_timestamp_seconds", "build", source)
        })?;

        registry
            .register(Box::new(pipeline_steps_total.clone()))
            .map_err(|source| {
                TelemetryError::registry("pipeline_steps_total", "register", source)
            })?;
        registry
            .register(Box::new(pipeline_runs_total.clone()))
            .map_err(|source| TelemetryError::registry("pipeline_runs_total", "register", source))?;
        registry
            .register(Box::new(archive_bytes.clone()))
            .map_err(|source| TelemetryError::registry("archive_bytes", "register", source))?;
        registry
            .register(Box::new(last_success_timestamp_seconds.clone()))
            .map_err(|source| {
                TelemetryError::registry("last_success_timestamp_seconds", "register", source)
            })?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                pipeline_steps_total,
                pipeline_runs_total,
                archive_bytes,
                last_success_timestamp_seconds,
            }),
        })
    }

    /// Count a pipeline step transition.
    pub fn inc_pipeline_step(&self, pipeline: &str, step: &str, status: &str) {
        self.inner
            .pipeline_steps_total
            .with_label_values(&[pipeline, step, status])
            .inc();
    }

    /// Count a finished pipeline run; successes also stamp the success gauge.
    pub fn record_run(&self, pipeline: &str, succeeded: bool) {
        let outcome = if succeeded { "success" } else { "failure" };
        self.inner
            .pipeline_runs_total
            .with_label_values(&[pipeline, outcome])
            .inc();
        if succeeded {
            self.inner
                .last_success_timestamp_seconds
                .with_label_values(&[pipeline])
                .set(unix_now());
        }
    }

    /// Record the size of the archive written by the last backup.
    pub fn set_archive_bytes(&self, bytes: u64) {
        self.inner
            .archive_bytes
            .set(i64::try_from(bytes).unwrap_or(i64::MAX));
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or are not UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Write the rendered metrics to `path`, replacing it atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or the file cannot be written.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        let staging = path.with_extension("prom.tmp");
        fs::write(&staging, rendered).map_err(|source| TelemetryError::MetricsWrite {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, path).map_err(|source| TelemetryError::MetricsWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}
