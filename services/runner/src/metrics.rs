//! Prometheus metrics for a batch run
//!
//! Counters are emitted by the orchestrator while accounts run:
//!
//! - `accounts_outcome_total` (counter): label `outcome`
//! - `task_attempts_total` (counter): labels `task`, `result`
//!
//! At the end of the run the final statistics are set as gauges
//! (`run_accounts{bucket}`) and the rendered exposition can be written to a
//! file for a textfile collector.

use std::io;
use std::path::Path;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use orchestrator::StatsSnapshot;

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Publish the final counters of a run as gauges.
pub fn record_summary(stats: &StatsSnapshot, mode: &str) {
    let buckets = [
        ("total", stats.total),
        ("processed", stats.processed),
        ("success", stats.success),
        ("failed", stats.failed),
        ("locked", stats.locked),
        ("suspended", stats.suspended),
    ];
    for (bucket, value) in buckets {
        metrics::gauge!("run_accounts", "bucket" => bucket, "mode" => mode.to_string())
            .set(value as f64);
    }
}

/// Write the rendered exposition to `path` via a temp file and rename.
pub fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> io::Result<()> {
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    std::fs::write(&tmp, handle.render())?;
    std::fs::rename(&tmp, path)
}
