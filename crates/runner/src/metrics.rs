//! Prometheus metrics export.
//!
//! The runner is a one-shot job, so instead of serving `/metrics` it can
//! write the text exposition to a file for a textfile collector to pick up.

use std::io::Write;
use std::path::Path;

use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    if let Err(e) = mediadrop_core::metrics::register_all(&registry) {
        warn!(error = %e, "Failed to register core metrics");
    }
    registry
});

/// Encode all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Writes the metrics to `path`, replacing it atomically.
pub fn write_textfile(path: &Path) -> std::io::Result<()> {
    let text = encode_metrics().map_err(std::io::Error::other)?;

    let tmp = path.with_extension("prom.tmp");
    let mut file = std::fs::File::create(&tmp)?;
    file.write_all(text.as_bytes())?;
    file.sync_all()?;
    std::fs::rename(&tmp, path)
}
