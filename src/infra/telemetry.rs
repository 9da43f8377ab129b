use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so that command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "tessera_page_build_total",
            Unit::Count,
            "Total number of page builds that reached the finalized state."
        );
        describe_counter!(
            "tessera_page_cache_hit_total",
            Unit::Count,
            "Total number of page renders served from the page shell cache entry."
        );
        describe_counter!(
            "tessera_block_cache_hit_total",
            Unit::Count,
            "Total number of block builds skipped because of a cache hit."
        );
        describe_counter!(
            "tessera_block_denied_total",
            Unit::Count,
            "Total number of blocks left out of a page by an access decision."
        );
        describe_counter!(
            "tessera_block_empty_total",
            Unit::Count,
            "Total number of blocks that rendered no content."
        );
        describe_histogram!(
            "tessera_page_compose_ms",
            Unit::Milliseconds,
            "Page composition latency in milliseconds."
        );
    });
}
