use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use thiserror::Error;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

static METRIC_DESCRIPTIONS: Once = Once::new();

#[derive(Debug, Error)]
#[error("telemetry initialization failed: {0}")]
pub struct TelemetryError(String);

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), TelemetryError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| TelemetryError(format!("failed to install tracing subscriber: {err}")))
}

/// Register descriptions for every metric the crate emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "libris_cache_hit_total",
            Unit::Count,
            "Subscriptions served without issuing a request."
        );
        describe_counter!(
            "libris_cache_miss_total",
            Unit::Count,
            "Subscriptions that started a request."
        );
        describe_counter!(
            "libris_cache_evict_total",
            Unit::Count,
            "Cache entries evicted after their last subscriber left."
        );
        describe_counter!(
            "libris_cache_lock_recovered_total",
            Unit::Count,
            "Cache map locks recovered after a task panicked while holding them."
        );
        describe_counter!(
            "libris_mutation_failed_total",
            Unit::Count,
            "Mutations rejected by the server or lost in transport."
        );
        describe_histogram!(
            "libris_mutation_ms",
            Unit::Milliseconds,
            "Mutation round-trip latency in milliseconds."
        );
    });
}
