//! # sucupira-telemetry
//!
//! Logging setup for Sucupira binaries and an in-memory trace recorder for
//! inspecting crew runs.
//!
//! Every `init_*` function reads `RUST_LOG` when set and is safe to call more
//! than once: only the first call installs a global subscriber.
//!
//! ```rust,ignore
//! sucupira_telemetry::init_telemetry("journal-crew");
//! tracing::info!(topic = "medicina", "starting run");
//! ```

mod memory;

pub use memory::{RUN_ID_FIELD, RunTraceLayer, RunTraceStore, SpanRecord};

use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Human-readable logs at `info` unless `RUST_LOG` says otherwise.
pub fn init_telemetry(service_name: &str) {
    init_with_level(service_name, "info");
}

/// Human-readable logs with `level` as the default filter directive.
pub fn init_with_level(service_name: &str, level: &str) {
    let installed = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(service = service_name, "telemetry initialized");
    }
}

/// One JSON object per line, for log collectors.
pub fn init_json_telemetry(service_name: &str) {
    let installed = tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(fmt::layer().json().with_current_span(true).with_span_list(true))
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(service = service_name, "json telemetry initialized");
    }
}

/// Human-readable logs plus span capture into `store`.
pub fn init_with_recorder(service_name: &str, store: RunTraceStore) {
    let installed = tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(fmt::layer().with_target(true))
        .with(RunTraceLayer::new(store))
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(service = service_name, "telemetry initialized with run recorder");
    }
}

/// A subscriber that only records spans into `store`.
///
/// Meant for `tracing::subscriber::set_default` in tests, where installing a
/// global subscriber would leak between cases.
pub fn recording_subscriber(store: RunTraceStore) -> impl Subscriber + Send + Sync {
    tracing_subscriber::registry().with(RunTraceLayer::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_telemetry("test");
        init_with_level("test", "debug");
        init_json_telemetry("test");
    }
}
