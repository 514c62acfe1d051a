use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info,campus_events=debug,hyper=info,h2=info,tokio=info";

fn env_filter(default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives.into())
}

/// Installs the global subscriber printing to stdout. Call once at the start of a binary.
pub fn setup_telemetry() {
    setup_telemetry_with(DEFAULT_LOG_LEVEL);
}

pub fn setup_telemetry_with(default_directives: &str) {
    let stdout_log = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(stdout_log.with_filter(env_filter(default_directives)))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_LEVEL).is_ok());
    }
}
