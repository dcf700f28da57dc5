//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Filter directives used when `RUST_LOG` is unset
pub fn default_directives(default_level: &str) -> String {
    format!("vexaroute={},tower_http=debug", default_level)
}

/// Initialize tracing subscriber for structured logging
///
/// Only the first call per process takes effect. `RUST_LOG` overrides
/// `default_level` when set.
///
/// # Examples
///
/// ```no_run
/// vexaroute::telemetry::init("info");
/// tracing::info!("Application started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_scope_crate_level() {
        assert_eq!(default_directives("warn"), "vexaroute=warn,tower_http=debug");
        assert!(EnvFilter::try_new(default_directives("debug")).is_ok());
    }
}
