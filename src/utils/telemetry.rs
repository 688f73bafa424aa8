//! Logging Setup
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` wins over the
//! default directive when set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

pub const DEFAULT_DIRECTIVE: &str = "signal_irrigation=info";

pub fn build_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Initialise logging to stderr. Safe to call more than once; later calls
/// are no-ops and return `false`.
pub fn init_tracing(default_directive: &str) -> bool {
    Registry::default()
        .with(build_filter(default_directive))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        let _ = init_tracing(DEFAULT_DIRECTIVE);
        assert!(!init_tracing(DEFAULT_DIRECTIVE));
    }
}
