use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Ensure initialization happens only once
static INIT: Once = Once::new();

/// Initialize the logging system with sensible defaults.
///
/// Log level can be set using the RUST_LOG environment variable.
/// Example: RUST_LOG=debug,oracle_gateway=trace
pub fn init() {
    init_with_default("info");
}

/// Same as [`init`] but with a caller-chosen filter when RUST_LOG is unset.
pub fn init_with_default(default_filter: &str) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

        // Logs go to stderr so binaries can keep stdout for their output
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .init();

        tracing::info!("Logging initialized");
    });
}

/// Macro for logging admission decisions
#[macro_export]
macro_rules! rate_limit_event {
    ($tier:expr, $caller:expr, $allowed:expr, $limit:expr, $window_ms:expr) => {
        tracing::info!(
            tier = $tier,
            caller = $caller,
            allowed = $allowed,
            limit = $limit,
            window_ms = $window_ms,
            "Rate limit check"
        )
    };
}

/// Macro for logging one provider attempt with timing
#[macro_export]
macro_rules! provider_attempt {
    ($provider:expr, $result:expr, $elapsed_ms:expr) => {
        tracing::debug!(
            provider = $provider,
            success = $result.is_ok(),
            elapsed_ms = $elapsed_ms,
            "Provider attempt"
        )
    };
}
