//! Logging setup.
//!
//! Structured logging goes through `tracing`. Output is written to
//! **stderr** so it never mixes with anything the host reads from stdout.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `debug`,
//!   `notification_contact_provider=debug`)
//!
//! Rendered SQL is logged at `debug`. Set `log_sql` in the provider
//! configuration to see it at `info`.
//!
//! ```bash
//! RUST_LOG=notification_contact_provider=debug ./my-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, registry::Registry, EnvFilter, Layer};

fn stderr_layer<S>(default_level: &str) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(filter)
}

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG` and defaults to `info` when it is not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`], with `default_level` used when `RUST_LOG` is not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    Registry::default().with(stderr_layer(default_level)).init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Does not panic, which suits tests and embedders that may have set up
/// their own subscriber.
pub fn try_init_logging() -> bool {
    Registry::default()
        .with(stderr_layer("info"))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so only the
    // non-panicking entry point is exercised here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("notification_contact_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,notification_contact_provider::service=debug").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        try_init_logging();
        assert!(!try_init_logging());
    }
}
