//! Tracing initialization for tests and binaries.
//!
//! Mirrors the teacher crate's centralized, environment-filtered setup
//! so both the library's unit tests and the `sofi-frontend` binary log
//! the same way.

#[cfg(test)]
use once_cell::sync::Lazy;

/// Initialize tracing for tests with environment-based filtering.
///
/// `RUST_LOG=sofi_core=debug` enables all debug output;
/// `RUST_LOG=sofi_core::calibrator=trace` scopes it to one module.
/// Safe to call from every test (idempotent via `once_cell`).
#[cfg(test)]
pub fn init_test_tracing() {
    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sofi_core=warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .with_test_writer()
            .init();
    });

    Lazy::force(&TRACING);
}

/// Initialize tracing for the `sofi-frontend` binary. Call once at the
/// start of `main`.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sofi_core=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();
}
