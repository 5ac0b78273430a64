//! `tracing` setup for the `railfence` binary.
//!
//! Ciphertext, counts and verdicts go to stdout; diagnostics go to stderr so
//! that `railfence encode | railfence decode` pipes never see log lines.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides the `warn` default,
/// e.g. `RUST_LOG=railfence_cli::breach=debug` to trace range queries.
pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .without_time()
                .compact(),
        )
        .init();
}
