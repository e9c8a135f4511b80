//! Diagnostics for the logger itself
//!
//! Storage failures, rotations and worker lifecycle are reported as `tracing`
//! events, separate from the records the logger writes.

/// Install a compact `tracing` subscriber on stderr
///
/// Call early in main() before any logger is built.
/// Set `verbose` to true for debug-level output; `RUST_LOG` is not consulted.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "warn" };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::new(level))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(true);
        init_tracing(false);
        tracing::debug!("diagnostics initialized");
    }
}
