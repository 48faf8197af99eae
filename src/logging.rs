//! Tracing subscriber setup for the embedding application

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "turn_relay=info";

/// Install a JSON subscriber on stdout filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already set.
pub fn init_logging() -> Result<(), TryInitError> {
    init_logging_with(std::io::stdout)
}

fn init_logging_with<W>(make_writer: W) -> Result<(), TryInitError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(make_writer),
        )
        .try_init()
}
