use {
    super::*,
    tracing_appender::non_blocking::{NonBlocking, WorkerGuard},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

const DEFAULT_FILTER: &str = "warn,yamuna=info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn writer() -> (NonBlocking, WorkerGuard) {
    tracing_appender::non_blocking(io::stderr())
}

/// Installs the global subscriber. Log lines are flushed until the returned guard is dropped.
pub(crate) fn init() -> WorkerGuard {
    let (writer, guard) = writer();

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().with_target(false).with_writer(writer))
        .init();

    guard
}
