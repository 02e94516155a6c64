use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Filter applied when `RUST_LOG` is unset. sqlx logs every statement at info.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,actix_web=info";

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Returns an error when a subscriber
/// was already installed (tests, or a binary calling this twice).
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}

/// Common bootstrap for every binary: load `.env`, then install tracing with
/// [`DEFAULT_FILTER`] and log which binary started.
pub fn bootstrap(bin_name: &str) -> Result<(), anyhow::Error> {
    crate::util::env::init_env();
    init_tracing(DEFAULT_FILTER)?;
    ::tracing::info!(
        target = "bootstrap",
        bin = bin_name,
        version = env!("CARGO_PKG_VERSION"),
        "starting"
    );
    Ok(())
}
