use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the process-wide tracing subscriber.
///
/// Honors `RUST_LOG`, falling back to `info`. Fails if a subscriber is
/// already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .compact();

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
