//! Tracing subscriber setup.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AppConfig, LogFormat};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `app.log_level`.
pub fn init(app: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&app.log_level))
        .map_err(|e| anyhow!("Invalid log level {:?}: {e}", app.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = match app.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stdout),
            )
            .try_init(),
    };

    result.map_err(|e| anyhow!("Failed to install log subscriber: {e}"))
}
