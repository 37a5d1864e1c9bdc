use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::cli::LogFormat;

pub const DEFAULT_LOG_FILTER: &str = "taskflow=debug,tower_http=info";

/// Installs the global subscriber. `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`].
/// Records emitted through the `log` crate are forwarded as well.
pub fn init_subscriber(name: &str, format: LogFormat) -> anyhow::Result<()> {
    LogTracer::init()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = Registry::default().with(filter);

    match format {
        LogFormat::Pretty => {
            set_global_default(registry.with(tracing_subscriber::fmt::layer()))?;
        }
        LogFormat::Json => {
            let formatting = BunyanFormattingLayer::new(name.to_owned(), std::io::stdout);
            set_global_default(registry.with(JsonStorageLayer).with(formatting))?;
        }
    }
    Ok(())
}
