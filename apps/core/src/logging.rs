use crate::config::LogFormat;
use crate::error::AppError;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const APP_NAME: &str = "hallucination-detector";

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` level.
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init(format: LogFormat) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(JsonStorageLayer)
            .with(BunyanFormattingLayer::new(APP_NAME.to_string(), std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| AppError::Internal(format!("Failed to install log subscriber: {}", e)))
}
