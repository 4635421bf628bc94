//! Logging setup for the binary.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::error::MapIpError;

/// Installs the global subscriber and routes `log` records into it.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), MapIpError> {
    let filter = env_filter(level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
    .map_err(|e| MapIpError::Logging(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| MapIpError::Logging(e.to_string()))
}

fn env_filter(level: &str) -> Result<EnvFilter, MapIpError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| MapIpError::Logging(e.to_string())),
    }
}
