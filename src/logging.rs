//! Logging setup
//!
//! Installs a `tracing-subscriber` formatter filtered by `KUSTO_LOG`, falling
//! back to the level passed in.

use crate::error::{KustoError, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "KUSTO_LOG";

pub fn init_logging(default_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| KustoError::config(format!("invalid log level {default_level:?}: {e}")))?,
    };

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global subscriber already installed");
    }
    Ok(())
}
