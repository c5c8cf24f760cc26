use std::env;

use tracing::info;

use super::model::Config;
use crate::errors::CanaryError;

/// Loads the canary configuration from a YAML file and environment
/// variables. The file location comes from the `CONFIG_FILE` variable
/// (default `config.yml`); `CANARY_PASSWORD` and
/// `REMOTE_WRITE_ENDPOINT` override their file counterparts so secrets
/// and per-deployment endpoints stay out of the file.
pub fn load_config() -> Result<Config, CanaryError> {
    dotenvy::dotenv().ok();

    let config_file_location = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.yml".to_string());
    let config_str = std::fs::read_to_string(&config_file_location)
        .map_err(|e| CanaryError::Config(format!("failed to read {config_file_location}: {e}")))?;

    let mut config: Config = serde_yaml::from_str(&config_str)
        .map_err(|e| CanaryError::Config(format!("invalid YAML in {config_file_location}: {e}")))?;

    if let Ok(password) = env::var("CANARY_PASSWORD") {
        config.canary.password = password;
    }
    if let Ok(endpoint) = env::var("REMOTE_WRITE_ENDPOINT") {
        config.remote_write.endpoint = endpoint;
    }

    if config.canary.password.is_empty() {
        return Err(CanaryError::Config(
            "no database password: set canary.password or CANARY_PASSWORD".to_string(),
        ));
    }

    info!(
        endpoint = %config.canary.endpoint,
        engine = %config.canary.engine,
        remote_write = %config.remote_write.endpoint,
        "configuration loaded"
    );
    Ok(config)
}
