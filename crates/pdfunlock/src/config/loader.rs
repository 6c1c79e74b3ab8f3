use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Location of the per-user config file, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pdfunlock").join("config.json"))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    if config.output_prefix.is_empty() {
        return Err(ConfigError::Validation {
            message: "output_prefix must not be empty".to_string(),
        });
    }

    // The prefix is glued onto a file name, it must not escape the output directory
    if config
        .output_prefix
        .chars()
        .any(|c| std::path::is_separator(c) || c == '\0')
    {
        return Err(ConfigError::Validation {
            message: format!(
                "output_prefix '{}' must not contain path separators",
                config.output_prefix
            ),
        });
    }

    if config.event_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "event_capacity must be at least 1".to_string(),
        });
    }

    Ok(())
}
