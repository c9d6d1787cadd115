//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::TaskgateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TaskgateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<TaskgateConfig, ConfigError> {
    let config: TaskgateConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [bus]
            task_topic = "jobs.submit"

            [worker]
            instances = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.bus.task_topic, "jobs.submit");
        assert_eq!(config.bus.completion_topic, "cli.done");
        assert_eq!(config.worker.instances, 4);
        assert_eq!(config.worker.max_in_flight, 64);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[worker]\ninstances = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref v) if v.len() == 1));
        assert!(err.to_string().contains("worker.instances"));
    }

    #[test]
    fn test_syntax_error_and_missing_file() {
        assert!(matches!(parse_config("[bus"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            load_config(Path::new("definitely/not/here.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("taskgate-{}.toml", std::process::id()));
        fs::write(&path, "[gateway]\nwait_timeout_ms = 1500\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.gateway.wait_timeout_ms, 1500);

        fs::remove_file(&path).unwrap_or_default();
    }
}
