//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::UpscalerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<UpscalerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<UpscalerConfig, ConfigError> {
    let config: UpscalerConfig = toml::from_str(content)?;

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
            [model]
            path = "/srv/models/ESPCN_x4.pb"

            [output]
            directory = "/tmp"
            "#,
        )
        .unwrap();

        assert_eq!(config.model.path, "/srv/models/ESPCN_x4.pb");
        assert_eq!(config.model.name, "espcn");
        assert_eq!(config.model.scale, 4);
        assert_eq!(config.output.directory, "/tmp");
        assert_eq!(config.listener.bind_address, "0.0.0.0:5000");
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.max_body_bytes, 10 * 1024 * 1024);
        assert!(config.output.enabled);
    }

    #[test]
    fn test_backend_names() {
        let config = parse_config("[model]\nbackend = \"native\"").unwrap();
        assert_eq!(config.model.backend, crate::config::ModelBackend::Native);

        let err = parse_config("[model]\nbackend = \"onnx\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_config("[listener\nbind_address = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_lists_fields() {
        let err = parse_config("[model]\nscale = 5").unwrap_err();
        match &err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("model.scale"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
