//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that addresses parse and the model name/scale pair is known
//! - Validate value ranges (body limit > 0, output directory set)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: UpscalerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{ModelBackend, UpscalerConfig};
use crate::superres::ModelKind;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &UpscalerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be greater than 0"));
    }

    match config.model.name.parse::<ModelKind>() {
        Ok(kind) => {
            if !kind.supports_scale(config.model.scale) {
                errors.push(ValidationError::new(
                    "model.scale",
                    format!(
                        "{} does not support x{} (valid: {:?})",
                        kind,
                        config.model.scale,
                        kind.scales()
                    ),
                ));
            }
        }
        Err(e) => errors.push(ValidationError::new("model.name", e.to_string())),
    }
    if config.model.backend == ModelBackend::Opencv && !cfg!(feature = "opencv") {
        errors.push(ValidationError::new(
            "model.backend",
            "opencv backend requested but the binary was built without the opencv feature",
        ));
    }
    if config.model.path.trim().is_empty() {
        errors.push(ValidationError::new("model.path", "must not be empty"));
    }

    if config.output.enabled && config.output.directory.trim().is_empty() {
        errors.push(ValidationError::new("output.directory", "must not be empty"));
    }

    let obs = &config.observability;
    if !matches!(obs.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{}' (expected pretty or json)", obs.log_format),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&UpscalerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = UpscalerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.listener.max_body_bytes = 0;
        config.observability.log_format = "xml".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["listener.bind_address", "listener.max_body_bytes", "observability.log_format"]
        );
    }

    #[test]
    fn test_rejects_unknown_model_and_bad_scale() {
        let mut config = UpscalerConfig::default();
        config.model.name = "edsr".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "model.name");

        config.model.name = "espcn".into();
        config.model.scale = 8;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "model.scale");

        config.model.name = "LapSRN".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = UpscalerConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn test_opencv_backend_needs_feature() {
        let mut config = UpscalerConfig::default();
        assert_eq!(config.model.backend, ModelBackend::Native);

        config.model.backend = ModelBackend::Opencv;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "model.backend");
    }
}
