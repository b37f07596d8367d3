//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Load the model before any traffic is accepted
//! - Prepare the output directory
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::path::Path;
use std::sync::Arc;

use crate::config::{
    load_config, ConfigError, ModelBackend, ModelConfig, OutputConfig, UpscalerConfig,
};
use crate::output::OutputStore;
use crate::superres::{DnnSuperRes, ModelKind, SuperResError, SuperResolution};

/// Fatal startup failures.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("model '{path}': {source}")]
    Model {
        path: String,
        #[source]
        source: SuperResError,
    },
    #[error("output directory '{path}': {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Load the config file if one was given, otherwise use defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<UpscalerConfig, StartupError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(UpscalerConfig::default()),
    }
}

/// Load the configured model on the configured backend.
pub fn load_engine(config: &ModelConfig) -> Result<Arc<dyn SuperResolution>, StartupError> {
    let model_err = |source| StartupError::Model {
        path: config.path.clone(),
        source,
    };
    let kind: ModelKind = config.name.parse().map_err(model_err)?;
    let path = Path::new(&config.path);

    let engine: Arc<dyn SuperResolution> = match config.backend {
        ModelBackend::Native => Arc::new(
            DnnSuperRes::from_path_with_output(
                path,
                kind,
                config.scale,
                config.output_node.as_deref(),
            )
            .map_err(model_err)?,
        ),
        #[cfg(feature = "opencv")]
        ModelBackend::Opencv => Arc::new(
            crate::superres::OpenCvSuperRes::from_path(path, kind, config.scale)
                .map_err(model_err)?,
        ),
        #[cfg(not(feature = "opencv"))]
        ModelBackend::Opencv => {
            return Err(model_err(SuperResError::Backend(
                "built without the opencv feature".into(),
            )))
        }
    };
    Ok(engine)
}

/// Open the output store, or `None` when persistence is disabled.
pub async fn open_output(config: &OutputConfig) -> Result<Option<OutputStore>, StartupError> {
    if !config.enabled {
        tracing::info!("Output persistence disabled");
        return Ok(None);
    }
    let store = OutputStore::open(&config.directory)
        .await
        .map_err(|source| StartupError::Output {
            path: config.directory.clone(),
            source,
        })?;
    tracing::info!(directory = %store.directory().display(), "Output persistence enabled");
    Ok(Some(store))
}
