//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → UpscalerConfig (validated, immutable)
//!     → handed to startup, then to HttpServer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the model never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    HttpConfig, ListenerConfig, ModelBackend, ModelConfig, ObservabilityConfig, OutputConfig, UpscalerConfig,
};
pub use validation::{validate_config, ValidationError};
