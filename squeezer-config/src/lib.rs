//! Configuration loading for squeezer.
//!
//! Values are layered defaults, then `squeezer.toml`, then `SQUEEZER_*`
//! environment variables (optionally seeded from a `.env` file), then
//! command-line overrides. The result is validated once every layer has
//! been applied.

#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{Config, ConfigMetadata, ConfigOverrides};
pub use validation::{ConfigValidationError, ConfigWarning, ConfigWarnings};
