//! Air Quality Forecasting API
//!
//! Consumer-facing configuration and bootstrap: build an [`AppConfig`] once,
//! prepare the forest, wire the [`ForecastService`](airq_core::ForecastService).

pub mod bootstrap;
pub mod config;
pub mod error;

pub use bootstrap::{build_service, prepare_forest, results_sink, train_forest, ModelOrigin};
#[cfg(feature = "fetch")]
pub use bootstrap::{build_remote_service, remote_source};
pub use config::{AppConfig, AppConfigBuilder, SourceConfig};
pub use error::{BootstrapError, ConfigError};
