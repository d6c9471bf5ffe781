//! `Formwork` Runtime: async option resolution, remote option sources and
//! logging setup for the form engine.

pub mod config;
pub mod error;
pub mod options;
pub mod telemetry;

pub use config::RuntimeConfig;
pub use error::FetchError;
pub use options::{DependentOptionResolver, HttpOptionSource, OptionSource, ResolverConfig};
pub use telemetry::{init_tracing, LogFormat};
