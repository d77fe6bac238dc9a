pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod formats;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{Dataset, HttpRegistry, InMemoryRegistry, JsonStore};
pub use app::pipelines::UniprotExportPipeline;
pub use config::{cli::LocalStorage, toml_config::DxConfig};
pub use core::{etl::EtlEngine, imex_assigner::ImexAssigner, imex_central::ImexCentralManager};
pub use utils::error::{DxError, Result};
